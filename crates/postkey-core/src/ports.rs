//! Collaborator interfaces.
//!
//! Everything that touches a social network, the gossip store or the local
//! keyring sits behind one of these traits. They are async and object-safe;
//! the core holds them as `Arc<dyn Trait>`.

use std::fmt;

use async_trait::async_trait;
use postkey_crypto::IdentityKeyPair;
use postkey_proto::VersionTag;

use crate::{PersonIdentifier, PostIdentifier, Result};

/// Public profile of a person.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Free-text biography.
    pub bio: String,
}

/// Reads profiles from a social network.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetch the profile of `identifier`.
    ///
    /// # Errors
    ///
    /// - `Network` if the profile could not be retrieved
    async fn fetch_profile(&self, identifier: &PersonIdentifier) -> Result<Profile>;
}

/// Reads post text from a social network.
#[async_trait]
pub trait PostFetcher: Send + Sync {
    /// Fetch the text content of `post`.
    ///
    /// # Errors
    ///
    /// - `Network` if the request failed
    /// - `NotFound` if the post does not exist
    async fn fetch_post_content(&self, post: &PostIdentifier) -> Result<String>;
}

/// Where a post's envelope is published.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostLocator {
    /// Keyed by post, used by every version after `-40`.
    Current {
        /// Post the envelope belongs to
        post: PostIdentifier,
    },
    /// Keyed by `(post, author)`, used by `-40`.
    Legacy {
        /// Post the envelope belongs to
        post: PostIdentifier,
        /// Identity that published it
        author: PersonIdentifier,
    },
}

impl PostLocator {
    /// Locator at which `version` envelopes for `post` live.
    pub fn for_version(version: VersionTag, post: PostIdentifier, author: PersonIdentifier) -> Self {
        if version.uses_legacy_locator() {
            Self::Legacy { post, author }
        } else {
            Self::Current { post }
        }
    }

    /// Post the envelope belongs to.
    pub fn post(&self) -> &PostIdentifier {
        match self {
            Self::Current { post } | Self::Legacy { post, .. } => post,
        }
    }

    /// Whether this is the legacy `(post, author)` form.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }

    /// Whether envelopes of `version` may be published here.
    pub fn accepts(&self, version: VersionTag) -> bool {
        self.is_legacy() == version.uses_legacy_locator()
    }
}

impl fmt::Display for PostLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current { post } => write!(f, "current:{post}"),
            Self::Legacy { post, author } => write!(f, "legacy:{post}@{author}"),
        }
    }
}

/// Publishes and fetches opaque envelope bytes.
#[async_trait]
pub trait NetworkPublisher: Send + Sync {
    /// Store `envelope` at `locator`, replacing what was there.
    ///
    /// # Errors
    ///
    /// - `Network` if the write failed
    async fn publish(&self, locator: &PostLocator, envelope: &[u8]) -> Result<()>;

    /// Envelope currently stored at `locator`.
    ///
    /// # Errors
    ///
    /// - `Network` if the read failed
    async fn fetch(&self, locator: &PostLocator) -> Result<Option<Vec<u8>>>;
}

/// Local keyring holding the user's own identities.
#[async_trait]
pub trait LocalKeyStore: Send + Sync {
    /// Private key for `identifier`, if it is a local identity.
    async fn private_key_for(&self, identifier: &PersonIdentifier)
    -> Result<Option<IdentityKeyPair>>;
}

/// Current-format store of prove-post references.
#[async_trait]
pub trait ProvePostStore: Send + Sync {
    /// Post id recorded for `identifier`. Empty ids count as absent.
    async fn lookup(&self, identifier: &PersonIdentifier) -> Result<Option<String>>;

    /// Record `post_id` as the prove post of `identifier`.
    async fn record(&self, identifier: &PersonIdentifier, post_id: &str) -> Result<()>;
}

/// Deprecated store keyed by bare user id. Read-only.
#[async_trait]
pub trait LegacyProvePostStore: Send + Sync {
    /// Post id recorded for `user_id`. Empty ids count as absent.
    async fn lookup(&self, user_id: &str) -> Result<Option<String>>;
}
