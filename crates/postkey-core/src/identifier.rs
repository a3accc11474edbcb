//! Person and post identifiers.
//!
//! Both have a canonical text form that parses back to an equal value. Every
//! map in the system is keyed by these types, never by raw strings.
//!
//! ```text
//! person:<network>/<user_id>
//! post:<post_id>/person:<network>/<user_id>
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const PERSON_PREFIX: &str = "person:";
const POST_PREFIX: &str = "post:";

/// A person within a network namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonIdentifier {
    network: String,
    user_id: String,
}

impl PersonIdentifier {
    /// Build from parts.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if either part is empty, or `network` contains
    ///   `/` or whitespace
    pub fn new(network: impl Into<String>, user_id: impl Into<String>) -> Result<Self> {
        let network = network.into();
        let user_id = user_id.into();

        if network.is_empty() || user_id.is_empty() {
            return Err(Error::InvalidIdentifier(format!(
                "empty network or user id in {network:?}/{user_id:?}"
            )));
        }
        if network.contains('/') || network.contains(char::is_whitespace) {
            return Err(Error::InvalidIdentifier(format!("bad network name {network:?}")));
        }

        Ok(Self { network, user_id })
    }

    /// Network namespace, e.g. `facebook.com`.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// User id within the network.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl fmt::Display for PersonIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PERSON_PREFIX}{}/{}", self.network, self.user_id)
    }
}

impl FromStr for PersonIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix(PERSON_PREFIX)
            .ok_or_else(|| Error::InvalidIdentifier(format!("missing {PERSON_PREFIX:?} in {s:?}")))?;
        let (network, user_id) = rest
            .split_once('/')
            .ok_or_else(|| Error::InvalidIdentifier(format!("missing '/' in {s:?}")))?;
        Self::new(network, user_id)
    }
}

impl TryFrom<String> for PersonIdentifier {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<PersonIdentifier> for String {
    fn from(id: PersonIdentifier) -> Self {
        id.to_string()
    }
}

/// A post, named by its author and the network's post id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostIdentifier {
    author: PersonIdentifier,
    post_id: String,
}

impl PostIdentifier {
    /// Build from parts.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if `post_id` is empty or contains `/`
    pub fn new(author: PersonIdentifier, post_id: impl Into<String>) -> Result<Self> {
        let post_id = post_id.into();
        if post_id.is_empty() || post_id.contains('/') {
            return Err(Error::InvalidIdentifier(format!("bad post id {post_id:?}")));
        }
        Ok(Self { author, post_id })
    }

    /// Author of the post.
    pub fn author(&self) -> &PersonIdentifier {
        &self.author
    }

    /// Network post id.
    pub fn post_id(&self) -> &str {
        &self.post_id
    }
}

impl fmt::Display for PostIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{POST_PREFIX}{}/{}", self.post_id, self.author)
    }
}

impl FromStr for PostIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix(POST_PREFIX)
            .ok_or_else(|| Error::InvalidIdentifier(format!("missing {POST_PREFIX:?} in {s:?}")))?;
        let (post_id, author) = rest
            .split_once('/')
            .ok_or_else(|| Error::InvalidIdentifier(format!("missing author in {s:?}")))?;
        Self::new(author.parse()?, post_id)
    }
}

impl TryFrom<String> for PostIdentifier {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<PostIdentifier> for String {
    fn from(id: PostIdentifier) -> Self {
        id.to_string()
    }
}
