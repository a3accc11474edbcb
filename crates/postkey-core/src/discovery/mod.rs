//! Public key discovery.
//!
//! Two independent strategies find a person's key in untrusted content: the
//! profile bio and a dedicated prove post. [`KeyDiscoveryCoordinator`] races
//! them behind a single-flight registry with a negative cache.

mod bio;
mod coordinator;
mod prove_post;
mod registry;

use async_trait::async_trait;
pub use bio::BioKeyStrategy;
pub use coordinator::KeyDiscoveryCoordinator;
use postkey_crypto::PublicKey;
pub use prove_post::ProvePostStrategy;

use crate::{PersonIdentifier, PostIdentifier, Result};

/// Key found by one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredKey {
    /// Key proven for the identifier.
    pub public_key: PublicKey,
    /// Post the proof came from, for prove-post discovery.
    pub prove_post: Option<PostIdentifier>,
}

/// One way of finding a person's public key.
///
/// Strategies never write to the directory; the coordinator does.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Find and verify a key for `identifier`.
    async fn discover(&self, identifier: &PersonIdentifier) -> Result<DiscoveredKey>;
}
