use std::sync::Arc;

use async_trait::async_trait;

use super::{DiscoveredKey, DiscoveryStrategy};
use crate::{
    Error, LegacyProvePostStore, PersonIdentifier, PostFetcher, PostIdentifier, ProofVerifier,
    ProvePostStore, Result,
};

/// Finds a key proof in the person's recorded prove post.
///
/// The reference comes from the current store; for identifiers in the legacy
/// network it falls back to the deprecated store and copies a hit forward.
#[derive(Clone)]
pub struct ProvePostStrategy {
    posts: Arc<dyn PostFetcher>,
    store: Arc<dyn ProvePostStore>,
    legacy: Arc<dyn LegacyProvePostStore>,
    legacy_network: Option<String>,
}

impl ProvePostStrategy {
    /// Strategy reading references from `store` (then `legacy` for
    /// identifiers in `legacy_network`) and posts through `posts`.
    pub fn new(
        posts: Arc<dyn PostFetcher>,
        store: Arc<dyn ProvePostStore>,
        legacy: Arc<dyn LegacyProvePostStore>,
        legacy_network: Option<String>,
    ) -> Self {
        Self { posts, store, legacy, legacy_network }
    }

    async fn reference(&self, identifier: &PersonIdentifier) -> Result<PostIdentifier> {
        if let Some(post_id) = self.store.lookup(identifier).await?.filter(|id| !id.is_empty()) {
            return PostIdentifier::new(identifier.clone(), post_id);
        }

        if self.legacy_network.as_deref() != Some(identifier.network()) {
            return Err(Error::NotFound(format!("no prove post recorded for {identifier}")));
        }

        let Some(post_id) =
            self.legacy.lookup(identifier.user_id()).await?.filter(|id| !id.is_empty())
        else {
            return Err(Error::NotFound(format!("no prove post recorded for {identifier}")));
        };

        let post = PostIdentifier::new(identifier.clone(), post_id)?;
        if let Err(e) = self.store.record(identifier, post.post_id()).await {
            tracing::warn!(%identifier, error = %e, "Failed to migrate legacy prove post");
        } else {
            tracing::debug!(%identifier, post_id = post.post_id(), "Migrated legacy prove post");
        }

        Ok(post)
    }
}

#[async_trait]
impl DiscoveryStrategy for ProvePostStrategy {
    fn name(&self) -> &'static str {
        "prove-post"
    }

    async fn discover(&self, identifier: &PersonIdentifier) -> Result<DiscoveredKey> {
        let post = self.reference(identifier).await?;
        let content = self.posts.fetch_post_content(&post).await?;
        let public_key = ProofVerifier::verify(&content, identifier)?;

        Ok(DiscoveredKey { public_key, prove_post: Some(post) })
    }
}
