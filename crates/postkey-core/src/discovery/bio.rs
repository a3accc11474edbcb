use std::sync::Arc;

use async_trait::async_trait;

use super::{DiscoveredKey, DiscoveryStrategy};
use crate::{PersonIdentifier, ProfileFetcher, ProofVerifier, Result};

/// Finds a key proof in the person's profile biography.
#[derive(Clone)]
pub struct BioKeyStrategy {
    profiles: Arc<dyn ProfileFetcher>,
}

impl BioKeyStrategy {
    /// Strategy reading profiles through `profiles`.
    pub fn new(profiles: Arc<dyn ProfileFetcher>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl DiscoveryStrategy for BioKeyStrategy {
    fn name(&self) -> &'static str {
        "bio"
    }

    async fn discover(&self, identifier: &PersonIdentifier) -> Result<DiscoveredKey> {
        let profile = self.profiles.fetch_profile(identifier).await?;
        let public_key = ProofVerifier::verify(&profile.bio, identifier)?;

        Ok(DiscoveredKey { public_key, prove_post: None })
    }
}
