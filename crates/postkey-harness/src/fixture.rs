//! Fully wired discovery and sharing stack over in-memory collaborators.

use std::sync::Arc;

use postkey_core::{
    BioKeyStrategy, DirectoryStore, DiscoveryConfig, KeyDiscoveryCoordinator, MemoryDirectory,
    PersonRecord, PostIdentifier, ProvePostStrategy, Result, ShareTargetExpander,
    env::Environment,
};
use postkey_crypto::ContentKey;

use crate::{
    FakeSocialNetwork, MemoryKeyStore, MemoryLegacyProvePostStore, MemoryNetwork,
    MemoryProvePostStore, Persona, SimEnv, sim_env::DEFAULT_SEED,
};

/// Coordinator and expander sharing one simulated world.
///
/// Every collaborator is exposed so tests can seed content, inject faults and
/// inspect counters.
pub struct Fixture {
    /// Clock and randomness.
    pub env: SimEnv,
    /// Directory the coordinator writes into.
    pub directory: MemoryDirectory,
    /// Profiles and posts.
    pub social: FakeSocialNetwork,
    /// Envelope store.
    pub network: MemoryNetwork,
    /// Current prove-post references.
    pub prove_posts: MemoryProvePostStore,
    /// Deprecated prove-post references.
    pub legacy_prove_posts: MemoryLegacyProvePostStore,
    /// Local identities.
    pub keys: MemoryKeyStore,
    /// Key discovery under test.
    pub coordinator: KeyDiscoveryCoordinator<SimEnv, MemoryDirectory>,
    /// Share-target expansion under test.
    pub expander: Arc<ShareTargetExpander<SimEnv, MemoryDirectory>>,
}

impl Fixture {
    /// Default configuration and seed.
    pub fn new() -> Self {
        Self::with_config(DiscoveryConfig::default(), DEFAULT_SEED)
    }

    /// Fixture using `config`, with randomness fixed by `seed`.
    pub fn with_config(config: DiscoveryConfig, seed: u64) -> Self {
        let env = SimEnv::with_seed(seed);
        let directory = MemoryDirectory::new();
        let social = FakeSocialNetwork::new();
        let network = MemoryNetwork::new();
        let prove_posts = MemoryProvePostStore::new();
        let legacy_prove_posts = MemoryLegacyProvePostStore::new();
        let keys = MemoryKeyStore::new();

        let bio = Arc::new(BioKeyStrategy::new(Arc::new(social.clone())));
        let prove_post = Arc::new(ProvePostStrategy::new(
            Arc::new(social.clone()),
            Arc::new(prove_posts.clone()),
            Arc::new(legacy_prove_posts.clone()),
            config.legacy_network.clone(),
        ));
        let coordinator =
            KeyDiscoveryCoordinator::new(env.clone(), directory.clone(), bio, prove_post, config);
        let expander = Arc::new(ShareTargetExpander::new(
            env.clone(),
            coordinator.clone(),
            Arc::new(keys.clone()),
            Arc::new(network.clone()),
        ));

        Self {
            env,
            directory,
            social,
            network,
            prove_posts,
            legacy_prove_posts,
            keys,
            coordinator,
            expander,
        }
    }

    /// Make `persona` one of the local user's identities.
    pub fn add_local(&self, persona: &Persona) -> Result<()> {
        self.keys.insert(persona.identifier().clone(), persona.identity().clone());
        let record = PersonRecord::local(persona.identifier().clone(), persona.public_key());
        self.directory.put(record)?;
        Ok(())
    }

    /// Put `persona`'s proof in their profile bio.
    pub fn publish_bio_proof(&self, persona: &Persona) -> Result<()> {
        let bio = format!("Hello from {} {}", persona.identifier().user_id(), persona.proof()?);
        self.social.set_bio(persona.identifier(), bio);
        Ok(())
    }

    /// Put `persona`'s proof in post `post_id` and record it as their prove
    /// post in the current store.
    pub fn publish_prove_post(&self, persona: &Persona, post_id: &str) -> Result<PostIdentifier> {
        let post = self.post_proof(persona, post_id)?;
        self.prove_posts.insert(persona.identifier().clone(), post_id);
        Ok(post)
    }

    /// Put `persona`'s proof in post `post_id` referenced only from the
    /// deprecated store.
    pub fn publish_legacy_prove_post(
        &self,
        persona: &Persona,
        post_id: &str,
    ) -> Result<PostIdentifier> {
        let post = self.post_proof(persona, post_id)?;
        self.legacy_prove_posts.insert(persona.identifier().user_id(), post_id);
        Ok(post)
    }

    /// Fresh content key drawn from the simulation's RNG.
    pub fn content_key(&self) -> ContentKey {
        ContentKey::from_bytes(self.env.random_key())
    }

    fn post_proof(&self, persona: &Persona, post_id: &str) -> Result<PostIdentifier> {
        let post = PostIdentifier::new(persona.identifier().clone(), post_id)?;
        self.social.publish_post(&post, format!("Verifying my key: {}", persona.proof()?));
        Ok(post)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
