//! In-memory prove-post stores and local keyring.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use postkey_core::{
    Error, LegacyProvePostStore, LocalKeyStore, PersonIdentifier, ProvePostStore, Result,
};
use postkey_crypto::IdentityKeyPair;

/// Current-format [`ProvePostStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryProvePostStore {
    inner: Arc<Mutex<ProvePostInner>>,
}

#[derive(Debug, Default)]
struct ProvePostInner {
    posts: HashMap<PersonIdentifier, String>,
    read_only: bool,
}

impl MemoryProvePostStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a reference directly, bypassing read-only mode.
    pub fn insert(&self, identifier: PersonIdentifier, post_id: impl Into<String>) {
        self.lock().posts.insert(identifier, post_id.into());
    }

    /// Post id recorded for `identifier`, without going through the trait.
    pub fn get(&self, identifier: &PersonIdentifier) -> Option<String> {
        self.lock().posts.get(identifier).cloned()
    }

    /// Reject every `record` call while set.
    pub fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProvePostInner> {
        self.inner.lock().expect("MemoryProvePostStore mutex poisoned")
    }
}

#[async_trait]
impl ProvePostStore for MemoryProvePostStore {
    async fn lookup(&self, identifier: &PersonIdentifier) -> Result<Option<String>> {
        Ok(self.get(identifier))
    }

    async fn record(&self, identifier: &PersonIdentifier, post_id: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.read_only {
            return Err(Error::Network("prove-post store is read-only".to_string()));
        }
        inner.posts.insert(identifier.clone(), post_id.to_string());
        Ok(())
    }
}

/// Deprecated [`LegacyProvePostStore`] keyed by bare user id.
#[derive(Debug, Clone, Default)]
pub struct MemoryLegacyProvePostStore {
    posts: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryLegacyProvePostStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a legacy record.
    pub fn insert(&self, user_id: impl Into<String>, post_id: impl Into<String>) {
        self.posts
            .lock()
            .expect("MemoryLegacyProvePostStore mutex poisoned")
            .insert(user_id.into(), post_id.into());
    }
}

#[async_trait]
impl LegacyProvePostStore for MemoryLegacyProvePostStore {
    async fn lookup(&self, user_id: &str) -> Result<Option<String>> {
        let posts = self.posts.lock().expect("MemoryLegacyProvePostStore mutex poisoned");
        Ok(posts.get(user_id).cloned())
    }
}

/// [`LocalKeyStore`] holding private keys in memory.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    keys: Arc<Mutex<HashMap<PersonIdentifier, IdentityKeyPair>>>,
}

impl MemoryKeyStore {
    /// Keyring with no identities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `identity` as the private key of `identifier`.
    pub fn insert(&self, identifier: PersonIdentifier, identity: IdentityKeyPair) {
        self.keys.lock().expect("MemoryKeyStore mutex poisoned").insert(identifier, identity);
    }
}

#[async_trait]
impl LocalKeyStore for MemoryKeyStore {
    async fn private_key_for(
        &self,
        identifier: &PersonIdentifier,
    ) -> Result<Option<IdentityKeyPair>> {
        let keys = self.keys.lock().expect("MemoryKeyStore mutex poisoned");
        Ok(keys.get(identifier).cloned())
    }
}
