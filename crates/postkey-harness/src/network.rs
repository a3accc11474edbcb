//! In-memory envelope store.

#![allow(clippy::disallowed_types, reason = "Lock is never held across an await")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use postkey_core::{Error, NetworkPublisher, PostLocator, Result};
use postkey_proto::Envelope;

/// [`NetworkPublisher`] keeping the latest bytes per locator.
///
/// Clones share state. Reads and writes yield once so that concurrent
/// publishers interleave.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

#[derive(Debug, Default)]
struct NetworkInner {
    envelopes: HashMap<PostLocator, Vec<u8>>,
    publishes: usize,
    fail_publish: bool,
}

impl MemoryNetwork {
    /// Store with nothing published.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently stored at `locator`.
    pub fn stored(&self, locator: &PostLocator) -> Option<Vec<u8>> {
        self.lock().envelopes.get(locator).cloned()
    }

    /// Decoded envelope currently stored at `locator`.
    ///
    /// # Panics
    ///
    /// Panics if the stored bytes do not decode.
    pub fn stored_envelope(&self, locator: &PostLocator) -> Option<Envelope> {
        self.stored(locator)
            .map(|bytes| Envelope::decode(&bytes).expect("stored envelope should decode"))
    }

    /// Successful publishes so far.
    pub fn publish_count(&self) -> usize {
        self.lock().publishes
    }

    /// Reject every publish with a network error while set.
    pub fn set_fail_publish(&self, fail: bool) {
        self.lock().fail_publish = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkInner> {
        self.inner.lock().expect("MemoryNetwork mutex poisoned")
    }
}

#[async_trait]
impl NetworkPublisher for MemoryNetwork {
    async fn publish(&self, locator: &PostLocator, envelope: &[u8]) -> Result<()> {
        tokio::task::yield_now().await;

        let mut inner = self.lock();
        if inner.fail_publish {
            return Err(Error::Network(format!("publish to {locator} rejected")));
        }
        inner.envelopes.insert(locator.clone(), envelope.to_vec());
        inner.publishes += 1;

        tracing::trace!(%locator, bytes = envelope.len(), "Stored envelope");
        Ok(())
    }

    async fn fetch(&self, locator: &PostLocator) -> Result<Option<Vec<u8>>> {
        tokio::task::yield_now().await;
        Ok(self.stored(locator))
    }
}
