//! Key discovery coordinator.
//!
//! # Resolution
//!
//! ```text
//! resolve_public_key(id)
//!   directory hit ──────────────────────────────► record
//!   registry: pending ──── join shared future ──► record | KeyNotFound
//!   registry: failed (within ttl) ──────────────► KeyNotFound
//!   registry: empty ─── spawn resolution task
//!                       directory hit ──────────► record
//!                         ├─ spawn bio task ───────┐ each writes its key
//!                         └─ spawn prove-post task ┘ into the directory
//!                       first success ──────────► record (loser keeps running)
//!                       both fail ─ re-check dir ► record | KeyNotFound
//! ```
//!
//! Resolutions and strategies run as spawned tasks. A caller dropping its
//! future cancels neither, and a resolution task that dies clears its
//! entry on the way out, so the registry entry is always settled.

use std::sync::Arc;

use futures::{
    FutureExt,
    future::{self, Either},
};
use tokio::{runtime::Handle, task::JoinHandle};

use super::{
    DiscoveredKey, DiscoveryStrategy,
    registry::{Admission, FlightRegistry},
};
use crate::{
    DirectoryStore, DiscoveryConfig, Error, PersonIdentifier, PersonRecord, Result,
    env::Environment,
};

/// Resolves identifiers to public keys.
///
/// Cheap to clone; clones share the directory, registry and strategies.
///
/// # Invariants
///
/// - At most one resolution is in flight per identifier
/// - A directory hit never touches the network
/// - A `KeyNotFound` suppresses new attempts for `negative_ttl`
pub struct KeyDiscoveryCoordinator<E: Environment, D: DirectoryStore> {
    inner: Arc<CoordinatorInner<E, D>>,
}

struct CoordinatorInner<E: Environment, D: DirectoryStore> {
    env: E,
    directory: D,
    bio: Arc<dyn DiscoveryStrategy>,
    prove_post: Arc<dyn DiscoveryStrategy>,
    registry: FlightRegistry<E::Instant>,
    config: DiscoveryConfig,
}

impl<E: Environment, D: DirectoryStore> Clone for KeyDiscoveryCoordinator<E, D> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: Environment, D: DirectoryStore> KeyDiscoveryCoordinator<E, D> {
    /// Coordinator racing `bio` against `prove_post`.
    pub fn new(
        env: E,
        directory: D,
        bio: Arc<dyn DiscoveryStrategy>,
        prove_post: Arc<dyn DiscoveryStrategy>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                env,
                directory,
                bio,
                prove_post,
                registry: FlightRegistry::new(),
                config,
            }),
        }
    }

    /// Directory this coordinator writes discovered keys into.
    pub fn directory(&self) -> &D {
        &self.inner.directory
    }

    /// Resolve `identifier` to a record with a public key.
    ///
    /// A `negative_ttl` too long for the clock suppresses the identifier
    /// until [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` if neither strategy found a key, now or within the
    ///   last `negative_ttl`
    /// - `KeyConflict` if a strategy found a key different from one already
    ///   recorded
    /// - `TaskFailed` if called outside a tokio runtime on a directory miss,
    ///   or if the resolution task died
    pub async fn resolve_public_key(&self, identifier: &PersonIdentifier) -> Result<PersonRecord> {
        if let Some(record) = self.inner.cached(identifier)? {
            return Ok(record);
        }

        // Spawning under the registry lock must not panic
        let runtime = Handle::try_current().map_err(|e| Error::TaskFailed(e.to_string()))?;

        let now = self.inner.env.now();
        let admission = self.inner.registry.admit(identifier, now, |generation| {
            let inner = Arc::clone(&self.inner);
            let identifier = identifier.clone();

            runtime
                .spawn(async move {
                    let flight = inner.registry.settle(&identifier, generation);
                    let result = inner.resolve_uncached(&identifier).await;
                    flight.complete(&result, inner.env.deadline(inner.config.negative_ttl));
                    result
                })
                .map(flatten_join)
                .boxed()
                .shared()
        });

        match admission {
            Admission::Resolve(resolution) => resolution.await,
            Admission::Suppressed => {
                tracing::debug!(%identifier, "Discovery suppressed by negative cache");
                Err(Error::KeyNotFound(identifier.to_string()))
            },
        }
    }

    /// Forget all pending and failed resolutions.
    ///
    /// Directory contents are untouched.
    pub fn reset(&self) {
        self.inner.registry.clear();
    }

    /// Number of identifiers currently suppressed by the negative cache.
    pub fn negative_cache_len(&self) -> usize {
        self.inner.registry.negative_len()
    }

    /// Number of resolutions in flight.
    pub fn pending_len(&self) -> usize {
        self.inner.registry.pending_len()
    }
}

impl<E: Environment, D: DirectoryStore> CoordinatorInner<E, D> {
    /// Race both strategies: OR of successes, AND of failures.
    async fn resolve_uncached(
        self: &Arc<Self>,
        identifier: &PersonIdentifier,
    ) -> Result<PersonRecord> {
        // A flight that settled between the caller's directory check and its
        // admission has already written the key
        if let Some(record) = self.cached(identifier)? {
            return Ok(record);
        }

        tracing::debug!(%identifier, "Starting key discovery");

        let bio = self.spawn_strategy(Arc::clone(&self.bio), identifier);
        let prove_post = self.spawn_strategy(Arc::clone(&self.prove_post), identifier);

        let (first, remaining) = match future::select(bio, prove_post).await {
            Either::Left((result, other)) | Either::Right((result, other)) => (result, other),
        };

        let first = flatten_join(first);
        if first.is_ok() {
            // `remaining` is detached, not aborted
            return first;
        }

        let second = flatten_join(remaining.await);
        if second.is_ok() {
            return second;
        }

        for result in [&first, &second] {
            if let Err(conflict @ Error::KeyConflict { .. }) = result {
                return Err(conflict.clone());
            }
        }

        if let Some(record) = self.cached(identifier)? {
            tracing::debug!(%identifier, "Key resolved concurrently");
            return Ok(record);
        }

        tracing::info!(%identifier, "No public key discovered");
        Err(Error::KeyNotFound(identifier.to_string()))
    }

    /// Directory record for `identifier` if it already carries a key.
    fn cached(&self, identifier: &PersonIdentifier) -> Result<Option<PersonRecord>> {
        Ok(self.directory.get(identifier)?.filter(|record| record.public_key.is_some()))
    }

    /// Run `strategy` to completion in its own task and record any key it
    /// finds.
    fn spawn_strategy(
        self: &Arc<Self>,
        strategy: Arc<dyn DiscoveryStrategy>,
        identifier: &PersonIdentifier,
    ) -> JoinHandle<Result<PersonRecord>> {
        let inner = Arc::clone(self);
        let identifier = identifier.clone();

        tokio::spawn(async move {
            let strategy_name = strategy.name();
            match strategy.discover(&identifier).await {
                Ok(found) => inner.accept(&identifier, strategy_name, found),
                Err(e) => {
                    tracing::debug!(
                        %identifier,
                        strategy = strategy_name,
                        error = %e,
                        "Strategy failed"
                    );
                    Err(e)
                },
            }
        })
    }

    fn accept(
        &self,
        identifier: &PersonIdentifier,
        strategy: &'static str,
        found: DiscoveredKey,
    ) -> Result<PersonRecord> {
        let fingerprint = found.public_key.fingerprint();
        let record =
            PersonRecord::discovered(identifier.clone(), found.public_key, found.prove_post);

        match self.directory.put(record) {
            Ok(record) => {
                tracing::info!(%identifier, strategy, %fingerprint, "Discovered public key");
                Ok(record)
            },
            Err(e) => {
                tracing::error!(%identifier, strategy, error = %e, "Rejected discovered key");
                Err(e)
            },
        }
    }
}

fn flatten_join(
    joined: std::result::Result<Result<PersonRecord>, tokio::task::JoinError>,
) -> Result<PersonRecord> {
    joined.unwrap_or_else(|e| Err(Error::TaskFailed(e.to_string())))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use postkey_crypto::{IdentityKeyPair, PublicKey};
    use tokio::sync::Notify;

    use super::*;
    use crate::{MemoryDirectory, SystemEnv};

    struct Stub {
        key: Option<PublicKey>,
        gate: Option<Arc<Notify>>,
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DiscoveryStrategy for Stub {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn discover(&self, identifier: &PersonIdentifier) -> Result<DiscoveredKey> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.finished.fetch_add(1, Ordering::SeqCst);
            self.key
                .map(|public_key| DiscoveredKey { public_key, prove_post: None })
                .ok_or_else(|| Error::NotFound(identifier.to_string()))
        }
    }

    fn stub(key: Option<PublicKey>, gate: Option<Arc<Notify>>) -> (Arc<Stub>, Arc<AtomicUsize>) {
        let finished = Arc::new(AtomicUsize::new(0));
        (Arc::new(Stub { key, gate, finished: Arc::clone(&finished) }), finished)
    }

    fn key(seed: u8) -> PublicKey {
        IdentityKeyPair::from_seed(&[seed; 64]).public_key()
    }

    fn bob() -> PersonIdentifier {
        PersonIdentifier::new("facebook.com", "bob").unwrap()
    }

    #[tokio::test]
    async fn losing_strategy_runs_to_completion() {
        let gate = Arc::new(Notify::new());
        let (fast, _) = stub(Some(key(1)), None);
        let (slow, slow_finished) = stub(Some(key(1)), Some(Arc::clone(&gate)));
        let coordinator = KeyDiscoveryCoordinator::new(
            SystemEnv::new(),
            MemoryDirectory::new(),
            fast,
            slow,
            DiscoveryConfig::default(),
        );

        let record = coordinator.resolve_public_key(&bob()).await.unwrap();
        assert_eq!(record.public_key, Some(key(1)));
        assert_eq!(slow_finished.load(Ordering::SeqCst), 0);

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), async {
            while slow_finished.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("loser should finish after the winner returned");
    }

    #[tokio::test]
    async fn one_success_is_enough() {
        let (found, _) = stub(Some(key(2)), None);
        let (missing, _) = stub(None, None);
        let directory = MemoryDirectory::new();
        let coordinator = KeyDiscoveryCoordinator::new(
            SystemEnv::new(),
            directory.clone(),
            missing,
            found,
            DiscoveryConfig::default(),
        );

        let record = coordinator.resolve_public_key(&bob()).await.unwrap();

        assert_eq!(record.public_key, Some(key(2)));
        assert_eq!(directory.get(&bob()).unwrap(), Some(record));
        assert_eq!(coordinator.negative_cache_len(), 0);
    }

    #[tokio::test]
    async fn both_failing_is_key_not_found() {
        let (a, a_finished) = stub(None, None);
        let (b, b_finished) = stub(None, None);
        let coordinator = KeyDiscoveryCoordinator::new(
            SystemEnv::new(),
            MemoryDirectory::new(),
            a,
            b,
            DiscoveryConfig::default(),
        );

        let result = coordinator.resolve_public_key(&bob()).await;

        assert_eq!(result, Err(Error::KeyNotFound(bob().to_string())));
        assert_eq!(a_finished.load(Ordering::SeqCst), 1);
        assert_eq!(b_finished.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.negative_cache_len(), 1);
    }

    #[tokio::test]
    async fn dropped_caller_still_settles_the_flight() {
        let gate = Arc::new(Notify::new());
        let (a, _) = stub(None, Some(Arc::clone(&gate)));
        let (b, _) = stub(None, Some(Arc::clone(&gate)));
        let coordinator = KeyDiscoveryCoordinator::new(
            SystemEnv::new(),
            MemoryDirectory::new(),
            a,
            b,
            DiscoveryConfig::default(),
        );

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            coordinator.resolve_public_key(&bob()),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(coordinator.pending_len(), 1);

        gate.notify_waiters();
        tokio::time::timeout(Duration::from_secs(5), async {
            while coordinator.pending_len() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("flight should settle without callers");
        assert_eq!(coordinator.negative_cache_len(), 1);
    }

    #[test]
    fn lookup_outside_runtime_fails_without_poisoning() {
        let (a, _) = stub(Some(key(3)), None);
        let (b, _) = stub(None, None);
        let coordinator = KeyDiscoveryCoordinator::new(
            SystemEnv::new(),
            MemoryDirectory::new(),
            a,
            b,
            DiscoveryConfig::default(),
        );

        let outside = futures::executor::block_on(coordinator.resolve_public_key(&bob()));
        assert!(matches!(outside, Err(Error::TaskFailed(_))));
        assert_eq!(coordinator.pending_len(), 0);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let inside = runtime.block_on(coordinator.resolve_public_key(&bob())).unwrap();
        assert_eq!(inside.public_key, Some(key(3)));
    }
}
