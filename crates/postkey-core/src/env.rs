//! Clock and randomness, injected.
//!
//! The negative cache measures its window on [`Environment::now`] and the
//! expander draws ivs and ephemeral secrets from
//! [`Environment::random_bytes`]. A simulated environment can therefore step
//! past a suppression window without sleeping and replay a run byte for byte
//! from its seed.

use std::{fmt::Debug, ops::Sub, time::Duration};

/// Source of time and entropy for discovery and sharing.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` is monotonic
/// - `random_bytes()` is cryptographically secure outside of tests
pub trait Environment: Clone + Send + Sync + 'static {
    /// Point in time on this environment's clock.
    ///
    /// `std::time::Instant` in production; tests use a manually advanced
    /// clock.
    type Instant: Copy + Ord + Send + Sync + Debug + Sub<Output = Duration>;

    /// Current instant.
    fn now(&self) -> Self::Instant;

    /// `now()` plus `timeout`, or `None` if that lies beyond what this clock
    /// can represent.
    fn deadline(&self, timeout: Duration) -> Option<Self::Instant>;

    /// Fill `buffer` with random bytes.
    ///
    /// # Invariants
    ///
    /// - A seeded implementation yields the same stream for the same seed
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Fresh 32-byte content key material.
    fn random_key(&self) -> [u8; 32] {
        let mut key = [0u8; 32];
        self.random_bytes(&mut key);
        key
    }
}
