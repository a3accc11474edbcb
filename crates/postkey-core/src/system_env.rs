//! Wall-clock environment for running against real networks.

use std::time::Duration;

use crate::env::Environment;

/// [`Environment`] backed by the monotonic system clock and the OS RNG.
///
/// Envelope ivs, ephemeral secrets and generated content keys all draw from
/// here in production.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails. Sealing with predictable
/// ephemerals would expose every recipient slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Environment reading the real clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn deadline(&self, timeout: Duration) -> Option<std::time::Instant> {
        self.now().checked_add(timeout)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("OS RNG unavailable; refusing to seal with weak randomness");
    }
}
