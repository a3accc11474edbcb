//! Simulated environment with a manual clock and seeded randomness.

#![allow(clippy::disallowed_types, reason = "Locking clock and RNG state only")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    ops::{Add, Sub},
    sync::{Arc, Mutex},
    time::Duration,
};

use postkey_core::env::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Seed used by [`SimEnv::new`].
pub const DEFAULT_SEED: u64 = 0;

/// Point on the simulated clock, measured from the start of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time elapsed since the start of the run.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

/// Deterministic [`Environment`].
///
/// Time only moves when [`advance`](Self::advance) is called. Clones share
/// the clock and the RNG, so every component of one simulation observes the
/// same time and draws from one reproducible byte stream.
#[derive(Debug, Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<SimInstant>>,
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SimEnv {
    /// Environment seeded with [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Environment whose random stream is fixed by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(SimInstant::default())),
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut clock = self.clock.lock().expect("SimEnv clock poisoned");
        *clock = *clock + duration;
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        *self.clock.lock().expect("SimEnv clock poisoned")
    }

    fn deadline(&self, timeout: Duration) -> Option<SimInstant> {
        self.now().0.checked_add(timeout).map(SimInstant)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().expect("SimEnv rng poisoned").fill_bytes(buffer);
    }
}
