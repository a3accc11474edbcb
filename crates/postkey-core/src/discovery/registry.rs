//! Single-flight registry with negative cache.
//!
//! One entry per identifier: either the shared future of the resolution in
//! flight, or a failure marker that suppresses new attempts until it
//! expires. Check-then-insert happens under one lock acquisition, and the
//! lock is never held across an `.await`.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{collections::HashMap, sync::Mutex};

use futures::future::{BoxFuture, Shared};

use crate::{Error, PersonIdentifier, PersonRecord, Result};

/// Resolution future shared by every caller for one identifier.
pub(crate) type SharedResolution = Shared<BoxFuture<'static, Result<PersonRecord>>>;

enum Flight<I> {
    Pending { generation: u64, resolution: SharedResolution },
    /// `None` suppresses until the registry is cleared.
    Failed { expires_at: Option<I> },
}

/// Outcome of asking to resolve an identifier.
pub(crate) enum Admission {
    /// Await this resolution; it may have been started by this call.
    Resolve(SharedResolution),
    /// A recent resolution failed and the window has not elapsed.
    Suppressed,
}

pub(crate) struct FlightRegistry<I> {
    inner: Mutex<RegistryInner<I>>,
}

struct RegistryInner<I> {
    flights: HashMap<PersonIdentifier, Flight<I>>,
    next_generation: u64,
}

impl<I: Copy + Ord> FlightRegistry<I> {
    pub(crate) fn new() -> Self {
        Self { inner: Mutex::new(RegistryInner { flights: HashMap::new(), next_generation: 0 }) }
    }

    /// Join the resolution in flight, refuse within the failure window, or
    /// call `start` to begin a new one.
    ///
    /// `start` runs under the registry lock and receives the generation to
    /// pass back to [`settle`](Self::settle). It must neither block nor panic.
    pub(crate) fn admit(
        &self,
        identifier: &PersonIdentifier,
        now: I,
        start: impl FnOnce(u64) -> SharedResolution,
    ) -> Admission {
        let mut inner = self.inner.lock().expect("FlightRegistry mutex poisoned");

        inner.flights.retain(|_, flight| match flight {
            Flight::Failed { expires_at: Some(expires_at) } => now < *expires_at,
            Flight::Failed { expires_at: None } | Flight::Pending { .. } => true,
        });

        match inner.flights.get(identifier) {
            // A settled flight leaves the map before its result is visible, so
            // a visible result here means the task died unsettled
            Some(Flight::Pending { resolution, .. }) if resolution.peek().is_none() => {
                return Admission::Resolve(resolution.clone());
            },
            Some(Flight::Failed { .. }) => return Admission::Suppressed,
            Some(Flight::Pending { .. }) | None => {},
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let resolution = start(generation);
        inner.flights.insert(
            identifier.clone(),
            Flight::Pending { generation, resolution: resolution.clone() },
        );
        Admission::Resolve(resolution)
    }

    /// Guard for the flight started as `generation`.
    ///
    /// Dropping the guard without [`FlightGuard::complete`] clears the
    /// flight, so a resolution that dies never leaves callers joined to it.
    pub(crate) fn settle<'a>(
        &'a self,
        identifier: &'a PersonIdentifier,
        generation: u64,
    ) -> FlightGuard<'a, I> {
        FlightGuard { registry: self, identifier, generation, settled: false }
    }

    /// Forget every pending and failed entry.
    pub(crate) fn clear(&self) {
        self.inner.lock().expect("FlightRegistry mutex poisoned").flights.clear();
    }

    /// Failure markers currently held, expired ones included until the next
    /// admission sweeps them.
    pub(crate) fn negative_len(&self) -> usize {
        let inner = self.inner.lock().expect("FlightRegistry mutex poisoned");
        inner.flights.values().filter(|f| matches!(f, Flight::Failed { .. })).count()
    }

    pub(crate) fn pending_len(&self) -> usize {
        let inner = self.inner.lock().expect("FlightRegistry mutex poisoned");
        inner.flights.values().filter(|f| matches!(f, Flight::Pending { .. })).count()
    }
}

/// Settles one flight exactly once.
pub(crate) struct FlightGuard<'a, I> {
    registry: &'a FlightRegistry<I>,
    identifier: &'a PersonIdentifier,
    generation: u64,
    settled: bool,
}

impl<I> FlightGuard<'_, I> {
    /// Record the outcome.
    ///
    /// `KeyNotFound` becomes a failure marker until `expires_at`; any other
    /// outcome just clears the entry. A stale generation (after `clear`) is
    /// ignored.
    pub(crate) fn complete(mut self, result: &Result<PersonRecord>, expires_at: Option<I>) {
        self.settled = true;
        let mut inner = self.registry.inner.lock().expect("FlightRegistry mutex poisoned");
        if !inner.is_current(self.identifier, self.generation) {
            return;
        }

        if matches!(result, Err(Error::KeyNotFound(_))) {
            inner.flights.insert(self.identifier.clone(), Flight::Failed { expires_at });
        } else {
            inner.flights.remove(self.identifier);
        }
    }
}

impl<I> Drop for FlightGuard<'_, I> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // May run while unwinding; a poisoned lock is left alone
        let Ok(mut inner) = self.registry.inner.lock() else {
            return;
        };
        if inner.is_current(self.identifier, self.generation) {
            tracing::warn!(identifier = %self.identifier, "Discovery flight abandoned");
            inner.flights.remove(self.identifier);
        }
    }
}

impl<I> RegistryInner<I> {
    fn is_current(&self, identifier: &PersonIdentifier, generation: u64) -> bool {
        matches!(
            self.flights.get(identifier),
            Some(Flight::Pending { generation: g, .. }) if *g == generation
        )
    }
}
