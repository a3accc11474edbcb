//! Deterministic simulation harness for postkey.
//!
//! In-memory implementations of every collaborator trait, a manually clocked
//! [`SimEnv`], and a [`Fixture`] that wires them to a real coordinator and
//! expander. Fetches and publishes yield to the scheduler, so concurrency
//! scenarios interleave even on a single-threaded runtime.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod fixture;
pub mod network;
pub mod persona;
pub mod sim_env;
pub mod social;
pub mod stores;

pub use fixture::Fixture;
pub use network::MemoryNetwork;
pub use persona::Persona;
pub use sim_env::{SimEnv, SimInstant};
pub use social::FakeSocialNetwork;
pub use stores::{MemoryKeyStore, MemoryLegacyProvePostStore, MemoryProvePostStore};
