//! Key discovery and share-target expansion for encrypted posts.
//!
//! A post's content key is wrapped once per reader and published next to the
//! post. This crate finds the readers' public keys and keeps the published
//! envelope current as readers are added.
//!
//! # Components
//!
//! - [`KeyDiscoveryCoordinator`]: Resolves identifiers to public keys by racing
//!   [`BioKeyStrategy`] against [`ProvePostStrategy`], single-flight per
//!   identifier with a negative cache
//! - [`DirectoryStore`]: Trust-on-first-use store of [`PersonRecord`]s
//! - [`ProofVerifier`]: Extracts signed key proofs from untrusted text
//! - [`ShareTargetExpander`]: Publishes envelopes and adds recipients to them
//!
//! # Collaborators
//!
//! Social networks, the envelope store and the local keyring are reached
//! through the async traits in [`ports`]. Time and randomness come from an
//! [`Environment`](env::Environment), so tests run against a simulated clock.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
pub mod directory;
pub mod discovery;
pub mod env;
mod error;
mod identifier;
mod person;
pub mod ports;
mod proof;
mod share;
mod system_env;

pub use config::{DEFAULT_LEGACY_NETWORK, DEFAULT_NEGATIVE_TTL, DiscoveryConfig};
pub use directory::{DirectoryStore, MemoryDirectory};
pub use discovery::{
    BioKeyStrategy, DiscoveredKey, DiscoveryStrategy, KeyDiscoveryCoordinator, ProvePostStrategy,
};
pub use error::{Error, Result};
pub use identifier::{PersonIdentifier, PostIdentifier};
pub use person::PersonRecord;
pub use ports::{
    LegacyProvePostStore, LocalKeyStore, NetworkPublisher, PostFetcher, PostLocator, Profile,
    ProfileFetcher, ProvePostStore,
};
pub use proof::{PROOF_MARKER, ProofVerifier, create_proof};
pub use share::ShareTargetExpander;
pub use system_env::SystemEnv;
