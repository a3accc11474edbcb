//! Person directory.
//!
//! Synchronous store of [`PersonRecord`]s. The directory is the only place a
//! discovered key is written, and it enforces trust-on-first-use: `put` merges
//! into the existing record and refuses to replace a public key.

mod memory;

pub use memory::MemoryDirectory;

use crate::{PersonIdentifier, PersonRecord, Result};

/// Storage abstraction for person records.
///
/// Must be Clone (shared by the coordinator and its background tasks), Send +
/// Sync, and synchronous. Implementations share internal state via Arc, so
/// clones access the same records.
///
/// # Panics
///
/// Implementations may panic if internal synchronization primitives are
/// poisoned.
pub trait DirectoryStore: Clone + Send + Sync + 'static {
    /// Record for `identifier`, if any.
    fn get(&self, identifier: &PersonIdentifier) -> Result<Option<PersonRecord>>;

    /// Merge `record` into the stored one and return the result.
    ///
    /// # Invariants
    ///
    /// - Post: a stored `public_key` is never replaced by a different key
    /// - Post: check and write happen atomically
    ///
    /// # Errors
    ///
    /// - `KeyConflict` if a different key is already stored; nothing is
    ///   written
    fn put(&self, record: PersonRecord) -> Result<PersonRecord>;

    /// Every stored record, in no particular order.
    fn records(&self) -> Result<Vec<PersonRecord>>;
}
