//! Person records held by the directory.

use postkey_crypto::PublicKey;

use crate::{Error, PersonIdentifier, PostIdentifier, Result};

/// What the system knows about one person.
///
/// # Invariants
///
/// - `public_key`, once set, never changes to a different key
///   (trust-on-first-use)
/// - Records are never deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    /// Who this record describes.
    pub identifier: PersonIdentifier,
    /// Discovered or locally generated public key.
    pub public_key: Option<PublicKey>,
    /// Post that carried the proof the key was discovered from.
    pub prove_post: Option<PostIdentifier>,
    /// Whether this is one of the local user's own identities.
    pub is_local: bool,
}

impl PersonRecord {
    /// Record with nothing known yet.
    pub fn new(identifier: PersonIdentifier) -> Self {
        Self { identifier, public_key: None, prove_post: None, is_local: false }
    }

    /// Pre-seeded record for one of the local user's identities.
    pub fn local(identifier: PersonIdentifier, public_key: PublicKey) -> Self {
        Self { identifier, public_key: Some(public_key), prove_post: None, is_local: true }
    }

    /// Record produced by a successful discovery.
    pub fn discovered(
        identifier: PersonIdentifier,
        public_key: PublicKey,
        prove_post: Option<PostIdentifier>,
    ) -> Self {
        Self { identifier, public_key: Some(public_key), prove_post, is_local: false }
    }

    /// Fold `update` into this record.
    ///
    /// Absent fields in `update` never erase present ones, and `is_local` is
    /// sticky. Leaves `self` untouched on error.
    ///
    /// # Errors
    ///
    /// - `KeyConflict` if both records carry different public keys
    pub fn merge(&mut self, update: Self) -> Result<()> {
        debug_assert_eq!(self.identifier, update.identifier);

        if let (Some(current), Some(incoming)) = (&self.public_key, &update.public_key)
            && current != incoming
        {
            return Err(Error::KeyConflict { identifier: self.identifier.to_string() });
        }

        if self.public_key.is_none() {
            self.public_key = update.public_key;
        }
        if update.prove_post.is_some() {
            self.prove_post = update.prove_post;
        }
        self.is_local |= update.is_local;

        Ok(())
    }
}
