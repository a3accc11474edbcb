//! Simulated people with deterministic identity keys.

use postkey_core::{PersonIdentifier, Result, create_proof};
use postkey_crypto::{IdentityKeyPair, PublicKey, SECRET_KEY_SIZE};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// A person in a simulation: an identifier and the key pair they own.
#[derive(Debug, Clone)]
pub struct Persona {
    identifier: PersonIdentifier,
    identity: IdentityKeyPair,
}

impl Persona {
    /// Persona whose key pair is derived from `seed`.
    pub fn new(identifier: PersonIdentifier, seed: u64) -> Self {
        let mut secret = [0u8; SECRET_KEY_SIZE];
        ChaCha20Rng::seed_from_u64(seed).fill_bytes(&mut secret);
        Self { identifier, identity: IdentityKeyPair::from_seed(&secret) }
    }

    /// Persona on `network` named `user_id`.
    pub fn on(network: &str, user_id: &str, seed: u64) -> Result<Self> {
        Ok(Self::new(PersonIdentifier::new(network, user_id)?, seed))
    }

    /// Who this persona is.
    pub fn identifier(&self) -> &PersonIdentifier {
        &self.identifier
    }

    /// Private key pair.
    pub fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    /// Public half of [`identity`](Self::identity).
    pub fn public_key(&self) -> PublicKey {
        self.identity.public_key()
    }

    /// Proof text binding this persona's key to its identifier.
    pub fn proof(&self) -> Result<String> {
        create_proof(&self.identity, &self.identifier)
    }
}
