//! Identity key pairs, public keys and fingerprints.
//!
//! An identity is two keys: Ed25519 for signing identity proofs and X25519
//! for receiving sealed content keys. Both halves travel together as a
//! [`PublicKey`], and a [`Fingerprint`] names that pair in envelope
//! manifests.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use crate::CryptoError;

/// Size of a serialized public key (signing half || exchange half).
pub const PUBLIC_KEY_SIZE: usize = 64;

/// Size of serialized secret key material (signing seed || exchange secret).
pub const SECRET_KEY_SIZE: usize = 64;

/// Size of an Ed25519 signature.
pub const SIGNATURE_SIZE: usize = 64;

/// Size of a key fingerprint.
pub const FINGERPRINT_SIZE: usize = 32;

/// Domain separation label for fingerprints
const FINGERPRINT_LABEL: &[u8] = b"postkeyFingerprintV1";

/// SHA-256 fingerprint of a [`PublicKey`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Wrap raw fingerprint bytes.
    pub fn from_bytes(bytes: [u8; FINGERPRINT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({}..)", hex::encode(&self.0[..4]))
    }
}

/// Public half of an identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    signing: [u8; 32],
    exchange: [u8; 32],
}

impl PublicKey {
    /// Parse from the 64-byte `signing || exchange` form.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength` if `bytes` is not 64 bytes
    /// - `InvalidSigningKey` if the signing half is not a valid Ed25519 point
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut signing = [0u8; 32];
        let mut exchange = [0u8; 32];
        signing.copy_from_slice(&bytes[..32]);
        exchange.copy_from_slice(&bytes[32..]);

        VerifyingKey::from_bytes(&signing).map_err(|_| CryptoError::InvalidSigningKey)?;

        Ok(Self { signing, exchange })
    }

    /// Serialize to the 64-byte `signing || exchange` form.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let mut out = [0u8; PUBLIC_KEY_SIZE];
        out[..32].copy_from_slice(&self.signing);
        out[32..].copy_from_slice(&self.exchange);
        out
    }

    /// Ed25519 verifying key bytes.
    pub fn signing_bytes(&self) -> &[u8; 32] {
        &self.signing
    }

    /// X25519 public key bytes.
    pub fn exchange_bytes(&self) -> &[u8; 32] {
        &self.exchange
    }

    /// Fingerprint naming this key in envelope manifests.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_LABEL);
        hasher.update(self.signing);
        hasher.update(self.exchange);
        Fingerprint(hasher.finalize().into())
    }

    /// Verify an Ed25519 signature made by this identity.
    ///
    /// # Errors
    ///
    /// - `InvalidSigningKey` if the signing half is not a valid point
    /// - `InvalidKeyLength` if `signature` is not 64 bytes
    /// - `InvalidSignature` if verification fails
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.signing).map_err(|_| CryptoError::InvalidSigningKey)?;

        let signature: [u8; SIGNATURE_SIZE] =
            signature.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: SIGNATURE_SIZE,
                actual: signature.len(),
            })?;

        verifying_key
            .verify(message, &Signature::from_bytes(&signature))
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({:?})", self.fingerprint())
    }
}

/// Secret half of an identity.
///
/// Both inner secrets zeroize themselves on drop.
#[derive(Clone)]
pub struct IdentityKeyPair {
    signing: SigningKey,
    exchange: StaticSecret,
}

impl IdentityKeyPair {
    /// Build from 64 bytes of secret material (signing seed || exchange
    /// secret).
    ///
    /// # Security
    ///
    /// Caller MUST provide cryptographically secure random bytes in
    /// production.
    pub fn from_seed(seed: &[u8; SECRET_KEY_SIZE]) -> Self {
        let mut signing_seed = Zeroizing::new([0u8; 32]);
        let mut exchange_secret = Zeroizing::new([0u8; 32]);
        signing_seed.copy_from_slice(&seed[..32]);
        exchange_secret.copy_from_slice(&seed[32..]);

        Self {
            signing: SigningKey::from_bytes(&signing_seed),
            exchange: StaticSecret::from(*exchange_secret),
        }
    }

    /// Parse from a slice, checking the length.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let seed: Zeroizing<[u8; SECRET_KEY_SIZE]> =
            Zeroizing::new(bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            })?);
        Ok(Self::from_seed(&seed))
    }

    /// Export secret material in the `from_seed` layout.
    pub fn to_secret_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_SIZE]> {
        let mut out = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
        out[..32].copy_from_slice(&self.signing.to_bytes());
        out[32..].copy_from_slice(&self.exchange.to_bytes());
        out
    }

    /// Public half of this identity.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            signing: self.signing.verifying_key().to_bytes(),
            exchange: x25519_dalek::PublicKey::from(&self.exchange).to_bytes(),
        }
    }

    /// Sign a message with the Ed25519 half.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing.sign(message).to_bytes()
    }

    /// X25519 with a peer's (usually ephemeral) public key.
    pub(crate) fn diffie_hellman(
        &self,
        their_public: &[u8; 32],
    ) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        let shared = self.exchange.diffie_hellman(&x25519_dalek::PublicKey::from(*their_public));
        if !shared.was_contributory() {
            return Err(CryptoError::NonContributory);
        }
        Ok(Zeroizing::new(shared.to_bytes()))
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdentityKeyPair({:?})", self.public_key().fingerprint())
    }
}
