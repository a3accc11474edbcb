//! Error types for postkey cryptographic operations.

use thiserror::Error;

/// Errors from key parsing, signature checks and slot sealing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key or signature material had the wrong length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Bytes do not encode a valid Ed25519 point
    #[error("invalid signing key")]
    InvalidSigningKey,

    /// Signature did not verify against the claimed key
    #[error("signature verification failed")]
    InvalidSignature,

    /// DH produced an all-zero shared secret (low-order peer key)
    #[error("non-contributory key exchange")]
    NonContributory,

    /// Slot could not be opened with the holder's key (wrong key or tamper)
    #[error("slot decryption failed")]
    OpenFailed,
}
