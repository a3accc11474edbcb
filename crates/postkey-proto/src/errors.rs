//! Envelope error types.

use postkey_crypto::CryptoError;
use thiserror::Error;

/// Result alias for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;

/// Errors from wrapping, unwrapping and (de)serializing envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Holder's key cannot recover the content key under this envelope
    #[error("access denied: key cannot unwrap this envelope")]
    AccessDenied,

    /// No codec is registered for the wire tag
    #[error("unsupported envelope version: {0}")]
    VersionUnsupported(i8),

    /// Encoded envelope exceeds the size limit
    #[error("envelope too large: {size} bytes (max {max})")]
    TooLarge {
        /// Actual size in bytes
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// Structurally invalid envelope or payload
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// CBOR serialization failed
    #[error("CBOR encoding failed: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed
    #[error("CBOR decoding failed: {0}")]
    CborDecode(String),

    /// Sealing a slot failed (e.g. low-order recipient key)
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
