//! Error types for key discovery and share-target expansion.
//!
//! One enum for the whole crate. It is `Clone` because a single pending
//! resolution hands its result to every caller waiting on it.

use postkey_proto::EnvelopeError;
use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from discovery, the directory and envelope publication.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No public key could be discovered for the identifier
    #[error("no public key found for {0}")]
    KeyNotFound(String),

    /// Content carries no valid proof for the claimed identifier
    #[error("no valid identity proof in content")]
    ProofInvalid,

    /// Fetching from or publishing to the network failed
    #[error("network error: {0}")]
    Network(String),

    /// Referenced content does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Requesting identity cannot unwrap the envelope
    #[error("access denied")]
    AccessDenied,

    /// Envelope carries a version tag no codec handles
    #[error("unsupported envelope version: {0}")]
    VersionUnsupported(i8),

    /// A different key is already recorded for this identifier
    #[error("conflicting public key for {identifier}")]
    KeyConflict {
        /// Identifier whose recorded key would have been replaced
        identifier: String,
    },

    /// Identifier text failed to parse or validate
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Envelope version does not live at the given locator
    #[error("version {version} envelopes cannot be published at {locator}")]
    LocatorMismatch {
        /// Envelope's wire version tag
        version: i8,
        /// Locator the caller supplied
        locator: String,
    },

    /// Envelope bytes or payload are corrupt
    #[error("envelope error: {0}")]
    Envelope(String),

    /// A background discovery task panicked or was cancelled
    #[error("discovery task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Only network failures qualify. A missing key is cached negatively and
    /// retried after the suppression window, not immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<EnvelopeError> for Error {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::AccessDenied => Self::AccessDenied,
            EnvelopeError::VersionUnsupported(tag) => Self::VersionUnsupported(tag),
            other => Self::Envelope(other.to_string()),
        }
    }
}
