//! CLI error types.

use std::path::PathBuf;

use postkey_crypto::CryptoError;
use postkey_proto::EnvelopeError;
use thiserror::Error;

/// Errors from running a `postkey` subcommand.
#[derive(Error, Debug)]
pub enum CliError {
    /// Reading or writing a named file failed
    #[error("{}: {source}", path.display())]
    File {
        /// File that was being accessed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Reading stdin or writing stdout failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A hex argument or key file did not decode
    #[error("invalid hex in {what}: {source}")]
    Hex {
        /// What was being decoded
        what: &'static str,
        /// Decoder failure
        #[source]
        source: hex::FromHexError,
    },

    /// Envelope text is not base64
    #[error("invalid envelope text: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Key material is malformed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Envelope failed to wrap, unwrap or decode
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Identifier parsing or proof checking failed
    #[error(transparent)]
    Core(#[from] postkey_core::Error),
}

/// Result alias for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
