//! Postkey Cryptographic Primitives
//!
//! Cryptographic building blocks for postkey. Pure functions with
//! deterministic outputs. Callers provide random bytes (ephemeral secrets,
//! nonces) for deterministic testing.
//!
//! # Key Hierarchy
//!
//! Every person owns an identity key pair: an Ed25519 signing key that binds
//! the identity to a social-network account (see the proof format in
//! `postkey-core`) and an X25519 exchange key that recipients use to open
//! envelope slots. A post's content key is sealed once per recipient.
//!
//! ```text
//! Ephemeral X25519 secret (caller-provided)
//!        │
//!        ▼
//! DH(ephemeral, recipient exchange key)
//!        │
//!        ▼
//! HKDF-SHA256 (salt = ephemeral pub || recipient pub, info = context)
//!        │
//!        ▼
//! XChaCha20-Poly1305(iv, aad = context) → sealed slot
//! ```
//!
//! # Security
//!
//! - Fresh ephemeral secret per slot: slots sharing one envelope iv never
//!   share a key, so the nonce is never reused under the same key
//! - Context labels bind a slot to the protocol version that produced it
//! - Non-contributory (low-order) DH results are rejected
//! - Secret key material and content keys are zeroized on drop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod content_key;
mod error;
mod identity;
pub mod seal;

pub use content_key::{CONTENT_KEY_SIZE, ContentKey};
pub use error::CryptoError;
pub use identity::{
    FINGERPRINT_SIZE, Fingerprint, IdentityKeyPair, PUBLIC_KEY_SIZE, PublicKey, SECRET_KEY_SIZE,
    SIGNATURE_SIZE,
};
pub use seal::{IV_SIZE, SealedKey, open, seal};
