//! Identity proofs embedded in untrusted text.
//!
//! A user publishes a proof in their profile bio or in a dedicated post. The
//! proof is a token between two lock markers, anywhere in the text:
//!
//! ```text
//! Hi, I'm Alice 🔒<base64url(CBOR{v, id, key, sig})>🔒
//! ```
//!
//! `sig` is an Ed25519 signature by `key` over
//! `"postkey-proof-v1" 0x00 <id> 0x00 <signing key> <exchange key>`, which
//! binds the key pair to exactly one identifier.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use postkey_crypto::{IdentityKeyPair, PublicKey};
use serde::{Deserialize, Serialize};

use crate::{Error, PersonIdentifier, Result};

/// Delimits a proof token.
pub const PROOF_MARKER: char = '🔒';

/// Longest token text considered. Real tokens are well under this.
const MAX_TOKEN_LEN: usize = 1024;

const PROOF_VERSION: u8 = 1;
const PROOF_LABEL: &[u8] = b"postkey-proof-v1";

#[derive(Serialize, Deserialize)]
struct ProofToken {
    v: u8,
    id: String,
    key: PublicKey,
    sig: Vec<u8>,
}

/// Extracts and checks identity proofs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProofVerifier;

impl ProofVerifier {
    /// Public key proven for `claimed` by a token in `content`.
    ///
    /// Malformed and oversized tokens are skipped; the first token for
    /// `claimed` with a valid signature wins.
    ///
    /// # Errors
    ///
    /// - `ProofInvalid` if no such token exists
    pub fn verify(content: &str, claimed: &PersonIdentifier) -> Result<PublicKey> {
        let claimed = claimed.to_string();

        candidate_tokens(content)
            .filter_map(decode_token)
            .find(|token| {
                token.v == PROOF_VERSION
                    && token.id == claimed
                    && token.key.verify(&signed_message(&token.id, &token.key), &token.sig).is_ok()
            })
            .map(|token| token.key)
            .ok_or(Error::ProofInvalid)
    }
}

/// Proof text for `identifier`, signed by `identity`.
///
/// # Errors
///
/// - `Envelope` if CBOR encoding fails
pub fn create_proof(identity: &IdentityKeyPair, identifier: &PersonIdentifier) -> Result<String> {
    let id = identifier.to_string();
    let key = identity.public_key();
    let sig = identity.sign(&signed_message(&id, &key)).to_vec();

    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&ProofToken { v: PROOF_VERSION, id, key, sig }, &mut bytes)
        .map_err(|e| Error::Envelope(e.to_string()))?;

    Ok(format!("{PROOF_MARKER}{}{PROOF_MARKER}", URL_SAFE_NO_PAD.encode(bytes)))
}

/// Every substring between two consecutive markers.
fn candidate_tokens(content: &str) -> impl Iterator<Item = &str> {
    let mut parts: Vec<&str> = content.split(PROOF_MARKER).collect();
    // Text after the last marker is not enclosed.
    parts.pop();
    parts
        .into_iter()
        .skip(1)
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.len() <= MAX_TOKEN_LEN)
}

fn decode_token(text: &str) -> Option<ProofToken> {
    let bytes = URL_SAFE_NO_PAD.decode(text).ok()?;
    ciborium::de::from_reader(bytes.as_slice()).ok()
}

fn signed_message(id: &str, key: &PublicKey) -> Vec<u8> {
    let mut message = Vec::with_capacity(PROOF_LABEL.len() + id.len() + 66);
    message.extend_from_slice(PROOF_LABEL);
    message.push(0);
    message.extend_from_slice(id.as_bytes());
    message.push(0);
    message.extend_from_slice(key.signing_bytes());
    message.extend_from_slice(key.exchange_bytes());
    message
}
