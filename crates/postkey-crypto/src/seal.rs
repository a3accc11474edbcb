//! Single-recipient key sealing using X25519, HKDF and `XChaCha20-Poly1305`.
//!
//! All functions are pure - the ephemeral secret and iv are provided by the
//! caller. Envelope codecs call [`seal`] once per recipient slot.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, Zeroizing};

use crate::{CryptoError, IdentityKeyPair, PublicKey};

/// Size of the `XChaCha20` nonce carried as the envelope iv.
pub const IV_SIZE: usize = 24;

/// Label prefixed to the HKDF info parameter
const SEAL_LABEL: &[u8] = b"postkeySealV1";

/// One sealed recipient slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    /// Ephemeral X25519 public key for this slot
    pub ephemeral: [u8; 32],
    /// AEAD ciphertext including 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
}

/// Seal `plaintext` so that only `recipient` can open it.
///
/// `context` is bound into both the key derivation and the AEAD associated
/// data; [`open`] must be called with the same value.
///
/// # Security
///
/// - `ephemeral_secret` MUST be fresh per slot. Slots in one envelope share
///   the iv, so key uniqueness comes from the ephemeral secret alone
/// - Caller MUST provide cryptographically secure random bytes in production
///
/// # Errors
///
/// - `NonContributory` if `recipient` has a low-order exchange key
pub fn seal(
    plaintext: &[u8],
    recipient: &PublicKey,
    ephemeral_secret: [u8; 32],
    iv: &[u8; IV_SIZE],
    context: &[u8],
) -> Result<SealedKey, CryptoError> {
    let ephemeral = StaticSecret::from(ephemeral_secret);
    let ephemeral_public = x25519_dalek::PublicKey::from(&ephemeral).to_bytes();

    let shared =
        ephemeral.diffie_hellman(&x25519_dalek::PublicKey::from(*recipient.exchange_bytes()));
    if !shared.was_contributory() {
        return Err(CryptoError::NonContributory);
    }

    let key =
        derive_slot_key(shared.as_bytes(), &ephemeral_public, recipient.exchange_bytes(), context);
    let cipher = XChaCha20Poly1305::new((&*key).into());

    let Ok(ciphertext) =
        cipher.encrypt(XNonce::from_slice(iv), Payload { msg: plaintext, aad: context })
    else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    Ok(SealedKey { ephemeral: ephemeral_public, ciphertext })
}

/// Open a slot sealed to `holder`.
///
/// # Errors
///
/// - `NonContributory` if the slot's ephemeral key is low-order
/// - `OpenFailed` if the slot was not sealed to `holder`, was sealed under a
///   different iv or context, or was tampered with
pub fn open(
    sealed: &SealedKey,
    holder: &IdentityKeyPair,
    iv: &[u8; IV_SIZE],
    context: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let shared = holder.diffie_hellman(&sealed.ephemeral)?;
    let holder_public = holder.public_key();

    let key = derive_slot_key(&shared, &sealed.ephemeral, holder_public.exchange_bytes(), context);
    let cipher = XChaCha20Poly1305::new((&*key).into());

    cipher
        .decrypt(XNonce::from_slice(iv), Payload { msg: &sealed.ciphertext, aad: context })
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::OpenFailed)
}

/// Derive the 32-byte AEAD key for one slot.
///
/// salt = ephemeral public || recipient public, info = label || context
fn derive_slot_key(
    shared_secret: &[u8; 32],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
    context: &[u8],
) -> Zeroizing<[u8; 32]> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_public);
    salt[32..].copy_from_slice(recipient_public);

    let hkdf = Hkdf::<Sha256>::new(Some(&salt[..]), shared_secret);

    let mut info = Vec::with_capacity(SEAL_LABEL.len() + context.len());
    info.extend_from_slice(SEAL_LABEL);
    info.extend_from_slice(context);

    let mut key = Zeroizing::new([0u8; 32]);
    let Ok(()) = hkdf.expand(&info, &mut key[..]) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    salt.zeroize();
    key
}
