//! Versioned envelope codecs.
//!
//! [`wrap`], [`unwrap`] and [`extend`] dispatch on the envelope's
//! [`VersionTag`] to one of two slot layouts:
//!
//! - combined: anonymous slots, owner holds the sealed roster (`-40`, `-39`)
//! - manifest: slots indexed by recipient fingerprint (`-38`)
//!
//! Randomness (the iv and one ephemeral secret per slot) is drawn from the
//! caller-supplied `random` closure, so output is deterministic for a fixed
//! source.

mod combined;
mod manifest;

use postkey_crypto::{
    CONTENT_KEY_SIZE, ContentKey, CryptoError, IV_SIZE, IdentityKeyPair, PublicKey, SealedKey,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::{Envelope, EnvelopeError, MAX_RECIPIENTS, Result, VersionTag, envelope::cbor_bytes};

/// Source of random bytes for ivs and ephemeral secrets.
pub type RandomSource<'a> = &'a mut dyn FnMut(&mut [u8]);

/// Wrap `content_key` for `sender` and every key in `recipients`.
///
/// The sender is always the first (owner) slot. Duplicate keys, including a
/// recipient equal to the sender, collapse into one slot.
///
/// # Errors
///
/// - `Malformed` if the deduplicated roster exceeds [`MAX_RECIPIENTS`]
/// - `Crypto` if a recipient key is low-order
pub fn wrap(
    version: VersionTag,
    content_key: &ContentKey,
    recipients: &[PublicKey],
    sender: &IdentityKeyPair,
    random: RandomSource<'_>,
) -> Result<Envelope> {
    let roster = owner_first_roster(&sender.public_key(), recipients, &[])?;

    let mut iv = [0u8; IV_SIZE];
    random(&mut iv);

    match version {
        VersionTag::V40 | VersionTag::V39 => {
            combined::wrap(version, content_key, &roster, iv, random)
        },
        VersionTag::V38 => manifest::wrap(version, content_key, &roster, iv, random),
    }
}

/// Recover the content key as `holder`.
///
/// # Errors
///
/// - `AccessDenied` if no slot opens for `holder`
/// - `CborDecode` / `Malformed` if the payload is corrupt
pub fn unwrap(envelope: &Envelope, holder: &IdentityKeyPair) -> Result<ContentKey> {
    match envelope.version() {
        VersionTag::V40 | VersionTag::V39 => combined::unwrap(envelope, holder),
        VersionTag::V38 => manifest::unwrap(envelope, holder),
    }
}

/// Produce a replacement envelope that also admits `new_recipients`.
///
/// The replacement keeps the original version. Every holder who could
/// unwrap the original can unwrap the replacement.
///
/// # Errors
///
/// - `AccessDenied` if `holder` cannot unwrap, or (combined layouts) is not
///   the owner
/// - `Malformed` if the merged roster exceeds [`MAX_RECIPIENTS`]
pub fn extend(
    envelope: &Envelope,
    holder: &IdentityKeyPair,
    new_recipients: &[PublicKey],
    random: RandomSource<'_>,
) -> Result<Envelope> {
    match envelope.version() {
        VersionTag::V40 | VersionTag::V39 => {
            combined::extend(envelope, holder, new_recipients, random)
        },
        VersionTag::V38 => manifest::extend(envelope, holder, new_recipients, random),
    }
}

/// Plaintext sealed into every slot.
#[derive(Serialize, Deserialize)]
pub(crate) struct SlotBody {
    #[serde(with = "cbor_bytes")]
    key: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    roster: Option<Vec<PublicKey>>,
}

impl SlotBody {
    pub(crate) fn new(content_key: &ContentKey, roster: Option<Vec<PublicKey>>) -> Self {
        Self { key: content_key.as_bytes().to_vec(), roster }
    }

    pub(crate) fn content_key(&self) -> Result<ContentKey> {
        ContentKey::from_slice(&self.key).map_err(|_| {
            EnvelopeError::Malformed(format!(
                "slot key must be {CONTENT_KEY_SIZE} bytes, got {}",
                self.key.len()
            ))
        })
    }

    pub(crate) fn take_roster(&mut self) -> Option<Vec<PublicKey>> {
        self.roster.take()
    }

    fn encode(&self) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(Vec::new());
        ciborium::ser::into_writer(self, &mut *out)
            .map_err(|e| EnvelopeError::CborEncode(e.to_string()))?;
        Ok(out)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| EnvelopeError::CborDecode(e.to_string()))
    }
}

impl Drop for SlotBody {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[derive(Serialize, Deserialize)]
struct WireSlot {
    #[serde(with = "cbor_bytes")]
    ephemeral: Vec<u8>,
    #[serde(with = "cbor_bytes")]
    ciphertext: Vec<u8>,
}

/// Seal `body` to `recipient` with a fresh ephemeral secret.
pub(crate) fn seal_slot(
    version: VersionTag,
    body: &SlotBody,
    recipient: &PublicKey,
    iv: &[u8; IV_SIZE],
    random: RandomSource<'_>,
) -> Result<SealedKey> {
    let mut ephemeral = Zeroizing::new([0u8; 32]);
    random(&mut ephemeral[..]);

    let plaintext = body.encode()?;
    Ok(postkey_crypto::seal(&plaintext, recipient, *ephemeral, iv, version.context())?)
}

/// Try to open one slot as `holder`.
///
/// `Ok(None)` means the slot is not sealed to `holder`.
pub(crate) fn open_slot(
    version: VersionTag,
    slot: &SealedKey,
    holder: &IdentityKeyPair,
    iv: &[u8; IV_SIZE],
) -> Result<Option<SlotBody>> {
    match postkey_crypto::open(slot, holder, iv, version.context()) {
        Ok(plaintext) => SlotBody::decode(&plaintext).map(Some),
        Err(CryptoError::OpenFailed | CryptoError::NonContributory) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn encode_slots(slots: &[SealedKey]) -> Result<Vec<u8>> {
    let wire: Vec<WireSlot> = slots
        .iter()
        .map(|slot| WireSlot {
            ephemeral: slot.ephemeral.to_vec(),
            ciphertext: slot.ciphertext.clone(),
        })
        .collect();

    let mut out = Vec::new();
    ciborium::ser::into_writer(&wire, &mut out)
        .map_err(|e| EnvelopeError::CborEncode(e.to_string()))?;
    Ok(out)
}

pub(crate) fn decode_slots(payload: &[u8]) -> Result<Vec<SealedKey>> {
    let wire: Vec<WireSlot> =
        ciborium::de::from_reader(payload).map_err(|e| EnvelopeError::CborDecode(e.to_string()))?;

    if wire.len() > MAX_RECIPIENTS {
        return Err(EnvelopeError::Malformed(format!(
            "{} slots exceeds limit of {MAX_RECIPIENTS}",
            wire.len()
        )));
    }

    wire.into_iter()
        .map(|slot| {
            let ephemeral: [u8; 32] = slot.ephemeral.as_slice().try_into().map_err(|_| {
                EnvelopeError::Malformed(format!(
                    "slot ephemeral key must be 32 bytes, got {}",
                    slot.ephemeral.len()
                ))
            })?;
            Ok(SealedKey { ephemeral, ciphertext: slot.ciphertext })
        })
        .collect()
}

/// `owner` followed by `existing` then `added`, without repeats.
pub(crate) fn owner_first_roster(
    owner: &PublicKey,
    existing: &[PublicKey],
    added: &[PublicKey],
) -> Result<Vec<PublicKey>> {
    let mut roster = vec![*owner];
    for key in existing.iter().chain(added) {
        if !roster.contains(key) {
            roster.push(*key);
        }
    }

    if roster.len() > MAX_RECIPIENTS {
        return Err(EnvelopeError::Malformed(format!(
            "{} recipients exceeds limit of {MAX_RECIPIENTS}",
            roster.len()
        )));
    }

    Ok(roster)
}
