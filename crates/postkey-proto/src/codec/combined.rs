//! Combined slot layout (`-40`, `-39`).
//!
//! The payload is a bare list of slots. Nothing on the wire says which slot
//! belongs to whom, so unwrap trial-decrypts. Slot 0 is sealed to the owner
//! and also carries the roster of every other recipient; without it the
//! envelope cannot be regenerated.

use postkey_crypto::{ContentKey, IV_SIZE, IdentityKeyPair, PublicKey};

use super::{
    RandomSource, SlotBody, decode_slots, encode_slots, open_slot, owner_first_roster, seal_slot,
};
use crate::{Envelope, EnvelopeError, Result, VersionTag};

/// `roster[0]` is the owner.
pub(crate) fn wrap(
    version: VersionTag,
    content_key: &ContentKey,
    roster: &[PublicKey],
    iv: [u8; IV_SIZE],
    random: RandomSource<'_>,
) -> Result<Envelope> {
    let mut slots = Vec::with_capacity(roster.len());
    for (index, recipient) in roster.iter().enumerate() {
        let body = if index == 0 {
            SlotBody::new(content_key, Some(roster[1..].to_vec()))
        } else {
            SlotBody::new(content_key, None)
        };
        slots.push(seal_slot(version, &body, recipient, &iv, random)?);
    }

    Ok(Envelope::new(version, iv, encode_slots(&slots)?, None))
}

pub(crate) fn unwrap(envelope: &Envelope, holder: &IdentityKeyPair) -> Result<ContentKey> {
    open_any(envelope, holder)?.content_key()
}

/// Regenerate every slot for roster ∪ `new_recipients` under the same iv.
///
/// Only the owner can do this: the roster lives in the owner slot.
pub(crate) fn extend(
    envelope: &Envelope,
    holder: &IdentityKeyPair,
    new_recipients: &[PublicKey],
    random: RandomSource<'_>,
) -> Result<Envelope> {
    let mut body = open_any(envelope, holder)?;
    let Some(existing) = body.take_roster() else {
        return Err(EnvelopeError::AccessDenied);
    };

    let content_key = body.content_key()?;
    let roster = owner_first_roster(&holder.public_key(), &existing, new_recipients)?;

    wrap(envelope.version(), &content_key, &roster, *envelope.iv(), random)
}

fn open_any(envelope: &Envelope, holder: &IdentityKeyPair) -> Result<SlotBody> {
    for slot in decode_slots(envelope.payload())? {
        if let Some(body) = open_slot(envelope.version(), &slot, holder, envelope.iv())? {
            return Ok(body);
        }
    }
    Err(EnvelopeError::AccessDenied)
}

#[cfg(test)]
mod tests {
    use postkey_crypto::{CONTENT_KEY_SIZE, SECRET_KEY_SIZE};

    use super::*;
    use crate::codec;

    fn identity(fill: u8) -> IdentityKeyPair {
        IdentityKeyPair::from_seed(&[fill; SECRET_KEY_SIZE])
    }

    fn counter() -> impl FnMut(&mut [u8]) {
        let mut next = 0u8;
        move |buf: &mut [u8]| {
            for byte in buf {
                next = next.wrapping_add(1);
                *byte = next;
            }
        }
    }

    #[test]
    fn payload_has_one_slot_per_recipient() {
        let owner = identity(1);
        let key = ContentKey::from_bytes([9; CONTENT_KEY_SIZE]);
        let mut random = counter();

        let envelope = codec::wrap(
            VersionTag::V39,
            &key,
            &[identity(2).public_key(), identity(3).public_key()],
            &owner,
            &mut random,
        )
        .unwrap();

        assert_eq!(decode_slots(envelope.payload()).unwrap().len(), 3);
        assert!(envelope.recipients().is_none());
    }

    #[test]
    fn only_owner_can_extend() {
        let owner = identity(1);
        let reader = identity(2);
        let key = ContentKey::from_bytes([9; CONTENT_KEY_SIZE]);
        let mut random = counter();

        let envelope =
            codec::wrap(VersionTag::V40, &key, &[reader.public_key()], &owner, &mut random)
                .unwrap();

        let result = extend(&envelope, &reader, &[identity(3).public_key()], &mut random);
        assert_eq!(result, Err(EnvelopeError::AccessDenied));
    }

    #[test]
    fn extend_keeps_iv_and_regenerates_slots() {
        let owner = identity(1);
        let reader = identity(2);
        let key = ContentKey::from_bytes([9; CONTENT_KEY_SIZE]);
        let mut random = counter();

        let envelope =
            codec::wrap(VersionTag::V39, &key, &[reader.public_key()], &owner, &mut random)
                .unwrap();
        let extended =
            extend(&envelope, &owner, &[identity(3).public_key()], &mut random).unwrap();

        assert_eq!(extended.iv(), envelope.iv());
        assert_eq!(extended.version(), VersionTag::V39);
        assert_ne!(extended.payload(), envelope.payload());
        assert_eq!(decode_slots(extended.payload()).unwrap().len(), 3);
        assert_eq!(unwrap(&extended, &reader).unwrap(), key);
    }

    #[test]
    fn slots_do_not_transplant_between_versions() {
        let owner = identity(1);
        let key = ContentKey::from_bytes([9; CONTENT_KEY_SIZE]);
        let mut random = counter();

        let v40 = codec::wrap(VersionTag::V40, &key, &[], &owner, &mut random).unwrap();
        let relabelled = Envelope::new(VersionTag::V39, *v40.iv(), v40.payload().to_vec(), None);

        assert_eq!(unwrap(&relabelled, &owner), Err(EnvelopeError::AccessDenied));
    }
}
