//! Manifest slot layout (`-38`).
//!
//! `recipients[i]` is the fingerprint of the key that slot `i` is sealed to.
//! Extension appends; slots already present are never re-sealed.

use postkey_crypto::{ContentKey, Fingerprint, IV_SIZE, IdentityKeyPair, PublicKey};

use super::{RandomSource, SlotBody, decode_slots, encode_slots, open_slot, seal_slot};
use crate::{Envelope, EnvelopeError, MAX_RECIPIENTS, Result, VersionTag};

pub(crate) fn wrap(
    version: VersionTag,
    content_key: &ContentKey,
    roster: &[PublicKey],
    iv: [u8; IV_SIZE],
    random: RandomSource<'_>,
) -> Result<Envelope> {
    let body = SlotBody::new(content_key, None);

    let mut slots = Vec::with_capacity(roster.len());
    for recipient in roster {
        slots.push(seal_slot(version, &body, recipient, &iv, random)?);
    }

    let fingerprints = roster.iter().map(PublicKey::fingerprint).collect();
    Ok(Envelope::new(version, iv, encode_slots(&slots)?, Some(fingerprints)))
}

pub(crate) fn unwrap(envelope: &Envelope, holder: &IdentityKeyPair) -> Result<ContentKey> {
    let recipients = manifest(envelope)?;
    let slots = decode_slots(envelope.payload())?;
    if slots.len() != recipients.len() {
        return Err(EnvelopeError::Malformed(format!(
            "{} slots for {} recipients",
            slots.len(),
            recipients.len()
        )));
    }

    let fingerprint = holder.public_key().fingerprint();
    let Some(index) = recipients.iter().position(|r| *r == fingerprint) else {
        return Err(EnvelopeError::AccessDenied);
    };

    match open_slot(envelope.version(), &slots[index], holder, envelope.iv())? {
        Some(body) => body.content_key(),
        None => Err(EnvelopeError::AccessDenied),
    }
}

/// Append a slot for each key in `new_recipients` not already listed.
pub(crate) fn extend(
    envelope: &Envelope,
    holder: &IdentityKeyPair,
    new_recipients: &[PublicKey],
    random: RandomSource<'_>,
) -> Result<Envelope> {
    let content_key = unwrap(envelope, holder)?;

    let mut recipients = manifest(envelope)?.to_vec();
    let mut slots = decode_slots(envelope.payload())?;
    let body = SlotBody::new(&content_key, None);

    for recipient in new_recipients {
        let fingerprint = recipient.fingerprint();
        if recipients.contains(&fingerprint) {
            continue;
        }
        if recipients.len() == MAX_RECIPIENTS {
            return Err(EnvelopeError::Malformed(format!(
                "recipients would exceed limit of {MAX_RECIPIENTS}"
            )));
        }

        slots.push(seal_slot(envelope.version(), &body, recipient, envelope.iv(), random)?);
        recipients.push(fingerprint);
    }

    Ok(Envelope::new(envelope.version(), *envelope.iv(), encode_slots(&slots)?, Some(recipients)))
}

fn manifest(envelope: &Envelope) -> Result<&[Fingerprint]> {
    envelope.recipients().ok_or_else(|| {
        EnvelopeError::Malformed(format!("version {} requires a manifest", envelope.version()))
    })
}
