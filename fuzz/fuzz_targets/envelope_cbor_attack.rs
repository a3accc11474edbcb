//! Fuzz target for structurally plausible but hostile envelopes
//!
//! # Strategy
//!
//! - Wrong field types: `v` as text, `iv` as an integer
//! - Bad lengths: iv shorter or longer than 24 bytes, oversized rosters
//! - Mismatched layouts: manifests on combined versions and vice versa
//! - Hostile payloads: slot lists with bad ephemerals or nested garbage
//!
//! # Invariants
//!
//! - Decoding never panics
//! - Unwrapping anything that decodes never panics
//! - Unknown version tags surface as `VersionUnsupported`

#![no_main]

use arbitrary::Arbitrary;
use ciborium::value::Value;
use libfuzzer_sys::fuzz_target;
use postkey_crypto::IdentityKeyPair;
use postkey_proto::{Envelope, EnvelopeError, VersionTag};

#[derive(Debug, Arbitrary)]
struct Attack {
    version: i8,
    version_as_text: bool,
    iv_len: u8,
    iv_as_integer: bool,
    slots: Vec<Slot>,
    recipients: Option<RecipientList>,
    payload_garbage: Option<Vec<u8>>,
}

#[derive(Debug, Arbitrary)]
struct Slot {
    ephemeral_len: u8,
    ciphertext: Vec<u8>,
}

#[derive(Debug, Arbitrary)]
struct RecipientList {
    count: u16,
    fingerprint_len: u8,
}

fn encode(value: &Value) -> Vec<u8> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).expect("in-memory write");
    bytes
}

fn build(attack: &Attack) -> Vec<u8> {
    let v = if attack.version_as_text {
        Value::Text(attack.version.to_string())
    } else {
        Value::Integer(attack.version.into())
    };
    let iv = if attack.iv_as_integer {
        Value::Integer(u64::from(attack.iv_len).into())
    } else {
        Value::Bytes(vec![0x11; usize::from(attack.iv_len % 64)])
    };

    let payload = match &attack.payload_garbage {
        Some(garbage) => garbage.clone(),
        None => {
            let slots = attack
                .slots
                .iter()
                .take(64)
                .map(|slot| {
                    Value::Map(vec![
                        (
                            Value::Text("ephemeral".into()),
                            Value::Bytes(vec![9; usize::from(slot.ephemeral_len % 48)]),
                        ),
                        (Value::Text("ciphertext".into()), Value::Bytes(slot.ciphertext.clone())),
                    ])
                })
                .collect();
            encode(&Value::Array(slots))
        },
    };

    let mut fields = vec![
        (Value::Text("v".into()), v),
        (Value::Text("iv".into()), iv),
        (Value::Text("payload".into()), Value::Bytes(payload)),
    ];
    if let Some(list) = &attack.recipients {
        let fingerprints = (0..list.count % 5000)
            .map(|i| {
                let byte = Value::Integer(u64::from(i as u8).into());
                Value::Array(vec![byte; usize::from(list.fingerprint_len % 40)])
            })
            .collect();
        fields.push((Value::Text("recipients".into()), Value::Array(fingerprints)));
    }

    encode(&Value::Map(fields))
}

fuzz_target!(|attack: Attack| {
    let bytes = build(&attack);

    match Envelope::decode(&bytes) {
        Ok(envelope) => {
            let holder = IdentityKeyPair::from_seed(&[0x33; 64]);
            let _ = postkey_proto::unwrap(&envelope, &holder);
        },
        Err(EnvelopeError::VersionUnsupported(tag)) => {
            assert!(VersionTag::from_wire(tag).is_none());
        },
        Err(_) => {},
    }
});
