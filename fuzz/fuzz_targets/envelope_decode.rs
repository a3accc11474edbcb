//! Fuzz target for Envelope::decode
//!
//! Arbitrary bytes are decoded as an envelope. Anything that decodes must
//! re-encode to an equal envelope, and unwrapping it with an unrelated key
//! must fail cleanly.
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use postkey_crypto::IdentityKeyPair;
use postkey_proto::Envelope;

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = Envelope::decode(data) else {
        return;
    };

    let bytes = envelope.encode().expect("decoded envelope must re-encode");
    let again = Envelope::decode(&bytes).expect("re-encoded envelope must decode");
    assert_eq!(envelope, again);

    let stranger = IdentityKeyPair::from_seed(&[0x5a; 64]);
    let _ = postkey_proto::unwrap(&envelope, &stranger);
});
