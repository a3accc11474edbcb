//! Fuzz target for ProofVerifier::verify
//!
//! # Invariants
//!
//! - Arbitrary text never panics the verifier
//! - A genuine proof is found no matter what text surrounds it
//! - A genuine proof never verifies for a different identifier

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use postkey_core::{PersonIdentifier, ProofVerifier, create_proof};
use postkey_crypto::IdentityKeyPair;

#[derive(Debug, Arbitrary)]
struct Input {
    prefix: String,
    suffix: String,
    user_id: String,
    seed: [u8; 32],
}

fuzz_target!(|input: Input| {
    let claimed = PersonIdentifier::new("facebook.com", "alice").expect("valid identifier");
    let _ = ProofVerifier::verify(&input.prefix, &claimed);

    let mut seed = [0u8; 64];
    seed[..32].copy_from_slice(&input.seed);
    seed[32..].copy_from_slice(&input.seed);
    let identity = IdentityKeyPair::from_seed(&seed);

    let proof = create_proof(&identity, &claimed).expect("proof encodes");
    let text = format!("{}{proof}{}", input.prefix, input.suffix);

    let key = ProofVerifier::verify(&text, &claimed).expect("embedded proof verifies");
    assert_eq!(key, identity.public_key());

    if let Ok(other) = PersonIdentifier::new("facebook.com", input.user_id)
        && other != claimed
    {
        assert!(ProofVerifier::verify(&text, &other).is_err());
    }
});
