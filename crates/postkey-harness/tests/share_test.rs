//! Publishing envelopes and expanding their recipient lists.

use postkey_core::{DirectoryStore, Error, PersonIdentifier, PostIdentifier, PostLocator};
use postkey_crypto::ContentKey;
use postkey_harness::{Fixture, Persona};
use postkey_proto::{Envelope, EnvelopeError, VersionTag};
use proptest::prelude::*;

struct World {
    fx: Fixture,
    alice: Persona,
    bob: Persona,
    carol: Persona,
    dave: Persona,
}

/// Alice is the local author; Bob, Carol and Dave publish bio proofs.
fn world() -> World {
    let fx = Fixture::new();
    let alice = Persona::on("facebook.com", "alice", 1).unwrap();
    let bob = Persona::on("facebook.com", "bob", 2).unwrap();
    let carol = Persona::on("facebook.com", "carol", 3).unwrap();
    let dave = Persona::on("facebook.com", "dave", 4).unwrap();

    fx.add_local(&alice).unwrap();
    for reader in [&bob, &carol, &dave] {
        fx.publish_bio_proof(reader).unwrap();
    }

    World { fx, alice, bob, carol, dave }
}

fn locator(version: VersionTag, author: &Persona) -> PostLocator {
    let post = PostIdentifier::new(author.identifier().clone(), "42").unwrap();
    PostLocator::for_version(version, post, author.identifier().clone())
}

fn unwraps(envelope: &Envelope, persona: &Persona, key: &ContentKey) -> bool {
    postkey_proto::unwrap(envelope, persona.identity()).is_ok_and(|k| &k == key)
}

#[tokio::test]
async fn manifest_scenario_add_third_reader() {
    let World { fx, alice, bob, carol, dave } = world();
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);

    let shared = fx
        .expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();

    let expanded = fx
        .expander
        .expand(&shared, &at, &[carol.identifier().clone()], alice.identifier())
        .await
        .unwrap();

    for reader in [&alice, &bob, &carol] {
        assert!(unwraps(&expanded, reader, &key), "{} should unwrap", reader.identifier());
    }
    assert!(matches!(
        postkey_proto::unwrap(&expanded, dave.identity()),
        Err(EnvelopeError::AccessDenied)
    ));

    let before = shared.recipients().unwrap();
    assert_eq!(&expanded.recipients().unwrap()[..before.len()], before);
    assert_eq!(fx.network.stored_envelope(&at), Some(expanded));
}

#[tokio::test]
async fn combined_versions_keep_previous_readers() {
    for version in [VersionTag::V40, VersionTag::V39] {
        let World { fx, alice, bob, carol, dave } = world();
        let key = fx.content_key();
        let at = locator(version, &alice);

        let shared = fx
            .expander
            .share(version, &key, &at, &[bob.identifier().clone()], alice.identifier())
            .await
            .unwrap();
        let expanded = fx
            .expander
            .expand(&shared, &at, &[carol.identifier().clone()], alice.identifier())
            .await
            .unwrap();

        assert_eq!(expanded.version(), version);
        assert_eq!(expanded.iv(), shared.iv());
        assert!(expanded.recipients().is_none());
        for reader in [&alice, &bob, &carol] {
            assert!(unwraps(&expanded, reader, &key), "{version}: {}", reader.identifier());
        }
        assert!(!unwraps(&expanded, &dave, &key));
    }
}

#[tokio::test]
async fn legacy_version_lives_at_legacy_locator() {
    let World { fx, alice, bob, .. } = world();
    let key = fx.content_key();
    let at = locator(VersionTag::V40, &alice);

    assert!(at.is_legacy());
    fx.expander
        .share(VersionTag::V40, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();

    assert!(fx.network.stored(&at).is_some());
}

#[tokio::test]
async fn unknown_recipient_aborts_without_publishing() {
    let World { fx, alice, bob, carol, .. } = world();
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);
    let stranger = PersonIdentifier::new("facebook.com", "stranger").unwrap();

    let shared = fx
        .expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();
    let stored = fx.network.stored(&at).unwrap();
    let publishes = fx.network.publish_count();

    let result = fx
        .expander
        .expand(&shared, &at, &[carol.identifier().clone(), stranger], alice.identifier())
        .await;

    assert!(matches!(result, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.network.stored(&at).unwrap(), stored, "stored bytes must be untouched");
    assert_eq!(fx.network.publish_count(), publishes);
}

#[tokio::test]
async fn share_with_unknown_recipient_publishes_nothing() {
    let World { fx, alice, bob, .. } = world();
    let key = fx.content_key();
    let at = locator(VersionTag::V39, &alice);
    let stranger = PersonIdentifier::new("facebook.com", "stranger").unwrap();

    let recipients = [bob.identifier().clone(), stranger];

    let result =
        fx.expander.share(VersionTag::V39, &key, &at, &recipients, alice.identifier()).await;

    assert!(matches!(result, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.network.stored(&at), None);
}

#[tokio::test]
async fn requester_without_private_key_is_denied() {
    let World { fx, alice, bob, carol, .. } = world();
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);

    let shared = fx
        .expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();

    let result = fx
        .expander
        .expand(&shared, &at, &[carol.identifier().clone()], bob.identifier())
        .await;

    assert!(matches!(result, Err(Error::AccessDenied)));
}

#[tokio::test]
async fn requester_outside_the_envelope_is_denied() {
    let World { fx, alice, bob, carol, dave } = world();
    fx.keys.insert(dave.identifier().clone(), dave.identity().clone());
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);

    let shared = fx
        .expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();

    let result = fx
        .expander
        .expand(&shared, &at, &[carol.identifier().clone()], dave.identifier())
        .await;

    assert!(matches!(result, Err(Error::AccessDenied)));
}

#[tokio::test]
async fn manifest_reader_may_add_readers() {
    let World { fx, alice, bob, carol, .. } = world();
    fx.keys.insert(bob.identifier().clone(), bob.identity().clone());
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);

    let shared = fx
        .expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();
    let expanded = fx
        .expander
        .expand(&shared, &at, &[carol.identifier().clone()], bob.identifier())
        .await
        .unwrap();

    assert!(unwraps(&expanded, &carol, &key));
}

#[tokio::test]
async fn combined_reader_cannot_add_readers() {
    let World { fx, alice, bob, carol, .. } = world();
    fx.keys.insert(bob.identifier().clone(), bob.identity().clone());
    let key = fx.content_key();
    let at = locator(VersionTag::V39, &alice);

    let shared = fx
        .expander
        .share(VersionTag::V39, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();
    let stored = fx.network.stored(&at).unwrap();

    let result = fx
        .expander
        .expand(&shared, &at, &[carol.identifier().clone()], bob.identifier())
        .await;

    assert!(matches!(result, Err(Error::AccessDenied)));
    assert_eq!(fx.network.stored(&at).unwrap(), stored);
}

#[tokio::test]
async fn version_and_locator_must_agree() {
    let World { fx, alice, bob, .. } = world();
    let key = fx.content_key();
    let recipients = [bob.identifier().clone()];

    let current = locator(VersionTag::V39, &alice);
    let legacy = locator(VersionTag::V40, &alice);

    let v40_at_current = fx
        .expander
        .share(VersionTag::V40, &key, &current, &recipients, alice.identifier())
        .await;
    let v38_at_legacy =
        fx.expander.share(VersionTag::V38, &key, &legacy, &recipients, alice.identifier()).await;

    assert!(matches!(v40_at_current, Err(Error::LocatorMismatch { version: -40, .. })));
    assert!(matches!(v38_at_legacy, Err(Error::LocatorMismatch { version: -38, .. })));
    assert_eq!(fx.network.publish_count(), 0);
}

#[tokio::test]
async fn requester_and_duplicates_are_not_added_twice() {
    let World { fx, alice, bob, carol, .. } = world();
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);

    let shared = fx
        .expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();
    let expanded = fx
        .expander
        .expand(
            &shared,
            &at,
            &[
                alice.identifier().clone(),
                bob.identifier().clone(),
                carol.identifier().clone(),
                carol.identifier().clone(),
            ],
            alice.identifier(),
        )
        .await
        .unwrap();

    assert_eq!(expanded.recipients().unwrap().len(), 3);
}

#[tokio::test]
async fn concurrent_expansions_both_land() {
    let World { fx, alice, bob, carol, dave } = world();
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);

    let shared = fx
        .expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();

    let add_carol = [carol.identifier().clone()];
    let add_dave = [dave.identifier().clone()];
    let (first, second) = tokio::join!(
        fx.expander.expand(&shared, &at, &add_carol, alice.identifier()),
        fx.expander.expand(&shared, &at, &add_dave, alice.identifier()),
    );
    first.unwrap();
    second.unwrap();

    let published = fx.network.stored_envelope(&at).unwrap();
    for reader in [&alice, &bob, &carol, &dave] {
        assert!(unwraps(&published, reader, &key), "{} was lost", reader.identifier());
    }
}

#[tokio::test]
async fn recipients_are_recorded_in_directory() {
    let World { fx, alice, bob, .. } = world();
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);

    fx.expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await
        .unwrap();

    let record = fx.directory.get(bob.identifier()).unwrap().unwrap();
    assert_eq!(record.public_key, Some(bob.public_key()));
    assert!(!record.is_local);
}

#[tokio::test]
async fn publish_failure_is_reported() {
    let World { fx, alice, bob, .. } = world();
    fx.network.set_fail_publish(true);
    let key = fx.content_key();
    let at = locator(VersionTag::V38, &alice);

    let result = fx
        .expander
        .share(VersionTag::V38, &key, &at, &[bob.identifier().clone()], alice.identifier())
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(err.is_transient());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_shared_envelope_opens_for_every_reader(
        version in prop::sample::select(VersionTag::ALL.to_vec()),
        readers in 0usize..4,
        seed in any::<u64>(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let fx = Fixture::with_config(Default::default(), seed);
            let author = Persona::on("facebook.com", "author", seed).unwrap();
            fx.add_local(&author).unwrap();

            let people: Vec<Persona> = (0..readers)
                .map(|i| {
                    let user_id = format!("reader{i}");
                    let reader_seed = seed ^ (i as u64 + 1);
                    let reader = Persona::on("facebook.com", &user_id, reader_seed).unwrap();
                    fx.publish_bio_proof(&reader).unwrap();
                    reader
                })
                .collect();
            let identifiers: Vec<_> = people.iter().map(|p| p.identifier().clone()).collect();

            let key = fx.content_key();
            let at = locator(version, &author);
            let envelope = fx
                .expander
                .share(version, &key, &at, &identifiers, author.identifier())
                .await
                .unwrap();

            prop_assert!(unwraps(&envelope, &author, &key));
            for reader in &people {
                prop_assert!(unwraps(&envelope, reader, &key));
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
