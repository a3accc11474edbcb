//! Key discovery against the simulated social network.
//!
//! Covers the coordinator's caching contract: directory hits stay offline,
//! concurrent lookups share one attempt, and failures are suppressed for the
//! negative TTL and retried afterwards.

use std::time::Duration;

use futures::future;
use postkey_core::{DirectoryStore, DiscoveryConfig, Error, PersonIdentifier, PersonRecord};
use postkey_harness::{Fixture, Persona};

fn persona(user_id: &str, seed: u64) -> Persona {
    Persona::on("facebook.com", user_id, seed).unwrap()
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn directory_hit_issues_no_fetches() {
    let fx = Fixture::new();
    let alice = persona("alice", 1);
    fx.add_local(&alice).unwrap();

    let record = fx.coordinator.resolve_public_key(alice.identifier()).await.unwrap();

    assert_eq!(record.public_key, Some(alice.public_key()));
    assert!(record.is_local);
    assert_eq!(fx.social.total_fetches(), 0);
}

#[tokio::test]
async fn discovered_key_is_served_from_directory_afterwards() {
    let fx = Fixture::new();
    let bob = persona("bob", 2);
    fx.publish_bio_proof(&bob).unwrap();

    let first = fx.coordinator.resolve_public_key(bob.identifier()).await.unwrap();
    settle().await;
    let fetches = fx.social.total_fetches();

    let second = fx.coordinator.resolve_public_key(bob.identifier()).await.unwrap();

    assert_eq!(first.public_key, Some(bob.public_key()));
    assert_eq!(second.public_key, first.public_key);
    assert_eq!(fx.social.total_fetches(), fetches, "second lookup must stay offline");
}

#[tokio::test]
async fn concurrent_lookups_share_one_attempt() {
    let fx = Fixture::new();
    let bob = persona("bob", 2);
    fx.publish_bio_proof(&bob).unwrap();
    fx.publish_prove_post(&bob, "100").unwrap();

    let lookups = (0..8).map(|_| fx.coordinator.resolve_public_key(bob.identifier()));
    let results = future::join_all(lookups).await;
    settle().await;

    for result in results {
        assert_eq!(result.unwrap().public_key, Some(bob.public_key()));
    }
    assert_eq!(fx.social.profile_fetches(bob.identifier()), 1);
    assert_eq!(fx.social.post_fetches(bob.identifier()), 1);
    assert_eq!(fx.coordinator.pending_len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_share_one_attempt_across_threads() {
    let fx = Fixture::new();
    let bob = persona("bob", 2);
    fx.publish_bio_proof(&bob).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = fx.coordinator.clone();
            let identifier = bob.identifier().clone();
            tokio::spawn(async move { coordinator.resolve_public_key(&identifier).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().public_key, Some(bob.public_key()));
    }
    assert_eq!(fx.social.profile_fetches(bob.identifier()), 1);
}

#[tokio::test]
async fn failure_is_suppressed_for_the_negative_ttl() {
    let fx = Fixture::new();
    let carol = persona("carol", 3);

    let first = fx.coordinator.resolve_public_key(carol.identifier()).await;
    assert!(matches!(first, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.social.profile_fetches(carol.identifier()), 1);
    assert_eq!(fx.coordinator.negative_cache_len(), 1);

    // A proof appearing inside the window is not seen yet
    fx.publish_bio_proof(&carol).unwrap();
    fx.env.advance(Duration::from_secs(9));

    let suppressed = fx.coordinator.resolve_public_key(carol.identifier()).await;
    assert!(matches!(suppressed, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.social.profile_fetches(carol.identifier()), 1);

    fx.env.advance(Duration::from_secs(1));

    let retried = fx.coordinator.resolve_public_key(carol.identifier()).await.unwrap();
    assert_eq!(retried.public_key, Some(carol.public_key()));
    assert_eq!(fx.social.profile_fetches(carol.identifier()), 2);
    assert_eq!(fx.coordinator.negative_cache_len(), 0);
}

#[tokio::test]
async fn negative_ttl_is_configurable() {
    let config = DiscoveryConfig { negative_ttl: Duration::from_secs(2), ..Default::default() };
    let fx = Fixture::with_config(config, 7);
    let carol = persona("carol", 3);

    assert!(fx.coordinator.resolve_public_key(carol.identifier()).await.is_err());
    fx.env.advance(Duration::from_secs(2));
    assert!(fx.coordinator.resolve_public_key(carol.identifier()).await.is_err());

    assert_eq!(fx.social.profile_fetches(carol.identifier()), 2);
}

#[tokio::test]
async fn unbounded_negative_ttl_suppresses_until_reset() {
    let config = DiscoveryConfig { negative_ttl: Duration::MAX, ..Default::default() };
    let fx = Fixture::with_config(config, 7);
    let carol = persona("carol", 3);
    fx.env.advance(Duration::from_secs(1));

    let first = fx.coordinator.resolve_public_key(carol.identifier()).await;
    assert!(matches!(first, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.coordinator.pending_len(), 0);
    assert_eq!(fx.coordinator.negative_cache_len(), 1);

    fx.publish_bio_proof(&carol).unwrap();
    fx.env.advance(Duration::from_secs(3600));

    let later = fx.coordinator.resolve_public_key(carol.identifier()).await;
    assert!(matches!(later, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.social.profile_fetches(carol.identifier()), 1);

    fx.coordinator.reset();
    let record = fx.coordinator.resolve_public_key(carol.identifier()).await.unwrap();
    assert_eq!(record.public_key, Some(carol.public_key()));
}

#[tokio::test]
async fn reset_forgets_failures() {
    let fx = Fixture::new();
    let carol = persona("carol", 3);

    assert!(fx.coordinator.resolve_public_key(carol.identifier()).await.is_err());
    fx.publish_bio_proof(&carol).unwrap();
    fx.coordinator.reset();

    let record = fx.coordinator.resolve_public_key(carol.identifier()).await.unwrap();
    assert_eq!(record.public_key, Some(carol.public_key()));
}

#[tokio::test]
async fn concurrent_failed_lookups_leave_one_negative_entry() {
    let fx = Fixture::new();
    let dave = persona("dave", 4);

    let (a, b) = tokio::join!(
        fx.coordinator.resolve_public_key(dave.identifier()),
        fx.coordinator.resolve_public_key(dave.identifier()),
    );

    assert!(matches!(a, Err(Error::KeyNotFound(_))));
    assert!(matches!(b, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.directory.get(dave.identifier()).unwrap(), None);
    assert_eq!(fx.coordinator.negative_cache_len(), 1);
    assert_eq!(fx.coordinator.pending_len(), 0);
}

#[tokio::test]
async fn network_outage_surfaces_as_key_not_found() {
    let fx = Fixture::new();
    let bob = persona("bob", 2);
    fx.publish_bio_proof(&bob).unwrap();
    fx.social.set_offline(true);

    let result = fx.coordinator.resolve_public_key(bob.identifier()).await;

    assert!(matches!(result, Err(Error::KeyNotFound(_))));
}

#[tokio::test]
async fn prove_post_alone_is_enough() {
    let fx = Fixture::new();
    let erin = persona("erin", 5);
    let post = fx.publish_prove_post(&erin, "200").unwrap();

    let record = fx.coordinator.resolve_public_key(erin.identifier()).await.unwrap();

    assert_eq!(record.public_key, Some(erin.public_key()));
    assert_eq!(record.prove_post, Some(post));
}

#[tokio::test]
async fn proof_for_someone_else_is_rejected() {
    let fx = Fixture::new();
    let mallory = persona("mallory", 66);
    let victim = persona("victim", 67);

    // A valid proof for another identifier pasted into the victim's bio
    fx.social.set_bio(victim.identifier(), mallory.proof().unwrap());

    let result = fx.coordinator.resolve_public_key(victim.identifier()).await;

    assert!(matches!(result, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.directory.get(victim.identifier()).unwrap(), None);
}

#[tokio::test]
async fn legacy_prove_post_is_migrated() {
    let fx = Fixture::new();
    let frank = persona("frank", 6);
    let post = fx.publish_legacy_prove_post(&frank, "300").unwrap();

    let record = fx.coordinator.resolve_public_key(frank.identifier()).await.unwrap();

    assert_eq!(record.public_key, Some(frank.public_key()));
    assert_eq!(record.prove_post, Some(post));
    assert_eq!(fx.prove_posts.get(frank.identifier()).as_deref(), Some("300"));
}

#[tokio::test]
async fn failed_migration_still_discovers() {
    let fx = Fixture::new();
    let frank = persona("frank", 6);
    fx.publish_legacy_prove_post(&frank, "300").unwrap();
    fx.prove_posts.set_read_only(true);

    let record = fx.coordinator.resolve_public_key(frank.identifier()).await.unwrap();

    assert_eq!(record.public_key, Some(frank.public_key()));
    assert_eq!(fx.prove_posts.get(frank.identifier()), None);
}

#[tokio::test]
async fn legacy_store_is_only_read_for_the_legacy_network() {
    let fx = Fixture::new();
    let gina = Persona::on("example.social", "gina", 7).unwrap();
    fx.publish_legacy_prove_post(&gina, "400").unwrap();

    let result = fx.coordinator.resolve_public_key(gina.identifier()).await;

    assert!(matches!(result, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.prove_posts.get(gina.identifier()), None);
}

#[tokio::test]
async fn malformed_legacy_reference_is_not_migrated() {
    let fx = Fixture::new();
    let frank = persona("frank", 6);
    fx.legacy_prove_posts.insert(frank.identifier().user_id(), "300/extra");

    let result = fx.coordinator.resolve_public_key(frank.identifier()).await;

    assert!(matches!(result, Err(Error::KeyNotFound(_))));
    assert_eq!(fx.prove_posts.get(frank.identifier()), None);

    // Fixing the legacy entry is enough; nothing bad was copied forward
    fx.coordinator.reset();
    fx.publish_legacy_prove_post(&frank, "300").unwrap();

    let record = fx.coordinator.resolve_public_key(frank.identifier()).await.unwrap();
    assert_eq!(record.public_key, Some(frank.public_key()));
    assert_eq!(fx.prove_posts.get(frank.identifier()).as_deref(), Some("300"));
}

#[tokio::test]
async fn empty_current_reference_falls_back_to_legacy() {
    let fx = Fixture::new();
    let frank = persona("frank", 6);
    fx.publish_legacy_prove_post(&frank, "300").unwrap();
    fx.prove_posts.insert(frank.identifier().clone(), "");

    let record = fx.coordinator.resolve_public_key(frank.identifier()).await.unwrap();

    assert_eq!(record.public_key, Some(frank.public_key()));
    assert_eq!(fx.prove_posts.get(frank.identifier()).as_deref(), Some("300"));
}

#[tokio::test]
async fn second_strategy_with_other_key_never_overwrites() {
    let fx = Fixture::new();
    let identifier = PersonIdentifier::new("facebook.com", "hank").unwrap();
    let old = Persona::new(identifier.clone(), 8);
    let rotated = Persona::new(identifier.clone(), 9);
    fx.publish_bio_proof(&old).unwrap();
    fx.publish_prove_post(&rotated, "500").unwrap();

    let record = fx.coordinator.resolve_public_key(&identifier).await.unwrap();
    settle().await;

    let winner = record.public_key.unwrap();
    assert!(winner == old.public_key() || winner == rotated.public_key());

    let stored = fx.directory.get(&identifier).unwrap().unwrap();
    assert_eq!(stored.public_key, Some(winner), "first writer wins");
}

#[tokio::test]
async fn directory_refuses_a_different_key_after_discovery() {
    let fx = Fixture::new();
    let identifier = PersonIdentifier::new("facebook.com", "ivy").unwrap();
    let first = Persona::new(identifier.clone(), 10);
    let second = Persona::new(identifier.clone(), 11);
    fx.publish_bio_proof(&first).unwrap();

    let record = fx.coordinator.resolve_public_key(&identifier).await.unwrap();
    assert_eq!(record.public_key, Some(first.public_key()));

    let conflict =
        fx.directory.put(PersonRecord::discovered(identifier.clone(), second.public_key(), None));

    assert!(matches!(conflict, Err(Error::KeyConflict { .. })));
    let stored = fx.directory.get(&identifier).unwrap().unwrap();
    assert_eq!(stored.public_key, Some(first.public_key()));
}
