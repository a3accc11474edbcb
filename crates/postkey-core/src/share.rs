//! Publishing content keys and adding recipients after publication.
//!
//! Both operations are all-or-nothing. Every recipient is resolved and the
//! replacement envelope fully built before anything is published, so a
//! failure leaves the stored envelope exactly as it was.
//!
//! Calls for the same locator are serialized on an async mutex, and each one
//! builds on the envelope currently stored there. Two concurrent expansions
//! therefore both land instead of the second overwriting the first.

#![allow(clippy::disallowed_types, reason = "Lock table is never held across an await")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::future;
use postkey_crypto::{ContentKey, IdentityKeyPair, PublicKey};
use postkey_proto::{Envelope, VersionTag};

use crate::{
    DirectoryStore, Error, KeyDiscoveryCoordinator, LocalKeyStore, NetworkPublisher,
    PersonIdentifier, PostLocator, Result, env::Environment,
};

/// Wraps content keys for recipients and publishes the envelopes.
pub struct ShareTargetExpander<E: Environment, D: DirectoryStore> {
    env: E,
    coordinator: KeyDiscoveryCoordinator<E, D>,
    keys: Arc<dyn LocalKeyStore>,
    network: Arc<dyn NetworkPublisher>,
    locks: Mutex<HashMap<PostLocator, Arc<tokio::sync::Mutex<()>>>>,
}

impl<E: Environment, D: DirectoryStore> ShareTargetExpander<E, D> {
    /// Expander resolving recipients through `coordinator`.
    pub fn new(
        env: E,
        coordinator: KeyDiscoveryCoordinator<E, D>,
        keys: Arc<dyn LocalKeyStore>,
        network: Arc<dyn NetworkPublisher>,
    ) -> Self {
        Self { env, coordinator, keys, network, locks: Mutex::new(HashMap::new()) }
    }

    /// Wrap `content_key` for `author` and `recipients` and publish it.
    ///
    /// # Errors
    ///
    /// - `LocatorMismatch` if `version` does not live at `locator`
    /// - `AccessDenied` if `author` has no local private key
    /// - `KeyNotFound` if any recipient cannot be resolved; nothing is
    ///   published
    /// - `Network` if publishing fails
    pub async fn share(
        &self,
        version: VersionTag,
        content_key: &ContentKey,
        locator: &PostLocator,
        recipients: &[PersonIdentifier],
        author: &PersonIdentifier,
    ) -> Result<Envelope> {
        check_locator(version, locator)?;
        let holder = self.holder(author).await?;
        let keys = self.resolve_all(recipients, author).await?;

        let envelope =
            postkey_proto::wrap(version, content_key, &keys, &holder, &mut self.random())?;

        let lock = self.lock_for(locator);
        let _guard = lock.lock().await;
        self.network.publish(locator, &envelope.encode()?).await?;

        tracing::info!(%locator, %author, %version, recipients = keys.len(), "Published envelope");
        Ok(envelope)
    }

    /// Add `new_recipients` to the envelope published at `locator`.
    ///
    /// Uses the stored envelope when there is one, `envelope` otherwise.
    /// Returns the replacement that was published.
    ///
    /// # Errors
    ///
    /// - `LocatorMismatch` if the envelope's version does not live at
    ///   `locator`
    /// - `AccessDenied` if `requester` has no local key or cannot unwrap
    /// - `KeyNotFound` if any new recipient cannot be resolved; nothing is
    ///   published
    /// - `VersionUnsupported` if the stored envelope has an unknown tag
    /// - `Network` if fetching or publishing fails
    pub async fn expand(
        &self,
        envelope: &Envelope,
        locator: &PostLocator,
        new_recipients: &[PersonIdentifier],
        requester: &PersonIdentifier,
    ) -> Result<Envelope> {
        check_locator(envelope.version(), locator)?;

        let lock = self.lock_for(locator);
        let _guard = lock.lock().await;

        let current = match self.network.fetch(locator).await? {
            Some(bytes) => Envelope::decode(&bytes)?,
            None => envelope.clone(),
        };
        check_locator(current.version(), locator)?;

        let holder = self.holder(requester).await?;
        postkey_proto::unwrap(&current, &holder)?;

        let keys = self.resolve_all(new_recipients, requester).await?;

        let replacement = postkey_proto::extend(&current, &holder, &keys, &mut self.random())?;

        self.network.publish(locator, &replacement.encode()?).await?;

        tracing::info!(
            %locator,
            %requester,
            version = %replacement.version(),
            added = keys.len(),
            "Expanded envelope"
        );
        Ok(replacement)
    }

    async fn holder(&self, identifier: &PersonIdentifier) -> Result<IdentityKeyPair> {
        self.keys.private_key_for(identifier).await?.ok_or(Error::AccessDenied)
    }

    /// Resolve every identifier except `exclude`, or fail as a whole.
    async fn resolve_all(
        &self,
        identifiers: &[PersonIdentifier],
        exclude: &PersonIdentifier,
    ) -> Result<Vec<PublicKey>> {
        let mut wanted: Vec<&PersonIdentifier> = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            if identifier != exclude && !wanted.contains(&identifier) {
                wanted.push(identifier);
            }
        }

        let resolved = future::join_all(
            wanted.iter().map(|identifier| self.coordinator.resolve_public_key(identifier)),
        )
        .await;

        let mut keys = Vec::with_capacity(resolved.len());
        for (identifier, result) in wanted.iter().zip(resolved) {
            match result {
                Ok(record) => {
                    let key = record
                        .public_key
                        .ok_or_else(|| Error::KeyNotFound(identifier.to_string()))?;
                    keys.push(key);
                },
                Err(e @ Error::KeyConflict { .. }) => return Err(e),
                Err(e) => {
                    tracing::debug!(%identifier, error = %e, "Recipient unresolved, aborting");
                    return Err(Error::KeyNotFound(identifier.to_string()));
                },
            }
        }

        Ok(keys)
    }

    fn random(&self) -> impl FnMut(&mut [u8]) + '_ {
        |buf: &mut [u8]| self.env.random_bytes(buf)
    }

    fn lock_for(&self, locator: &PostLocator) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("ShareTargetExpander lock table poisoned");
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(locator.clone()).or_default())
    }
}

fn check_locator(version: VersionTag, locator: &PostLocator) -> Result<()> {
    if locator.accepts(version) {
        Ok(())
    } else {
        Err(Error::LocatorMismatch { version: version.wire(), locator: locator.to_string() })
    }
}
