//! In-memory social network serving profiles and posts.
//!
//! Every fetch yields to the scheduler once before answering, so concurrent
//! discovery tasks genuinely interleave on a single-threaded runtime.

#![allow(clippy::disallowed_types, reason = "Lock is never held across an await")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use postkey_core::{
    Error, PersonIdentifier, PostFetcher, PostIdentifier, Profile, ProfileFetcher, Result,
};

/// Fake network implementing [`ProfileFetcher`] and [`PostFetcher`].
///
/// Clones share state. Counters record every fetch attempt, including ones
/// made while offline.
#[derive(Debug, Clone, Default)]
pub struct FakeSocialNetwork {
    inner: Arc<Mutex<SocialInner>>,
}

#[derive(Debug, Default)]
struct SocialInner {
    bios: HashMap<PersonIdentifier, String>,
    posts: HashMap<PostIdentifier, String>,
    profile_fetches: HashMap<PersonIdentifier, usize>,
    post_fetches: HashMap<PersonIdentifier, usize>,
    offline: bool,
}

impl FakeSocialNetwork {
    /// Network with no profiles and no posts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile biography of `identifier`.
    pub fn set_bio(&self, identifier: &PersonIdentifier, bio: impl Into<String>) {
        self.lock().bios.insert(identifier.clone(), bio.into());
    }

    /// Publish `content` as `post`.
    pub fn publish_post(&self, post: &PostIdentifier, content: impl Into<String>) {
        self.lock().posts.insert(post.clone(), content.into());
    }

    /// Fail every fetch with a network error while `offline` is set.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Profile fetches made for `identifier`.
    pub fn profile_fetches(&self, identifier: &PersonIdentifier) -> usize {
        self.lock().profile_fetches.get(identifier).copied().unwrap_or(0)
    }

    /// Post fetches made for posts authored by `identifier`.
    pub fn post_fetches(&self, identifier: &PersonIdentifier) -> usize {
        self.lock().post_fetches.get(identifier).copied().unwrap_or(0)
    }

    /// Fetches of any kind, for anyone.
    pub fn total_fetches(&self) -> usize {
        let inner = self.lock();
        inner.profile_fetches.values().sum::<usize>() + inner.post_fetches.values().sum::<usize>()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SocialInner> {
        self.inner.lock().expect("FakeSocialNetwork mutex poisoned")
    }
}

#[async_trait]
impl ProfileFetcher for FakeSocialNetwork {
    async fn fetch_profile(&self, identifier: &PersonIdentifier) -> Result<Profile> {
        *self.lock().profile_fetches.entry(identifier.clone()).or_default() += 1;
        tokio::task::yield_now().await;

        let inner = self.lock();
        if inner.offline {
            return Err(Error::Network(format!("offline fetching profile of {identifier}")));
        }
        inner
            .bios
            .get(identifier)
            .map(|bio| Profile { bio: bio.clone() })
            .ok_or_else(|| Error::NotFound(format!("profile of {identifier}")))
    }
}

#[async_trait]
impl PostFetcher for FakeSocialNetwork {
    async fn fetch_post_content(&self, post: &PostIdentifier) -> Result<String> {
        *self.lock().post_fetches.entry(post.author().clone()).or_default() += 1;
        tokio::task::yield_now().await;

        let inner = self.lock();
        if inner.offline {
            return Err(Error::Network(format!("offline fetching {post}")));
        }
        inner.posts.get(post).cloned().ok_or_else(|| Error::NotFound(post.to_string()))
    }
}
