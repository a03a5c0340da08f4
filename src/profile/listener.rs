//! Live profile loading for the edit screen.
//!
//! The document store listener typically fires twice: once from its local
//! cache (provisional) and once with server data (authoritative). A
//! provisional "does not exist" is not trusted; only the authoritative
//! snapshot may report the profile missing.
//!
//! Photos follow the same two-stage pattern: the locally cached JPEG is
//! shown immediately on first load, then replaced by the stored object,
//! which is written back to the cache.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};

use super::types::ProfileDocument;
use crate::backend::{AuthUser, Backend, DocumentSnapshot};
use crate::cache::ImageCache;
use crate::config::CoreConfig;
use crate::observer::Subscription;

/// Where a photo came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSource {
    /// Local image cache.
    Cache,
    /// Object storage.
    Remote,
}

/// Update delivered to the edit screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    /// Profile data arrived.
    Loaded {
        /// Document contents.
        profile: ProfileDocument,
        /// True if served from the local cache and not yet confirmed.
        provisional: bool,
    },
    /// The server confirmed there is no profile.
    Missing,
    /// Photo bytes arrived.
    Photo {
        /// JPEG bytes.
        jpeg: Vec<u8>,
        /// Origin of the bytes.
        source: PhotoSource,
    },
    /// The listener failed and stopped.
    Failed(String),
}

/// Subscribes to a user's profile document.
#[derive(Debug, Clone)]
pub struct ProfileListener {
    backend: Backend,
    config: Arc<CoreConfig>,
    cache: ImageCache,
}

impl ProfileListener {
    /// Creates a listener factory.
    #[must_use]
    pub const fn new(backend: Backend, config: Arc<CoreConfig>, cache: ImageCache) -> Self {
        Self {
            backend,
            config,
            cache,
        }
    }

    /// Streams [`ProfileEvent`]s for `user` to `callback` until the returned
    /// subscription is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen(
        &self,
        user: &AuthUser,
        callback: impl Fn(&ProfileEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let key = self.config.profile_key.for_user(user);
        let mut snapshots = self
            .backend
            .documents
            .listen(&self.config.users_collection, &key);
        let this = self.clone();
        let user = user.clone();

        let task = tokio::spawn(async move {
            let mut cached_photo_shown = false;
            while let Some(next) = snapshots.next().await {
                match next {
                    Ok(snapshot) => {
                        this.handle(&user, snapshot, &mut cached_photo_shown, &callback)
                            .await;
                    }
                    Err(err) => {
                        warn!(error = %err, uid = %user.uid, "Profile listener failed");
                        callback(&ProfileEvent::Failed(err.message().to_string()));
                        return;
                    }
                }
            }
        });
        Subscription::from_task(task)
    }

    async fn handle(
        &self,
        user: &AuthUser,
        snapshot: DocumentSnapshot,
        cached_photo_shown: &mut bool,
        callback: &(impl Fn(&ProfileEvent) + Send + Sync),
    ) {
        let provisional = snapshot.from_cache;
        let Some(profile) = snapshot.profile.filter(|p| !p.is_empty()) else {
            if provisional {
                debug!(uid = %user.uid, "Ignoring provisional empty snapshot");
            } else {
                callback(&ProfileEvent::Missing);
            }
            return;
        };

        let url = profile.profile_url.clone();
        callback(&ProfileEvent::Loaded {
            profile,
            provisional,
        });

        if !*cached_photo_shown {
            *cached_photo_shown = true;
            match self.cache.load(&user.uid) {
                Ok(Some(jpeg)) => callback(&ProfileEvent::Photo {
                    jpeg,
                    source: PhotoSource::Cache,
                }),
                Ok(None) => {}
                Err(err) => debug!(error = %err, "Cached profile photo unreadable"),
            }
        }

        if url.is_empty() {
            return;
        }
        match self
            .backend
            .objects
            .fetch(&url, self.config.photo_max_download_bytes)
            .await
        {
            Ok(jpeg) => {
                self.cache.store_best_effort(&user.uid, &jpeg);
                callback(&ProfileEvent::Photo {
                    jpeg,
                    source: PhotoSource::Remote,
                });
            }
            Err(err) => warn!(error = %err, uid = %user.uid, "Failed to fetch profile photo"),
        }
    }
}
