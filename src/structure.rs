//! Lazily loaded directory tree.
//!
//! Each directory listing is fetched once, cached for a TTL and shared between
//! concurrent callers. Refreshed listings replace the cached `Arc` wholesale;
//! callers holding the previous listing keep an unchanged snapshot.

use crate::cache::{CacheStats, TtlCache};
use crate::coalesce::Coalescer;
use crate::error::{DirectoryLoadError, TransportError};
use crate::events::{BrowserEvent, EventBus};
use crate::path;
use crate::source::ContentSource;
use crate::sync::lock;
use crate::types::ContentItem;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;

const KEY_PREFIX: &str = "structure:";

/// A shared, immutable directory listing.
pub type Listing = Arc<Vec<ContentItem>>;

/// Load progress of one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

fn cache_key(normalized: &str) -> String {
    format!("{}{}", KEY_PREFIX, normalized)
}

pub struct StructureStore {
    source: Arc<dyn ContentSource>,
    cache: Arc<Mutex<TtlCache<String, Listing>>>,
    in_flight: Coalescer<String, Listing, TransportError>,
    ttl: Duration,
    events: EventBus,
}

impl std::fmt::Debug for StructureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructureStore")
            .field("cache", &*lock(&self.cache))
            .field("in_flight", &self.in_flight)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl StructureStore {
    pub fn new(
        source: Arc<dyn ContentSource>,
        max_size: usize,
        ttl: Duration,
        events: EventBus,
    ) -> Self {
        Self {
            source,
            cache: Arc::new(Mutex::new(TtlCache::new(max_size, ttl))),
            in_flight: Coalescer::new(),
            ttl,
            events,
        }
    }

    /// List a directory, from cache unless `skip_cache` is set.
    ///
    /// A cache hit returns without suspending. A miss joins or starts the
    /// single in-flight fetch for this directory.
    pub async fn get_directory(
        &self,
        dir: &str,
        skip_cache: bool,
    ) -> Result<Listing, DirectoryLoadError> {
        let normalized = path::validate(dir).map_err(|e| DirectoryLoadError {
            path: dir.to_string(),
            source: e.into(),
        })?;
        let key = cache_key(normalized);

        if !skip_cache && let Some(listing) = lock(&self.cache).get(&key) {
            tracing::debug!("Cache hit for directory '{}'", normalized);
            return Ok(listing);
        }

        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;
        let fetch_path = normalized.to_string();
        let store_key = key.clone();

        self.in_flight
            .run(key, move || async move {
                tracing::debug!("Fetching directory '{}'", fetch_path);
                let listing = Arc::new(source.fetch_directory(&fetch_path).await?);
                lock(&cache).set(store_key, Arc::clone(&listing), ttl);
                Ok::<_, TransportError>(listing)
            })
            .await
            .map_err(|e| {
                tracing::warn!("Failed to load directory '{}': {}", normalized, e);
                DirectoryLoadError {
                    path: normalized.to_string(),
                    source: e.into(),
                }
            })
    }

    /// Return a copy of `item` with its children loaded.
    ///
    /// Files are returned unchanged. The original item is never mutated.
    pub async fn expand(&self, item: &ContentItem) -> Result<ContentItem, DirectoryLoadError> {
        if !item.is_directory {
            return Ok(item.clone());
        }

        let listing = self.get_directory(&item.path, false).await?;
        Ok(ContentItem {
            children: Some(listing.as_ref().clone()),
            ..item.clone()
        })
    }

    /// Warm the cache for `dir` in the background. Failures are logged.
    pub fn preload(self: &Arc<Self>, dir: &str) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let dir = dir.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.get_directory(&dir, false).await {
                tracing::debug!("Preload of '{}' failed: {}", dir, e);
            }
        })
    }

    /// Drop one directory's listing, or every listing when `dir` is `None`.
    ///
    /// In-flight fetches are not cancelled and will repopulate the cache.
    pub fn clear_cache(&self, dir: Option<&str>) {
        match dir {
            Some(dir) => {
                if let Ok(normalized) = path::validate(dir) {
                    lock(&self.cache).delete(&cache_key(normalized));
                }
            }
            None => {
                lock(&self.cache).retain(|key| !key.starts_with(KEY_PREFIX));
            }
        }

        self.events.publish(BrowserEvent::CacheCleared {
            component: "structure",
            path: dir.map(|d| path::normalize(d).to_string()),
        });
    }

    /// Whether `dir` is cached, being fetched, or neither.
    pub fn load_state(&self, dir: &str) -> LoadState {
        let Ok(normalized) = path::validate(dir) else {
            return LoadState::NotLoaded;
        };
        let key = cache_key(normalized);

        if lock(&self.cache).has(&key) {
            LoadState::Loaded
        } else if self.in_flight.is_pending(&key) {
            LoadState::Loading
        } else {
            LoadState::NotLoaded
        }
    }

    /// Drop expired listings. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        lock(&self.cache).purge_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.cache).stats()
    }
}
