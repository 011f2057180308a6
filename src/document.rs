//! Cached document payloads.
//!
//! Callers may name a document with or without its `.md` extension; both forms
//! share one cache entry. The content source is always asked for the `.md`
//! path.

use crate::cache::{CacheStats, TtlCache};
use crate::coalesce::Coalescer;
use crate::error::{DocumentLoadError, TransportError};
use crate::events::{BrowserEvent, EventBus};
use crate::path;
use crate::source::ContentSource;
use crate::sync::lock;
use crate::types::DocumentPayload;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

const KEY_PREFIX: &str = "document:";

/// A shared, immutable document.
pub type Document = Arc<DocumentPayload>;

/// Cache key for a normalized path: prefix plus the path without `.md`.
fn cache_key(normalized: &str) -> String {
    format!("{}{}", KEY_PREFIX, path::strip_markdown_extension(normalized))
}

pub struct DocumentStore {
    source: Arc<dyn ContentSource>,
    cache: Arc<Mutex<TtlCache<String, Document>>>,
    in_flight: Coalescer<String, Document, TransportError>,
    ttl: Duration,
    events: EventBus,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("cache", &*lock(&self.cache))
            .field("in_flight", &self.in_flight)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
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

    /// Fetch a document, from cache unless `force_refresh` is set.
    ///
    /// Concurrent requests for the same document share one fetch. The error
    /// keeps the transport status, so a 404 can be told apart from an outage.
    pub async fn get_document(
        &self,
        doc_path: &str,
        force_refresh: bool,
    ) -> Result<Document, DocumentLoadError> {
        let normalized = path::validate_document(doc_path)
            .map_err(|e| DocumentLoadError::from_path(doc_path, e))?;
        let key = cache_key(normalized);

        if !force_refresh && let Some(document) = lock(&self.cache).get(&key) {
            tracing::debug!("Cache hit for document '{}'", normalized);
            return Ok(document);
        }

        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);
        let events = self.events.clone();
        let ttl = self.ttl;
        let fetch_path = path::with_markdown_extension(normalized);
        let store_key = key.clone();

        self.in_flight
            .run(key, move || async move {
                tracing::debug!("Fetching document '{}'", fetch_path);
                let document = Arc::new(source.fetch_document(&fetch_path).await?);
                lock(&cache).set(store_key, Arc::clone(&document), ttl);

                events.publish(BrowserEvent::DocumentLoaded {
                    path: fetch_path,
                    tags: document.metadata.tags.clone(),
                    headings: document.headings.clone(),
                });
                Ok::<_, TransportError>(document)
            })
            .await
            .map_err(|e| {
                tracing::warn!("Failed to load document '{}': {}", normalized, e);
                DocumentLoadError::from_transport(normalized, e)
            })
    }

    /// Tags of a document.
    ///
    /// Served from a cached document when one is live; otherwise only the tags
    /// are requested from the source, and nothing is cached.
    pub async fn get_tags(&self, doc_path: &str) -> Result<Vec<String>, DocumentLoadError> {
        let normalized = path::validate_document(doc_path)
            .map_err(|e| DocumentLoadError::from_path(doc_path, e))?;

        if let Some(document) = lock(&self.cache).get(&cache_key(normalized)) {
            return Ok(document.metadata.tags.clone());
        }

        self.source
            .fetch_document_tags(&path::with_markdown_extension(normalized))
            .await
            .map_err(|e| DocumentLoadError::from_transport(normalized, e))
    }

    /// Drop one document, or every document when `doc_path` is `None`.
    pub fn clear_cache(&self, doc_path: Option<&str>) {
        match doc_path {
            Some(doc_path) => {
                if let Ok(normalized) = path::validate_document(doc_path) {
                    lock(&self.cache).delete(&cache_key(normalized));
                }
            }
            None => {
                lock(&self.cache).retain(|key| !key.starts_with(KEY_PREFIX));
            }
        }

        self.events.publish(BrowserEvent::CacheCleared {
            component: "document",
            path: doc_path.map(|p| path::normalize(p).to_string()),
        });
    }

    /// Whether the document is cached and live.
    pub fn is_cached(&self, doc_path: &str) -> bool {
        path::validate_document(doc_path)
            .is_ok_and(|normalized| lock(&self.cache).has(&cache_key(normalized)))
    }

    /// Drop expired documents. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        lock(&self.cache).purge_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.cache).stats()
    }
}
