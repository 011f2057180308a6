//! Related-document ranking.
//!
//! Candidates are the Markdown files next to the target and, below the root,
//! the files one directory up. Each is scored by proximity plus a bonus per
//! tag it shares with the target.

use crate::cache::{CacheStats, TtlCache};
use crate::document::DocumentStore;
use crate::error::RelatedError;
use crate::events::{BrowserEvent, EventBus};
use crate::path;
use crate::search::scoring::{PARENT_WEIGHT, SIBLING_WEIGHT, common_tags, relatedness};
use crate::structure::StructureStore;
use crate::sync::lock;
use crate::types::{ContentItem, RelatedDocument};
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

/// Default number of related documents returned.
pub const DEFAULT_LIMIT: usize = 5;
/// Default capacity of the related-documents cache.
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// Full ranking for one target, shared between cache and callers.
type Ranking = Arc<Vec<RelatedDocument>>;

struct Candidate {
    item: ContentItem,
    weight: u32,
}

pub struct RelatednessEngine {
    structure: Arc<StructureStore>,
    documents: Arc<DocumentStore>,
    cache: Mutex<TtlCache<String, Ranking>>,
    default_limit: usize,
    events: EventBus,
}

impl std::fmt::Debug for RelatednessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelatednessEngine")
            .field("cache", &*lock(&self.cache))
            .field("default_limit", &self.default_limit)
            .finish_non_exhaustive()
    }
}

impl RelatednessEngine {
    pub fn new(
        structure: Arc<StructureStore>,
        documents: Arc<DocumentStore>,
        cache_size: usize,
        ttl: Duration,
        default_limit: usize,
        events: EventBus,
    ) -> Self {
        Self {
            structure,
            documents,
            cache: Mutex::new(TtlCache::new(cache_size, ttl).with_overflow_sweep()),
            default_limit,
            events,
        }
    }

    /// Documents related to `document_path`, best first.
    ///
    /// `limit` defaults to the configured related limit. Candidates whose
    /// metadata cannot be loaded are skipped, as is an unreadable parent
    /// directory; an empty list is a valid answer.
    pub async fn get_related(
        &self,
        document_path: &str,
        limit: Option<usize>,
        skip_cache: bool,
    ) -> Result<Vec<RelatedDocument>, RelatedError> {
        if document_path.trim().is_empty() {
            return Err(RelatedError::MissingPath);
        }
        let normalized = path::validate_document(document_path)?;
        let identity = document_identity(normalized);
        let target = path::with_markdown_extension(normalized);
        let limit = limit.unwrap_or(self.default_limit);

        if !skip_cache && let Some(ranking) = lock(&self.cache).get(&identity) {
            tracing::debug!("Cache hit for related documents of '{}'", target);
            return Ok(truncated(&ranking, limit));
        }

        let document = self.documents.get_document(&target, false).await.map_err(|e| {
            if e.is_not_found() {
                RelatedError::NotFound {
                    path: target.clone(),
                }
            } else {
                RelatedError::Document(e)
            }
        })?;

        let candidates = self.candidates(&target, &identity).await?;
        let ranking = Arc::new(self.rank(candidates, &document.metadata.tags).await);
        tracing::debug!(
            "Ranked {} related documents for '{}'",
            ranking.len(),
            target
        );

        lock(&self.cache).insert(identity, Arc::clone(&ranking));
        Ok(truncated(&ranking, limit))
    }

    /// Siblings first, then parent-directory files, target excluded.
    async fn candidates(&self, target: &str, identity: &str) -> Result<Vec<Candidate>, RelatedError> {
        let dir = path::parent(target);
        let mut candidates: Vec<Candidate> = self
            .structure
            .get_directory(dir, false)
            .await?
            .iter()
            .filter(|item| {
                item.is_markdown() && document_identity(path::normalize(&item.path)) != identity
            })
            .map(|item| Candidate {
                item: item.clone(),
                weight: SIBLING_WEIGHT,
            })
            .collect();

        if !dir.is_empty() {
            match self.structure.get_directory(path::parent(dir), false).await {
                Ok(listing) => candidates.extend(
                    listing
                        .iter()
                        .filter(|item| item.is_markdown())
                        .map(|item| Candidate {
                            item: item.clone(),
                            weight: PARENT_WEIGHT,
                        }),
                ),
                Err(e) => {
                    tracing::warn!(
                        "Parent directory of '{}' unavailable, using siblings only: {}",
                        dir,
                        e
                    );
                }
            }
        }

        Ok(candidates)
    }

    async fn rank(&self, candidates: Vec<Candidate>, current_tags: &[String]) -> Vec<RelatedDocument> {
        let tag_lookups = candidates
            .iter()
            .map(|candidate| self.documents.get_tags(&candidate.item.path));
        let tags = join_all(tag_lookups).await;

        let mut related: Vec<RelatedDocument> = candidates
            .into_iter()
            .zip(tags)
            .filter_map(|(candidate, tags)| match tags {
                Ok(tags) => Some(score(candidate, &tags, current_tags)),
                Err(e) => {
                    tracing::warn!(
                        "Skipping related candidate '{}': {}",
                        candidate.item.path,
                        e
                    );
                    None
                }
            })
            .collect();

        // Stable: equal relevance keeps listing order
        related.sort_by(|a, b| b.relevance.cmp(&a.relevance));
        related
    }

    /// Drop one document's ranking, or all rankings when `document_path` is `None`.
    pub fn clear_cache(&self, document_path: Option<&str>) {
        match document_path {
            Some(document_path) => {
                if let Ok(normalized) = path::validate_document(document_path) {
                    lock(&self.cache).delete(&document_identity(normalized));
                }
            }
            None => lock(&self.cache).clear(),
        }

        self.events.publish(BrowserEvent::CacheCleared {
            component: "related",
            path: document_path.map(|p| path::normalize(p).to_string()),
        });
    }

    /// Drop expired rankings. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        lock(&self.cache).purge_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.cache).stats()
    }
}

/// Cache and comparison key for a document: `a`, `a.md` and `a.MD` are one document.
fn document_identity(normalized: &str) -> String {
    path::strip_markdown_extension(normalized).to_string()
}

fn score(candidate: Candidate, candidate_tags: &[String], current_tags: &[String]) -> RelatedDocument {
    let common = common_tags(candidate_tags, current_tags);
    let title = candidate
        .item
        .metadata
        .title
        .unwrap_or_else(|| path::title_from_name(&candidate.item.name));

    RelatedDocument {
        path: candidate.item.path,
        title,
        relevance: relatedness(candidate.weight, common.len()),
        common_tags_count: common.len(),
        common_tags: common,
    }
}

fn truncated(ranking: &[RelatedDocument], limit: usize) -> Vec<RelatedDocument> {
    ranking.iter().take(limit).cloned().collect()
}
