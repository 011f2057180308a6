//! In-memory search index over the document tree.
//!
//! A build walks the directory tree, fetches every Markdown document and
//! stores a flat list of [`IndexedDocument`]s. Queries run against the last
//! completed build; a build in progress is never visible.

use super::scoring::term_score;
use super::text::{find_ignore_case, highlight, preview, strip_html};
use crate::coalesce::Coalescer;
use crate::document::DocumentStore;
use crate::error::DirectoryLoadError;
use crate::events::{BrowserEvent, EventBus};
use crate::structure::StructureStore;
use crate::sync::lock;
use crate::types::{ContentItem, DocumentPayload, IndexedDocument, SearchMatch, SearchResult};
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Default maximum number of search results.
pub const DEFAULT_MAX_RESULTS: usize = 20;
/// Default preview length in characters.
pub const DEFAULT_PREVIEW_LENGTH: usize = 200;
/// Default number of documents fetched concurrently during a build.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Failures kept in a [`BuildReport`] as samples.
const MAX_FAILURE_SAMPLES: usize = 5;

/// Line number reported for title matches.
const TITLE_LINE: usize = 0;
/// Line number reported for preview matches.
const PREVIEW_LINE: usize = 1;

/// Lifecycle of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexState {
    /// Never built
    Empty,
    /// A build is running
    Building,
    /// At least one build completed
    Ready,
}

/// One document or directory that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of a build.
///
/// Per-file failures do not fail the build; they are counted here with a few
/// samples for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub indexed: usize,
    pub failed: usize,
    pub failure_samples: Vec<IndexFailure>,
}

impl BuildReport {
    fn record_failure(&mut self, path: &str, error: &dyn std::fmt::Display) {
        self.failed += 1;
        if self.failure_samples.len() < MAX_FAILURE_SAMPLES {
            self.failure_samples.push(IndexFailure {
                path: path.to_string(),
                error: error.to_string(),
            });
        }
    }

    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }
}

/// Build and query settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub max_results: usize,
    pub preview_length: usize,
    pub concurrency: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            preview_length: DEFAULT_PREVIEW_LENGTH,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

struct Shared {
    structure: Arc<StructureStore>,
    documents: Arc<DocumentStore>,
    options: IndexOptions,
    events: EventBus,
    snapshot: Mutex<Arc<Vec<IndexedDocument>>>,
    state: Mutex<IndexState>,
    last_report: Mutex<Option<BuildReport>>,
}

pub struct SearchIndex {
    shared: Arc<Shared>,
    builds: Coalescer<(), BuildReport, DirectoryLoadError>,
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("state", &self.state())
            .field("documents", &self.len())
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl SearchIndex {
    pub fn new(
        structure: Arc<StructureStore>,
        documents: Arc<DocumentStore>,
        options: IndexOptions,
        events: EventBus,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                structure,
                documents,
                options,
                events,
                snapshot: Mutex::new(Arc::new(Vec::new())),
                state: Mutex::new(IndexState::Empty),
                last_report: Mutex::new(None),
            }),
            builds: Coalescer::new(),
        }
    }

    /// Rebuild the index from the current tree.
    ///
    /// Concurrent calls share one build. Individual documents that fail to
    /// load are skipped and reported; only a failure to list the root aborts
    /// the build, leaving the previous index in place.
    pub async fn rebuild(&self) -> Result<BuildReport, DirectoryLoadError> {
        let shared = Arc::clone(&self.shared);
        self.builds.run((), move || build(shared)).await
    }

    /// Rank indexed documents against `term`.
    ///
    /// Case-insensitive substring match on title and preview. Equal scores
    /// keep discovery order. A blank term yields no results.
    pub fn search(&self, term: &str) -> Vec<SearchResult> {
        self.search_with_limit(term, self.shared.options.max_results)
    }

    pub fn search_with_limit(&self, term: &str, limit: usize) -> Vec<SearchResult> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }

        let snapshot = self.snapshot();
        let mut hits: Vec<(u32, &IndexedDocument)> = snapshot
            .iter()
            .filter_map(|document| {
                let score = term_score(document, term);
                (score > 0).then_some((score, document))
            })
            .collect();

        // Stable: ties stay in discovery order
        hits.sort_by(|(a, _), (b, _)| b.cmp(a));

        hits.into_iter()
            .take(limit)
            .map(|(score, document)| to_result(document, score, term))
            .collect()
    }

    pub fn state(&self) -> IndexState {
        *lock(&self.shared.state)
    }

    pub fn is_ready(&self) -> bool {
        self.state() == IndexState::Ready
    }

    /// Number of documents in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_report(&self) -> Option<BuildReport> {
        lock(&self.shared.last_report).clone()
    }

    /// The current snapshot, shared with any in-flight queries.
    pub fn snapshot(&self) -> Arc<Vec<IndexedDocument>> {
        Arc::clone(&lock(&self.shared.snapshot))
    }
}

async fn build(shared: Arc<Shared>) -> Result<BuildReport, DirectoryLoadError> {
    let previous_state = std::mem::replace(&mut *lock(&shared.state), IndexState::Building);
    let started = Instant::now();
    tracing::info!("Building search index");

    let mut report = BuildReport::default();
    let files = match collect_markdown_files(&shared.structure, &mut report).await {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!("Search index build aborted: {}", e);
            // Builds are coalesced, so no other build set this state
            *lock(&shared.state) = match previous_state {
                IndexState::Building => IndexState::Empty,
                other => other,
            };
            return Err(e);
        }
    };

    let preview_length = shared.options.preview_length;
    let outcomes: Vec<_> = futures::stream::iter(files)
        .map(|item| {
            let documents = Arc::clone(&shared.documents);
            async move {
                let outcome = documents
                    .get_document(&item.path, false)
                    .await
                    .map(|payload| index_document(&item, &payload, preview_length));
                (item.path, outcome)
            }
        })
        .buffered(shared.options.concurrency.max(1))
        .collect()
        .await;

    let mut indexed = Vec::with_capacity(outcomes.len());
    for (path, outcome) in outcomes {
        match outcome {
            Ok(document) => indexed.push(document),
            Err(e) => {
                tracing::warn!("Skipping '{}' in search index: {}", path, e);
                report.record_failure(&path, &e);
            }
        }
    }
    report.indexed = indexed.len();

    *lock(&shared.snapshot) = Arc::new(indexed);
    *lock(&shared.state) = IndexState::Ready;
    *lock(&shared.last_report) = Some(report.clone());

    tracing::info!(
        "Indexed {} documents ({} failed) in {:?}",
        report.indexed,
        report.failed,
        started.elapsed()
    );
    shared.events.publish(BrowserEvent::IndexRebuilt {
        indexed: report.indexed,
        failed: report.failed,
    });

    Ok(report)
}

/// Depth-first walk collecting Markdown leaves in discovery order.
///
/// Unloaded directories are fetched through the structure store. A failing
/// subdirectory is recorded and skipped; a failing root aborts the walk.
async fn collect_markdown_files(
    structure: &StructureStore,
    report: &mut BuildReport,
) -> Result<Vec<ContentItem>, DirectoryLoadError> {
    let root = structure.get_directory("", false).await?;

    let mut stack: Vec<ContentItem> = root.iter().rev().cloned().collect();
    let mut visited: HashSet<String> = HashSet::from([String::new()]);
    let mut files = Vec::new();

    while let Some(item) = stack.pop() {
        if !item.is_directory {
            if item.is_markdown() {
                files.push(item);
            }
            continue;
        }

        if !visited.insert(item.path.clone()) {
            tracing::warn!("Directory '{}' listed twice, skipping", item.path);
            continue;
        }

        let children = match item.children {
            Some(children) => children,
            None => match structure.get_directory(&item.path, false).await {
                Ok(listing) => listing.as_ref().clone(),
                Err(e) => {
                    tracing::warn!("Skipping directory '{}' in search index: {}", item.path, e);
                    report.record_failure(&item.path, &e);
                    continue;
                }
            },
        };
        stack.extend(children.into_iter().rev());
    }

    Ok(files)
}

fn index_document(item: &ContentItem, payload: &DocumentPayload, preview_length: usize) -> IndexedDocument {
    let title = payload
        .metadata
        .title
        .clone()
        .or_else(|| item.metadata.title.clone())
        .unwrap_or_else(|| payload.title());

    IndexedDocument {
        path: item.path.clone(),
        title,
        preview_text: preview(&strip_html(&payload.body), preview_length),
        tags: payload.metadata.tags.clone(),
    }
}

fn to_result(document: &IndexedDocument, score: u32, term: &str) -> SearchResult {
    let candidates = [
        (TITLE_LINE, &document.title),
        (PREVIEW_LINE, &document.preview_text),
    ];
    let matches = candidates
        .into_iter()
        .filter(|(_, content)| find_ignore_case(content, term).is_some())
        .map(|(line, content)| SearchMatch {
            line,
            content: content.clone(),
            highlighted: highlight(content, term),
        })
        .collect();

    SearchResult {
        path: document.path.clone(),
        title: document.title.clone(),
        preview: document.preview_text.clone(),
        score,
        matches,
    }
}
