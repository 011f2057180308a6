//! Composition root wiring the stores, the search index and the relatedness
//! engine around one content source.

use crate::config::BrowserConfig;
use crate::document::DocumentStore;
use crate::events::{BrowserEvent, EventBus};
use crate::related::RelatednessEngine;
use crate::search::{IndexOptions, SearchIndex};
use crate::source::ContentSource;
use crate::structure::StructureStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Expired entries removed by one sweep, per cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub structure: usize,
    pub document: usize,
    pub related: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.structure + self.document + self.related
    }
}

/// Shared browser state.
///
/// Each component owns its own cache; the browser only holds them together
/// and shares one event bus between them.
pub struct DocBrowser {
    config: BrowserConfig,
    events: EventBus,
    structure: Arc<StructureStore>,
    documents: Arc<DocumentStore>,
    index: SearchIndex,
    related: RelatednessEngine,
}

impl std::fmt::Debug for DocBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocBrowser")
            .field("structure", &self.structure)
            .field("documents", &self.documents)
            .field("index", &self.index)
            .field("related", &self.related)
            .finish_non_exhaustive()
    }
}

impl DocBrowser {
    pub fn new(source: Arc<dyn ContentSource>, config: BrowserConfig) -> Self {
        let events = EventBus::new(config.event_capacity);

        let structure = Arc::new(StructureStore::new(
            Arc::clone(&source),
            config.structure_cache_size,
            config.structure_ttl(),
            events.clone(),
        ));
        let documents = Arc::new(DocumentStore::new(
            source,
            config.document_cache_size,
            config.document_ttl(),
            events.clone(),
        ));
        let index = SearchIndex::new(
            Arc::clone(&structure),
            Arc::clone(&documents),
            IndexOptions {
                max_results: config.search_max_results,
                preview_length: config.preview_length,
                concurrency: config.index_concurrency,
            },
            events.clone(),
        );
        let related = RelatednessEngine::new(
            Arc::clone(&structure),
            Arc::clone(&documents),
            config.related_cache_size,
            config.related_ttl(),
            config.related_limit,
            events.clone(),
        );

        Self {
            config,
            events,
            structure,
            documents,
            index,
            related,
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn structure(&self) -> &Arc<StructureStore> {
        &self.structure
    }

    pub fn documents(&self) -> &Arc<DocumentStore> {
        &self.documents
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn related(&self) -> &RelatednessEngine {
        &self.related
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BrowserEvent> {
        self.events.subscribe()
    }

    /// Empty every cache. The search index snapshot is left alone.
    pub fn clear_all_caches(&self) {
        self.structure.clear_cache(None);
        self.documents.clear_cache(None);
        self.related.clear_cache(None);
        tracing::info!("Cleared all caches");
    }

    /// Drop expired entries from every cache.
    pub fn purge_expired(&self) -> SweepReport {
        SweepReport {
            structure: self.structure.purge_expired(),
            document: self.documents.purge_expired(),
            related: self.related.purge_expired(),
        }
    }
}
