//! Content caching, structure loading and search for a Markdown documentation
//! browser.
//!
//! [`DocBrowser`] wires the components together around one [`ContentSource`]:
//! a directory-tree store, a document store, a search index and a
//! relatedness engine, each with its own TTL cache.

pub mod browser;
pub mod cache;
pub mod cli;
pub mod coalesce;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod fs_source;
pub mod path;
pub mod related;
pub mod search;
pub mod server;
pub mod source;
pub mod structure;
mod sync;
pub mod tracing;
pub mod types;
pub mod worker;

pub use browser::DocBrowser;
pub use cache::TtlCache;
pub use coalesce::Coalescer;
pub use config::BrowserConfig;
pub use document::DocumentStore;
pub use error::{DirectoryLoadError, DocumentLoadError, RelatedError, Result, TransportError};
pub use events::{BrowserEvent, EventBus};
pub use fs_source::FsContentSource;
pub use related::RelatednessEngine;
pub use search::SearchIndex;
pub use source::ContentSource;
pub use structure::StructureStore;
pub use types::{ContentItem, DocumentPayload, IndexedDocument, RelatedDocument, SearchResult};
