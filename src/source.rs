//! The content API the stores sit in front of.
//!
//! Implementations own transport concerns (HTTP, timeouts, backoff). The stores
//! never retry; a failure is surfaced to every waiter and not cached.

use crate::error::TransportError;
use crate::types::{ContentItem, DocumentPayload};
use async_trait::async_trait;

/// Fetch capability consumed by the structure and document stores.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List the entries of one directory. `""` is the root.
    ///
    /// Returned directories have `children: None`; they are loaded on demand.
    async fn fetch_directory(&self, path: &str) -> Result<Vec<ContentItem>, TransportError>;

    /// Fetch one document. `path` always carries its `.md` extension.
    async fn fetch_document(&self, path: &str) -> Result<DocumentPayload, TransportError>;

    /// Tags of one document.
    async fn fetch_document_tags(&self, path: &str) -> Result<Vec<String>, TransportError> {
        self.fetch_document(path)
            .await
            .map(|payload| payload.metadata.tags)
    }
}
