//! Data model shared by the stores, the search index and the UI layer.

use serde::{Deserialize, Serialize};

/// Front-matter metadata attached to a tree node or document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Keys this crate does not interpret, kept for the UI layer
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One node of the document tree.
///
/// `children` is `None` until the directory has been loaded; a loaded but
/// empty directory is `Some(vec![])`. Nodes are replaced wholesale on refresh,
/// never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ContentItem>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ContentItem {
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            children: None,
            metadata: Metadata::default(),
        }
    }

    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            children: None,
            metadata: Metadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether this node names a Markdown document.
    pub fn is_markdown(&self) -> bool {
        !self.is_directory && crate::path::is_markdown(&self.path)
    }
}

/// Document heading as extracted by the content API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// A fetched document: rendered body plus metadata and headings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    pub path: String,
    pub name: String,
    /// Rendered HTML, or raw Markdown when the source does not render
    pub body: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub headings: Vec<Heading>,
}

impl DocumentPayload {
    /// Title from metadata, falling back to the file name.
    pub fn title(&self) -> String {
        self.metadata
            .title
            .clone()
            .unwrap_or_else(|| crate::path::title_from_name(&self.name))
    }
}

/// Flat index entry built from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    pub path: String,
    pub title: String,
    pub preview_text: String,
    pub tags: Vec<String>,
}

/// A highlighted snippet inside a [`SearchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub line: usize,
    pub content: String,
    pub highlighted: String,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub title: String,
    pub preview: String,
    pub score: u32,
    pub matches: Vec<SearchMatch>,
}

/// A document ranked by proximity and shared tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedDocument {
    pub path: String,
    pub title: String,
    pub common_tags: Vec<String>,
    pub common_tags_count: usize,
    pub relevance: u32,
}
