//! Shared test fixtures and utilities for integration tests.
//!
//! [`ScriptedSource`] is an in-memory [`ContentSource`] that counts fetches
//! per path, can be told to fail specific paths and can delay every fetch so
//! concurrent callers overlap.
//!
//! # Available Fixtures
//!
//! - `docs_tree`: `docs/a.md`, `docs/b.md` and a top-level `c.md`, tagged for
//!   relatedness tests
//! - `search_tree`: five documents under `guide/` for search tests

use async_trait::async_trait;
use docshelf::error::TransportError;
use docshelf::types::{ContentItem, DocumentPayload, Metadata};
use docshelf::{BrowserConfig, ContentSource, DocBrowser};
use rstest::fixture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Counters {
    directories: HashMap<String, usize>,
    documents: HashMap<String, usize>,
    tags: HashMap<String, usize>,
}

/// In-memory content source with fetch counters and injectable failures.
#[derive(Default)]
pub struct ScriptedSource {
    directories: HashMap<String, Vec<ContentItem>>,
    documents: HashMap<String, DocumentPayload>,
    failures: Mutex<HashMap<String, TransportError>>,
    counters: Mutex<Counters>,
    delay: Option<Duration>,
    total_fetches: AtomicUsize,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory listing. Entries are built from their paths.
    pub fn with_dir(mut self, path: &str, entries: &[&str]) -> Self {
        let items = entries
            .iter()
            .map(|entry| match entry.strip_suffix('/') {
                Some(dir) => ContentItem::directory(name_of(dir), dir),
                None => ContentItem::file(name_of(entry), *entry),
            })
            .collect();
        self.directories.insert(path.to_string(), items);
        self
    }

    /// Register a document. `path` must carry its `.md` extension.
    pub fn with_doc(mut self, path: &str, title: &str, tags: &[&str], body: &str) -> Self {
        self.documents.insert(
            path.to_string(),
            DocumentPayload {
                path: path.to_string(),
                name: name_of(path).to_string(),
                body: body.to_string(),
                metadata: Metadata {
                    title: Some(title.to_string()),
                    tags: tags.iter().map(ToString::to_string).collect(),
                    ..Metadata::default()
                },
                headings: vec![],
            },
        );
        self
    }

    /// Delay every fetch so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every fetch of `path` fail until [`Self::heal`] is called.
    pub fn fail(&self, path: &str, error: TransportError) {
        self.failures
            .lock()
            .unwrap()
            .insert(path.to_string(), error);
    }

    pub fn heal(&self, path: &str) {
        self.failures.lock().unwrap().remove(path);
    }

    pub fn directory_fetches(&self, path: &str) -> usize {
        self.counters
            .lock()
            .unwrap()
            .directories
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn document_fetches(&self, path: &str) -> usize {
        self.counters
            .lock()
            .unwrap()
            .documents
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn tag_fetches(&self, path: &str) -> usize {
        self.counters
            .lock()
            .unwrap()
            .tags
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Fetches of any kind, for asserting that nothing was fetched at all.
    pub fn total_fetches(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }

    async fn enter(&self, path: &str) -> Result<(), TransportError> {
        self.total_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().unwrap().get(path) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn fetch_directory(&self, path: &str) -> Result<Vec<ContentItem>, TransportError> {
        *self
            .counters
            .lock()
            .unwrap()
            .directories
            .entry(path.to_string())
            .or_default() += 1;
        self.enter(path).await?;

        self.directories
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::not_found(path))
    }

    async fn fetch_document(&self, path: &str) -> Result<DocumentPayload, TransportError> {
        *self
            .counters
            .lock()
            .unwrap()
            .documents
            .entry(path.to_string())
            .or_default() += 1;
        self.enter(path).await?;

        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::not_found(path))
    }

    async fn fetch_document_tags(&self, path: &str) -> Result<Vec<String>, TransportError> {
        *self
            .counters
            .lock()
            .unwrap()
            .tags
            .entry(path.to_string())
            .or_default() += 1;
        self.enter(path).await?;

        self.documents
            .get(path)
            .map(|document| document.metadata.tags.clone())
            .ok_or_else(|| TransportError::not_found(path))
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Build a browser with default config over `source`.
#[allow(dead_code)]
pub fn browser_over(source: &Arc<ScriptedSource>) -> DocBrowser {
    DocBrowser::new(
        Arc::clone(source) as Arc<dyn ContentSource>,
        BrowserConfig::default(),
    )
}

/// `docs/a.md [x, y]`, `docs/b.md [x]`, `c.md [x, y]`.
#[fixture]
pub fn docs_tree() -> Arc<ScriptedSource> {
    Arc::new(
        ScriptedSource::new()
            .with_dir("", &["docs/", "c.md"])
            .with_dir("docs", &["docs/a.md", "docs/b.md"])
            .with_doc("docs/a.md", "Alpha", &["x", "y"], "Alpha body")
            .with_doc("docs/b.md", "Beta", &["x"], "Beta body")
            .with_doc("c.md", "Gamma", &["x", "y"], "Gamma body"),
    )
}

/// Five documents under `guide/`; `install.md` and `faq.md` mention "install".
#[fixture]
pub fn search_tree() -> Arc<ScriptedSource> {
    Arc::new(
        ScriptedSource::new()
            .with_dir("", &["guide/", "readme.txt"])
            .with_dir(
                "guide",
                &[
                    "guide/faq.md",
                    "guide/install.md",
                    "guide/config.md",
                    "guide/usage.md",
                    "guide/api/",
                ],
            )
            .with_dir("guide/api", &["guide/api/reference.md"])
            .with_doc(
                "guide/faq.md",
                "FAQ",
                &["help"],
                "<p>How do I <b>install</b> the tool? See the guide.</p>",
            )
            .with_doc(
                "guide/install.md",
                "Install Guide",
                &["setup"],
                "<h1>Install</h1><p>Run npm install to install dependencies.</p>",
            )
            .with_doc("guide/config.md", "Configuration", &["setup"], "<p>Edit the config file.</p>")
            .with_doc("guide/usage.md", "Usage", &[], "<p>Start the server.</p>")
            .with_doc(
                "guide/api/reference.md",
                "API Reference",
                &["api"],
                "<p>Endpoints and types.</p>",
            ),
    )
}
