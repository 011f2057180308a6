//! Serve a local directory of Markdown files as a [`ContentSource`].
//!
//! Documents may start with a YAML front matter block delimited by `---`
//! lines. The body is returned as Markdown; headings are taken from ATX
//! (`#`-prefixed) lines outside fenced code blocks.

use crate::error::TransportError;
use crate::path;
use crate::source::ContentSource;
use crate::types::{ContentItem, DocumentPayload, Heading, Metadata};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Status reported for a path that escapes the content root.
const STATUS_FORBIDDEN: u16 = 403;
/// Status reported for a malformed path.
const STATUS_BAD_REQUEST: u16 = 400;

const FRONT_MATTER_DELIMITER: &str = "---";

#[derive(Debug, Clone)]
pub struct FsContentSource {
    root: PathBuf,
}

impl FsContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a content path onto the file system, refusing anything that
    /// resolves outside the root (including through symlinks).
    async fn resolve(&self, content_path: &str) -> Result<PathBuf, TransportError> {
        let normalized = path::validate(content_path)
            .map_err(|e| TransportError::new(Some(STATUS_BAD_REQUEST), e.to_string()))?;

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|e| io_error(&self.root.display().to_string(), &e))?;
        let resolved = tokio::fs::canonicalize(root.join(normalized))
            .await
            .map_err(|e| io_error(normalized, &e))?;

        if !resolved.starts_with(&root) {
            tracing::warn!("Refusing '{}': resolves outside the content root", normalized);
            return Err(TransportError::new(
                Some(STATUS_FORBIDDEN),
                format!("'{}' is outside the content root", normalized),
            ));
        }
        Ok(resolved)
    }

    async fn read(&self, content_path: &str) -> Result<String, TransportError> {
        let file = self.resolve(content_path).await?;
        tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| io_error(content_path, &e))
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    async fn fetch_directory(&self, dir: &str) -> Result<Vec<ContentItem>, TransportError> {
        let resolved = self.resolve(dir).await?;
        let is_dir = tokio::fs::metadata(&resolved)
            .await
            .is_ok_and(|metadata| metadata.is_dir());
        if !is_dir {
            return Err(TransportError::not_found(dir));
        }
        let dir = path::normalize(dir).to_string();

        tokio::task::spawn_blocking(move || list_directory(&resolved, &dir))
            .await
            .map_err(|e| TransportError::new(None, format!("directory listing task failed: {}", e)))
    }

    async fn fetch_document(&self, doc_path: &str) -> Result<DocumentPayload, TransportError> {
        let content = self.read(doc_path).await?;
        let (front_matter, body) = split_front_matter(&content);
        let normalized = path::normalize(doc_path);

        Ok(DocumentPayload {
            path: normalized.to_string(),
            name: path::file_name(normalized).to_string(),
            metadata: parse_metadata(front_matter, normalized),
            headings: extract_headings(body),
            body: body.to_string(),
        })
    }

    async fn fetch_document_tags(&self, doc_path: &str) -> Result<Vec<String>, TransportError> {
        let content = self.read(doc_path).await?;
        let (front_matter, _) = split_front_matter(&content);
        Ok(parse_metadata(front_matter, path::normalize(doc_path)).tags)
    }
}

fn io_error(content_path: &str, error: &std::io::Error) -> TransportError {
    match error.kind() {
        ErrorKind::NotFound => TransportError::not_found(content_path),
        ErrorKind::PermissionDenied => {
            TransportError::new(Some(STATUS_FORBIDDEN), format!("'{}': {}", content_path, error))
        }
        _ => TransportError::new(None, format!("'{}': {}", content_path, error)),
    }
}

/// One level of `dir`: hidden and ignored entries skipped, directories first,
/// then by name.
fn list_directory(dir: &Path, content_dir: &str) -> Vec<ContentItem> {
    let mut items: Vec<ContentItem> = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .hidden(true)
        .build()
        .filter_map(|e| e.ok())
        .filter(|e| e.depth() == 1)
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let item_path = path::join(content_dir, &name);
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());

            if is_dir {
                return Some(ContentItem::directory(name, item_path));
            }

            let item = ContentItem::file(name, item_path);
            if !item.is_markdown() {
                return Some(item);
            }
            // Listing titles come from front matter, as the document would report them
            let metadata = std::fs::read_to_string(entry.path())
                .map(|content| parse_metadata(split_front_matter(&content).0, &item.path))
                .unwrap_or_default();
            Some(item.with_metadata(metadata))
        })
        .collect();

    items.sort_by(|a, b| b.is_directory.cmp(&a.is_directory).then_with(|| a.name.cmp(&b.name)));
    items
}

/// Split `content` into its front matter (without delimiters) and the body.
fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content
        .strip_prefix(FRONT_MATTER_DELIMITER)
        .and_then(|rest| rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            let body = &rest[offset + line.len()..];
            return (Some(&rest[..offset]), body);
        }
        offset += line.len();
    }

    // Unterminated: treat the whole file as body
    (None, content)
}

fn parse_metadata(front_matter: Option<&str>, content_path: &str) -> Metadata {
    let Some(yaml) = front_matter.filter(|yaml| !yaml.trim().is_empty()) else {
        return Metadata::default();
    };

    serde_yaml::from_str(yaml).unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed front matter in '{}': {}", content_path, e);
        Metadata::default()
    })
}

fn extract_headings(markdown: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut seen_ids: HashMap<String, usize> = HashMap::new();
    let mut fence: Option<&str> = None;

    for line in markdown.lines() {
        let trimmed = line.trim_start();

        if let Some(open) = fence {
            if trimmed.starts_with(open) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }

        let level = trimmed.chars().take_while(|&c| c == '#').count();
        if !(1..=6).contains(&level) {
            continue;
        }
        let rest = &trimmed[level..];
        if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
            continue;
        }

        let text = rest.trim().trim_end_matches('#').trim_end().to_string();
        if text.is_empty() {
            continue;
        }

        let slug = slugify(&text);
        let count = seen_ids.entry(slug.clone()).or_insert(0);
        let id = if *count == 0 {
            slug
        } else {
            format!("{}-{}", slug, count)
        };
        *count += 1;

        headings.push(Heading {
            level: u8::try_from(level).unwrap_or(6),
            text,
            id,
        });
    }

    headings
}

/// Anchor id for a heading: lowercase, alphanumerics kept, whitespace and
/// hyphens become `-`, everything else dropped.
fn slugify(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '_' {
                Some(c.to_lowercase().next().unwrap_or(c))
            } else if c.is_whitespace() || c == '-' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}
