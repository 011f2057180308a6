//! Document path normalization.
//!
//! Paths are slash-separated and relative to the content root. The root itself
//! is the empty string.

use crate::error::PathError;

/// Extension marking an indexable Markdown document.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// Strip leading and trailing slashes. `""`, `"/"` and `"//"` all become the root.
pub fn normalize(path: &str) -> &str {
    path.trim().trim_matches('/')
}

/// Normalize and reject paths that could escape the content root.
pub fn validate(path: &str) -> Result<&str, PathError> {
    let normalized = normalize(path);

    if normalized.contains('\0') {
        return Err(invalid(path, "NUL bytes are not allowed"));
    }
    if normalized.contains('\\') {
        return Err(invalid(path, "backslashes are not allowed"));
    }
    if normalized.split('/').any(|segment| segment == "..") {
        return Err(invalid(path, "parent segments are not allowed"));
    }
    if normalized.contains("//") {
        return Err(invalid(path, "empty segments are not allowed"));
    }

    Ok(normalized)
}

/// Like [`validate`], but the root is not a valid document path.
pub fn validate_document(path: &str) -> Result<&str, PathError> {
    let normalized = validate(path)?;
    if normalized.is_empty() {
        return Err(PathError::Missing);
    }
    Ok(normalized)
}

fn invalid(path: &str, reason: &'static str) -> PathError {
    PathError::Invalid {
        path: path.to_string(),
        reason,
    }
}

/// Whether the path names an indexable Markdown file.
pub fn is_markdown(path: &str) -> bool {
    path.len() > MARKDOWN_EXTENSION.len()
        && path
            .get(path.len() - MARKDOWN_EXTENSION.len()..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
}

/// Remove a trailing `.md`, if present.
pub fn strip_markdown_extension(path: &str) -> &str {
    if is_markdown(path) {
        &path[..path.len() - MARKDOWN_EXTENSION.len()]
    } else {
        path
    }
}

/// Append `.md` unless the path already carries it.
pub fn with_markdown_extension(path: &str) -> String {
    if is_markdown(path) {
        path.to_string()
    } else {
        format!("{}{}", path, MARKDOWN_EXTENSION)
    }
}

/// Directory containing `path` (`""` for top-level entries).
pub fn parent(path: &str) -> &str {
    normalize(path).rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Last path segment.
pub fn file_name(path: &str) -> &str {
    let path = normalize(path);
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Join a directory and an entry name.
pub fn join(dir: &str, name: &str) -> String {
    let dir = normalize(dir);
    let name = normalize(name);
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Human-readable title derived from a file name: `getting-started.md` → `getting started`.
pub fn title_from_name(name: &str) -> String {
    strip_markdown_extension(file_name(name))
        .replace(['-', '_'], " ")
}
