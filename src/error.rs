//! Error handling types and utilities.
//!
//! Component APIs return the typed errors below. Application glue (config
//! loading, the MCP server, `main`) uses [`Result`], an `anyhow` alias.

use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for application-level docshelf operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods in the binary and server glue.
pub type Result<T> = anyhow::Result<T>;

/// HTTP status the content API uses for a missing path.
pub const STATUS_NOT_FOUND: u16 = 404;

/// Failure reported by a [`ContentSource`](crate::source::ContentSource).
///
/// Cloneable so a single failure can be delivered to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// HTTP status, when the transport had one
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(Some(STATUS_NOT_FOUND), format!("'{}' not found", path))
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(STATUS_NOT_FOUND)
    }
}

/// Malformed caller input, raised before any I/O is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("a document path is required")]
    Missing,
    #[error("invalid path '{path}': {reason}")]
    Invalid { path: String, reason: &'static str },
}

/// Loading a directory listing failed.
#[derive(Debug, Clone, Error)]
#[error("failed to load directory '{path}'")]
pub struct DirectoryLoadError {
    pub path: String,
    #[source]
    pub source: DirectorySource,
}

/// Underlying cause of a [`DirectoryLoadError`].
#[derive(Debug, Clone, Error)]
pub enum DirectorySource {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DirectoryLoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(&self.source, DirectorySource::Transport(e) if e.is_not_found())
    }
}

/// Loading a document failed.
///
/// `status` preserves the transport status so callers can tell a missing
/// document (404) from a transient failure.
#[derive(Debug, Clone, Error)]
#[error("failed to load document '{path}'")]
pub struct DocumentLoadError {
    pub path: String,
    pub status: Option<u16>,
    #[source]
    pub source: DocumentSource,
}

/// Underlying cause of a [`DocumentLoadError`].
#[derive(Debug, Clone, Error)]
pub enum DocumentSource {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DocumentLoadError {
    pub(crate) fn from_transport(path: impl Into<String>, error: TransportError) -> Self {
        Self {
            path: path.into(),
            status: error.status,
            source: DocumentSource::Transport(error),
        }
    }

    pub(crate) fn from_path(path: impl Into<String>, error: PathError) -> Self {
        Self {
            path: path.into(),
            status: None,
            source: DocumentSource::Path(error),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(STATUS_NOT_FOUND)
    }
}

/// Errors from [`RelatednessEngine::get_related`](crate::related::RelatednessEngine::get_related).
#[derive(Debug, Clone, Error)]
pub enum RelatedError {
    #[error("a document path is required")]
    MissingPath,
    #[error(transparent)]
    InvalidPath(PathError),
    #[error("document '{path}' not found")]
    NotFound { path: String },
    #[error(transparent)]
    Document(#[from] DocumentLoadError),
    #[error(transparent)]
    Directory(#[from] DirectoryLoadError),
}

impl From<PathError> for RelatedError {
    fn from(error: PathError) -> Self {
        match error {
            PathError::Missing => Self::MissingPath,
            invalid @ PathError::Invalid { .. } => Self::InvalidPath(invalid),
        }
    }
}

/// Configuration could not be loaded or is out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
