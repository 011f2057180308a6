//! Substring search over the document tree.
//!
//! The index is a flat snapshot of every Markdown document, rebuilt as a
//! whole. Scoring is shared with the relatedness engine.

pub mod index;
pub mod scoring;
pub mod text;

pub use index::{BuildReport, IndexFailure, IndexOptions, IndexState, SearchIndex};
