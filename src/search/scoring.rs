//! Relevance scoring for search hits and related documents.

use super::text::contains_ignore_case;
use crate::types::IndexedDocument;

/// Awarded when the term appears in the title.
pub const TITLE_MATCH_SCORE: u32 = 3;
/// Awarded when the term appears in the preview.
pub const PREVIEW_MATCH_SCORE: u32 = 1;

/// Proximity weight of a document in the same directory.
pub const SIBLING_WEIGHT: u32 = 10;
/// Proximity weight of a document in the parent directory.
pub const PARENT_WEIGHT: u32 = 5;
/// Bonus per tag shared with the target document.
pub const SHARED_TAG_BONUS: u32 = 3;

/// Score a document against a search term.
///
/// - 3: term in title
/// - 1: term in preview
/// - 4: both
/// - 0: no match
pub fn term_score(document: &IndexedDocument, term: &str) -> u32 {
    let mut score = 0;
    if contains_ignore_case(&document.title, term) {
        score += TITLE_MATCH_SCORE;
    }
    if contains_ignore_case(&document.preview_text, term) {
        score += PREVIEW_MATCH_SCORE;
    }
    score
}

/// Tags of `candidate` also carried by `current`, in candidate order, without duplicates.
pub fn common_tags(candidate: &[String], current: &[String]) -> Vec<String> {
    let mut common: Vec<String> = Vec::new();
    for tag in candidate {
        if current.contains(tag) && !common.contains(tag) {
            common.push(tag.clone());
        }
    }
    common
}

/// Proximity weight plus the shared-tag bonus.
///
/// Weights are chosen so that one shared tag in the same directory (13)
/// outranks two shared tags one directory up (11).
pub fn relatedness(directory_weight: u32, common_tag_count: usize) -> u32 {
    let bonus = u32::try_from(common_tag_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(SHARED_TAG_BONUS);
    directory_weight.saturating_add(bonus)
}
