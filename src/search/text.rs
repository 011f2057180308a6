//! Plain-text extraction, previews and case-insensitive highlighting.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Marker opening a highlighted match.
pub const HIGHLIGHT_OPEN: &str = "<mark>";
/// Marker closing a highlighted match.
pub const HIGHLIGHT_CLOSE: &str = "</mark>";

/// Appended to previews that were cut short.
const ELLIPSIS: &str = "...";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

/// Reduce rendered HTML to whitespace-collapsed text.
pub fn strip_html(html: &str) -> String {
    let text = TAG_PATTERN.replace_all(html, " ");
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// First `max_chars` characters of `text`, with an ellipsis when truncated.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Byte range of the first case-insensitive occurrence of `needle`.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<Range<usize>> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return None;
    }

    haystack
        .char_indices()
        .find_map(|(start, _)| match_len_at(&haystack[start..], &needle).map(|len| start..start + len))
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    find_ignore_case(haystack, needle).is_some()
}

/// Length in bytes of the prefix of `text` matching the lowercased `needle`.
fn match_len_at(text: &str, needle: &[char]) -> Option<usize> {
    let mut matched = 0;
    for (offset, c) in text.char_indices() {
        for lower in c.to_lowercase() {
            if matched == needle.len() || needle[matched] != lower {
                return None;
            }
            matched += 1;
        }
        if matched == needle.len() {
            return Some(offset + c.len_utf8());
        }
    }
    None
}

/// Wrap every case-insensitive occurrence of `term` in highlight markers,
/// keeping the original casing of the matched text.
pub fn highlight(text: &str, term: &str) -> String {
    let mut out = String::with_capacity(text.len() + HIGHLIGHT_OPEN.len() + HIGHLIGHT_CLOSE.len());
    let mut rest = text;

    while let Some(range) = find_ignore_case(rest, term) {
        out.push_str(&rest[..range.start]);
        out.push_str(HIGHLIGHT_OPEN);
        out.push_str(&rest[range.clone()]);
        out.push_str(HIGHLIGHT_CLOSE);
        rest = &rest[range.end..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("<p>Hello <b>world</b></p>", "Hello world")]
    #[case("<h1 class=\"x\">Title</h1>\n<p>a &amp; b</p>", "Title a & b")]
    #[case("no tags", "no tags")]
    #[case("<pre>\n  x\n</pre>", "x")]
    fn test_strip_html(#[case] html: &str, #[case] expected: &str) {
        check!(strip_html(html) == expected);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        check!(preview("short", 200) == "short");
        check!(preview("abcdef", 3) == "abc...");
        check!(preview("ééééé", 2) == "éé...");
        check!(preview("exact", 5) == "exact");
    }

    #[test]
    fn test_find_ignore_case() {
        check!(find_ignore_case("Run NPM install", "npm") == Some(4..7));
        check!(find_ignore_case("Straße", "STRASSE").is_none());
        check!(find_ignore_case("ÉCOLE", "école") == Some(0..6));
        check!(find_ignore_case("abc", "").is_none());
    }

    #[test]
    fn test_highlight_preserves_casing() {
        check!(highlight("Install the INSTALLER", "install")
            == "<mark>Install</mark> the <mark>INSTALL</mark>ER");
        check!(highlight("nothing here", "zzz") == "nothing here");
    }
}
