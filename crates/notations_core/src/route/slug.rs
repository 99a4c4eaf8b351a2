//! Segment derivation and matching for human-authored titles.
//!
//! Titles are free-form text; segments must stay stable under accents,
//! punctuation and repeated whitespace so links keep working after cosmetic
//! edits.

use crate::model::node::Node;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Segment used when a title strips down to nothing.
pub const EMPTY_SEGMENT: &str = "untitled";

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s-]+").expect("valid slug strip regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static DASH_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid dash regex"));
static NON_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid token regex"));

fn strip_diacritics(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Derives the canonical URL-safe segment for a title.
///
/// Diacritics are stripped, characters outside word/whitespace/hyphen are
/// removed, whitespace runs and hyphen runs collapse to single hyphens, and
/// the result is lowercased. An empty result maps to `untitled`.
pub fn title_to_segment(title: &str) -> String {
    let stripped = strip_diacritics(title);
    let cleaned = NON_SLUG_RE.replace_all(&stripped, "");
    let trimmed = cleaned.trim();
    let hyphenated = WHITESPACE_RE.replace_all(trimmed, "-");
    let collapsed = DASH_RUN_RE.replace_all(&hyphenated, "-");
    let slug = collapsed.to_lowercase();
    if slug.is_empty() {
        EMPTY_SEGMENT.to_string()
    } else {
        slug
    }
}

/// Normalizes any token (segment, id or title) for comparison: diacritics
/// stripped, lowercased, non-alphanumeric runs collapsed to single hyphens,
/// leading/trailing hyphens trimmed.
pub fn normalize_token(value: &str) -> String {
    let stripped = strip_diacritics(value).to_lowercase();
    let collapsed = NON_TOKEN_RE.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Tests whether a node answers to an incoming route segment.
///
/// A node matches on its normalized id, title or derived slug, or when the
/// normalized title/slug starts with `segment + "-"` (prefix fallback for
/// truncated links).
pub fn matches_segment(node: &Node, segment: &str) -> bool {
    let target = normalize_token(segment);
    if target.is_empty() {
        return false;
    }
    let by_id = normalize_token(&node.id().to_string());
    let by_title = normalize_token(node.title());
    let by_slug = normalize_token(&title_to_segment(node.title()));
    if by_id == target || by_title == target || by_slug == target {
        return true;
    }
    let prefix = format!("{target}-");
    by_title.starts_with(&prefix) || by_slug.starts_with(&prefix)
}
