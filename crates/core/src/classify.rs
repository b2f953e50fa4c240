//! Title plausibility.
//!
//! A single predicate shared by every extractor, so the stages differ only in
//! how they generate candidates and score them, never in what counts as a
//! valid title.

use std::sync::OnceLock;

use regex::RegexSet;

/// Candidates with fewer whitespace-separated tokens are rejected.
const MIN_WORDS: usize = 3;

/// Longer candidates are most likely paragraphs.
const MAX_CHARS: usize = 200;

/// Minimum share of alphabetic characters; filters tables, page headers and
/// other number-heavy lines.
const MIN_ALPHA_RATIO: f64 = 0.5;

/// Patterns matched against the lowercased, trimmed candidate.
const SKIP_PATTERNS: &[&str] = &[
    r"^page\s+\d+",
    r"^\d+$",
    r"^\d+\s*of\s*\d+",
    r"^chapter\s+\d+",
    r"^section\s+\d+",
    // dates
    r"^\d{1,2}[-/]\d{1,2}[-/]\d{2,4}",
    // emails
    r"^[a-z]+@[a-z]+\.[a-z]+",
    r"^https?://",
    r"^www\.",
    r"^abstract$",
    r"^introduction$",
    r"^conclusion$",
    r"^references$",
    r"^bibliography$",
];

fn skip_patterns() -> &'static RegexSet {
    static SKIP: OnceLock<RegexSet> = OnceLock::new();
    SKIP.get_or_init(|| RegexSet::new(SKIP_PATTERNS).expect("skip patterns are valid regexes"))
}

/// Returns `true` when `text` is page furniture rather than prose: a page
/// number, a chapter or section marker, a date, an email, a URL or a bare
/// section name.
pub fn is_structural_marker(text: &str) -> bool {
    skip_patterns().is_match(&text.trim().to_lowercase())
}

/// Returns `true` when `text` looks like a document title.
pub fn is_likely_title(text: &str) -> bool {
    if is_structural_marker(text) {
        return false;
    }

    if text.split_whitespace().count() < MIN_WORDS {
        return false;
    }

    let total = text.chars().count();
    if total > MAX_CHARS {
        return false;
    }

    let alpha = text.chars().filter(|c| c.is_alphabetic()).count();
    (alpha as f64 / total as f64) >= MIN_ALPHA_RATIO
}
