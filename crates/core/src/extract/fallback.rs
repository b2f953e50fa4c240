//! Line-based fallback for pages without usable layout data.
//!
//! Works on plain text (extracted or OCR'd), so it is the only stage that
//! still runs on scanned documents.

use crate::classify::{is_likely_title, is_structural_marker};
use crate::config::Config;
use crate::types::{Method, TitleExtraction};

use super::guarded;

/// Titles longer than this are cut and suffixed with [`ELLIPSIS`].
pub const MAX_TITLE_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

const FIRST_LINE_SCORE: f64 = 0.5;
const LINE_PENALTY: f64 = 0.05;
const MIN_SCORE: f64 = 0.1;

/// Score for a validated title found on line `index` (0-based).
pub fn line_score(index: usize) -> f64 {
    (FIRST_LINE_SCORE - index as f64 * LINE_PENALTY).max(MIN_SCORE)
}

/// Extract a title from plain page text.
pub fn extract(text: &str, config: &Config) -> TitleExtraction {
    guarded(Method::Fallback, "Fallback extraction", || {
        analyze(text, config.fallback_line_limit)
    })
}

fn analyze(text: &str, line_limit: usize) -> TitleExtraction {
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if let Some((index, line)) = lines
        .iter()
        .take(line_limit)
        .enumerate()
        .find(|(_, l)| is_likely_title(l))
    {
        return TitleExtraction::found(
            truncate(line),
            Method::FallbackValidated,
            line_score(index),
            format!("Validated title from line {}", index + 1),
        );
    }

    match lines.first() {
        Some(first) if !is_structural_marker(first) => TitleExtraction::found(
            truncate(first),
            Method::FallbackFirstLine,
            MIN_SCORE,
            "Used first line as last resort",
        ),
        Some(_) => TitleExtraction::none(
            Method::Fallback,
            "First line is a page marker, not a title",
        ),
        None => TitleExtraction::none(Method::Fallback, "No text found for fallback extraction"),
    }
}

fn truncate(line: &str) -> String {
    if line.chars().count() <= MAX_TITLE_CHARS {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(MAX_TITLE_CHARS).collect();
    cut.push_str(ELLIPSIS);
    cut
}
