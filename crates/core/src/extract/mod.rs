//! Title extraction.
//!
//! Three independent strategies run in a fixed priority order:
//!
//! ```text
//! TryFont  ->  TryPosition  ->  TryFallback  ->  Done
//!   glyphs       words+page       raw text
//! ```
//!
//! The first stage that produces a title wins, regardless of how a later
//! stage would have scored. When every stage comes up empty, the attempt with
//! the highest score is returned; on a tie the latest attempt wins, so a total
//! failure reports the last stage that ran.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use log::debug;

use crate::config::Config;
use crate::types::{Method, Page, TitleExtraction};

pub mod fallback;
pub mod font;
pub mod position;

/// One state of the extraction chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Font,
    Position,
    Fallback,
}

impl Stage {
    /// Stages in priority order.
    pub const ALL: [Stage; 3] = [Stage::Font, Stage::Position, Stage::Fallback];

    fn run(self, page: &Page, raw_text: &str, config: &Config) -> TitleExtraction {
        match self {
            Stage::Font => font::extract(page.glyphs(), config),
            Stage::Position => position::extract(page, config),
            Stage::Fallback => fallback::extract(raw_text, config),
        }
    }
}

/// Extract a title from one page.
///
/// Never fails: every stage reports through a [`TitleExtraction`], and a
/// score of 0 with no title means nothing on the page looked like a title.
pub fn extract_title(page: &Page, raw_text: &str, config: &Config) -> TitleExtraction {
    let mut attempts = Vec::with_capacity(Stage::ALL.len());

    for stage in Stage::ALL {
        let result = stage.run(page, raw_text, config);
        debug!(
            "{:?} stage: method={} score={:.2} title={:?} ({})",
            stage,
            result.method(),
            result.score(),
            result.title(),
            result.explanation()
        );

        if result.has_title() {
            return result;
        }
        attempts.push(result);
    }

    best_attempt(attempts)
}

/// Highest score wins; later attempts win ties.
fn best_attempt(attempts: Vec<TitleExtraction>) -> TitleExtraction {
    attempts
        .into_iter()
        .reduce(|best, next| if next.score() >= best.score() { next } else { best })
        .unwrap_or_else(|| TitleExtraction::none(Method::Error, "No extraction stage ran"))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Line key for a vertical coordinate rounded to one decimal.
///
/// Keys are integers (tenths of a point) so they can live in a `BTreeMap`;
/// iterating the map in reverse walks the page top to bottom.
pub(crate) fn line_key(y: f32) -> i64 {
    (f64::from(y) * 10.0).round() as i64
}

/// Inverse of [`line_key`], for explanations.
pub(crate) fn key_to_y(key: i64) -> f64 {
    key as f64 / 10.0
}

/// Group items into lines keyed by their rounded vertical coordinate.
pub(crate) fn group_lines<T>(
    items: impl IntoIterator<Item = T>,
    y: impl Fn(&T) -> f32,
) -> BTreeMap<i64, Vec<T>> {
    let mut lines: BTreeMap<i64, Vec<T>> = BTreeMap::new();
    for item in items {
        lines.entry(line_key(y(&item))).or_default().push(item);
    }
    lines
}

/// Run an extractor body, turning a panic into a score-0 null result.
pub(crate) fn guarded(
    method: Method,
    label: &str,
    body: impl FnOnce() -> TitleExtraction,
) -> TitleExtraction {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown error".to_string());
            TitleExtraction::none(method, format!("{label} failed: {reason}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Glyph, PageGeometry, Word};

    // -- Helpers for building test data -------------------------------------

    fn glyph_line(text: &str, size: f32, x: f32, y: f32) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, c)| Glyph::new(c, size, x + i as f32 * size * 0.5, y))
            .collect()
    }

    fn word_line(text: &str, x: f32, top: f32) -> Vec<Word> {
        let mut cursor = x;
        text.split_whitespace()
            .map(|w| {
                let width = w.chars().count() as f32 * 6.0;
                let word = Word::new(w, cursor, cursor + width, top);
                cursor += width + 6.0;
                word
            })
            .collect()
    }

    fn page(glyphs: Vec<Glyph>, words: Vec<Word>) -> Page {
        Page::new(PageGeometry::new(612.0, 792.0).unwrap(), glyphs, words)
    }

    // -- Orchestration ------------------------------------------------------

    #[test]
    fn test_font_result_wins_by_priority() {
        // Font analysis at size 2 scores 0.8, no better than the centered
        // top line. Priority decides, not score.
        let glyphs = glyph_line("Tiny Font Title Here", 2.0, 20.0, 100.0);
        let words = word_line("Centered Position Based Title", 230.0, 760.0);
        let result = extract_title(&page(glyphs, words), "", &Config::default());

        assert_eq!(result.method(), Method::FontAnalysis);
        assert_eq!(result.title(), Some("Tiny Font Title Here"));
    }

    #[test]
    fn test_position_runs_when_font_finds_nothing() {
        let glyphs = glyph_line("Page 1", 20.0, 20.0, 760.0);
        let words = word_line("Centered Position Based Title", 230.0, 760.0);
        let result = extract_title(&page(glyphs, words), "", &Config::default());

        assert_eq!(result.method(), Method::PositionAnalysisCentered);
        assert_eq!(result.title(), Some("Centered Position Based Title"));
        assert!((result.score() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_runs_last() {
        let result = extract_title(
            &Page::text_only(),
            "3\nA Study of Fallback Behaviour\nmore text",
            &Config::default(),
        );

        assert_eq!(result.method(), Method::FallbackValidated);
        assert_eq!(result.title(), Some("A Study of Fallback Behaviour"));
        assert!((result.score() - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_total_failure_reports_last_stage() {
        let result = extract_title(&Page::text_only(), "", &Config::default());

        assert!(result.title().is_none());
        assert_eq!(result.score(), 0.0);
        assert_eq!(result.method(), Method::Fallback);
    }

    #[test]
    fn test_page_marker_only_is_null() {
        let result = extract_title(&Page::text_only(), "Page 3", &Config::default());

        assert!(result.title().is_none());
        assert_eq!(result.score(), 0.0);
        assert_eq!(result.method(), Method::Fallback);
    }

    #[test]
    fn test_short_line_used_as_last_resort() {
        let result = extract_title(&Page::text_only(), "Memo\nQ3", &Config::default());

        assert_eq!(result.method(), Method::FallbackFirstLine);
        assert_eq!(result.title(), Some("Memo"));
        assert!((result.score() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_no_glyphs_no_words_blank_text_is_null() {
        let result = extract_title(&Page::text_only(), "  \n\n   ", &Config::default());

        assert!(result.title().is_none());
        assert_eq!(result.score(), 0.0);
        assert_eq!(result.method(), Method::Fallback);
        assert!(!result.explanation().is_empty());
    }

    #[test]
    fn test_best_attempt_prefers_latest_on_tie() {
        let attempts = vec![
            TitleExtraction::none(Method::FontAnalysis, "a"),
            TitleExtraction::none(Method::PositionAnalysis, "b"),
        ];
        assert_eq!(best_attempt(attempts).method(), Method::PositionAnalysis);
    }

    #[test]
    fn test_best_attempt_empty() {
        assert_eq!(best_attempt(Vec::new()).method(), Method::Error);
    }

    #[test]
    fn test_annual_report_end_to_end() {
        let mut glyphs = glyph_line("Annual Report 2023 Summary", 18.0, 189.0, 720.0);
        glyphs.extend(glyph_line("Prepared by the finance team", 10.0, 72.0, 650.0));
        let result = extract_title(&page(glyphs, Vec::new()), "", &Config::default());

        assert_eq!(result.title(), Some("Annual Report 2023 Summary"));
        assert_eq!(result.method(), Method::FontAnalysis);
        assert!((result.score() - 0.9).abs() < 1e-9);
        assert_eq!(
            crate::filename::format_filename(result.title().unwrap()),
            "annual_report_2023_summary.pdf"
        );
    }

    // -- Helpers ------------------------------------------------------------

    #[test]
    fn test_line_key_rounds_to_one_decimal() {
        assert_eq!(line_key(700.04), 7000);
        assert_eq!(line_key(700.06), 7001);
        assert_eq!(key_to_y(7001), 700.1);
    }

    #[test]
    fn test_guarded_converts_panic() {
        let result = guarded(Method::FontAnalysis, "Font analysis", || {
            panic!("boom");
        });
        assert!(result.title().is_none());
        assert_eq!(result.score(), 0.0);
        assert_eq!(result.explanation(), "Font analysis failed: boom");
    }
}
