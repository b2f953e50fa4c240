//! Positional analysis.
//!
//! Looks for title-like lines in the top region of the page, preferring
//! lines whose horizontal center sits close to the page center.

use crate::classify::is_likely_title;
use crate::config::Config;
use crate::types::{Method, Page, PageGeometry, TitleExtraction, Word};

use super::{group_lines, guarded, key_to_y};

const CENTERED_SCORE: f64 = 0.8;
const TOP_SCORE: f64 = 0.6;

/// A line of words assembled from the top region.
#[derive(Debug, Clone, PartialEq)]
struct WordLine {
    y: f64,
    text: String,
    x0: f32,
    x1: f32,
}

impl WordLine {
    fn center(&self) -> f32 {
        self.x0 + (self.x1 - self.x0) / 2.0
    }

    fn is_centered(&self, geometry: PageGeometry, tolerance: f32) -> bool {
        let page_center = geometry.width() / 2.0;
        (self.center() - page_center).abs() <= geometry.width() * tolerance
    }
}

/// Extract a title from the words of one page.
pub fn extract(page: &Page, config: &Config) -> TitleExtraction {
    guarded(Method::PositionAnalysis, "Position analysis", || {
        analyze(page, config)
    })
}

fn analyze(page: &Page, config: &Config) -> TitleExtraction {
    if page.words().is_empty() {
        return TitleExtraction::none(Method::PositionAnalysis, "No words on page");
    }

    let geometry = page.geometry();
    let lines = top_region_lines(page.words(), geometry, config.top_region_fraction);
    let candidates: Vec<&WordLine> = lines.iter().filter(|l| is_likely_title(&l.text)).collect();

    if let Some(line) = candidates
        .iter()
        .find(|l| l.is_centered(geometry, config.center_tolerance))
    {
        return TitleExtraction::found(
            line.text.clone(),
            Method::PositionAnalysisCentered,
            CENTERED_SCORE,
            format!("Centered text in top region (y: {:.0})", line.y),
        );
    }

    if let Some(line) = candidates.first() {
        return TitleExtraction::found(
            line.text.clone(),
            Method::PositionAnalysisTop,
            TOP_SCORE,
            format!("Top region text (y: {:.0})", line.y),
        );
    }

    TitleExtraction::none(
        Method::PositionAnalysis,
        "No suitable title found via position analysis",
    )
}

/// Lines built from the words in the top `fraction` of the page, ordered top
/// to bottom.
///
/// `top` grows upward, so the top region is `top >= height * (1 - fraction)`.
fn top_region_lines(words: &[Word], geometry: PageGeometry, fraction: f32) -> Vec<WordLine> {
    let threshold = geometry.height() * (1.0 - fraction);
    let lines = group_lines(words.iter().filter(|w| w.top >= threshold), |w| w.top);

    lines
        .into_iter()
        .rev()
        .filter_map(|(key, mut members)| {
            members.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            let text = members
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let text = text.trim().to_string();
            if text.is_empty() {
                return None;
            }

            let x0 = members.iter().map(|w| w.x0).fold(f32::INFINITY, f32::min);
            let x1 = members.iter().map(|w| w.x1).fold(f32::NEG_INFINITY, f32::max);
            Some(WordLine {
                y: key_to_y(key),
                text,
                x0,
                x1,
            })
        })
        .collect()
}
