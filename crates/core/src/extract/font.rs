//! Font-size clustering.
//!
//! Titles are usually set in the largest type on the first page. Glyphs are
//! bucketed by size and the largest buckets are scanned top to bottom for the
//! first line that reads like a title.

use std::collections::HashMap;

use crate::classify::is_likely_title;
use crate::config::Config;
use crate::types::{Glyph, Method, TitleExtraction};

use super::{group_lines, guarded};

/// Font analysis never claims more confidence than this.
const MAX_SCORE: f64 = 0.9;

/// Score for a title found at `size` points: larger type scores higher,
/// capped at [`MAX_SCORE`].
pub fn font_score(size: f32) -> f64 {
    (0.7 + f64::from(size) / 20.0).min(MAX_SCORE)
}

/// Extract a title from the glyphs of one page.
pub fn extract(glyphs: &[Glyph], config: &Config) -> TitleExtraction {
    guarded(Method::FontAnalysis, "Font analysis", || {
        analyze(glyphs, config.font_bucket_count)
    })
}

fn analyze(glyphs: &[Glyph], bucket_count: usize) -> TitleExtraction {
    let buckets = size_buckets(glyphs);
    if buckets.is_empty() {
        return TitleExtraction::none(Method::FontAnalysis, "No sized glyphs on page");
    }

    for (size, members) in buckets.into_iter().take(bucket_count) {
        let lines = group_lines(members, |g| g.y0);

        for mut line in lines.into_values().rev() {
            line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            let text: String = line.iter().map(|g| g.text).collect();
            let text = text.trim();

            if !text.is_empty() && is_likely_title(text) {
                return TitleExtraction::found(
                    text,
                    Method::FontAnalysis,
                    font_score(size),
                    format!("Found via font analysis (size: {size:.1})"),
                );
            }
        }
    }

    TitleExtraction::none(
        Method::FontAnalysis,
        "No suitable title found via font analysis",
    )
}

/// Group glyphs with a positive size by exact size, largest size first.
fn size_buckets(glyphs: &[Glyph]) -> Vec<(f32, Vec<&Glyph>)> {
    let mut by_size: HashMap<u32, Vec<&Glyph>> = HashMap::new();
    for glyph in glyphs.iter().filter(|g| g.size > 0.0) {
        by_size.entry(glyph.size.to_bits()).or_default().push(glyph);
    }

    let mut buckets: Vec<(f32, Vec<&Glyph>)> = by_size
        .into_iter()
        .map(|(bits, members)| (f32::from_bits(bits), members))
        .collect();
    buckets.sort_by(|a, b| b.0.total_cmp(&a.0));
    buckets
}
