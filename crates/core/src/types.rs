use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of characters kept in [`TitleExtraction::original_text_sample`].
pub const SAMPLE_CHARS: usize = 50;

// ---------------------------------------------------------------------------
// Page geometry
// ---------------------------------------------------------------------------

/// A single rendered character.
///
/// Coordinates use PDF user space: origin at the bottom-left corner, `y0`
/// grows upward, so a larger `y0` is higher on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub text: char,
    pub size: f32,
    pub x0: f32,
    pub y0: f32,
}

impl Glyph {
    pub fn new(text: char, size: f32, x0: f32, y0: f32) -> Self {
        Self { text, size, x0, y0 }
    }
}

/// A whitespace-delimited word with its horizontal extent.
///
/// `top` is the baseline measured from the bottom edge of the page (same
/// convention as [`Glyph::y0`]), so the top region of the page is where
/// `top` approaches the page height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
}

impl Word {
    pub fn new(text: impl Into<String>, x0: f32, x1: f32, top: f32) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    width: f32,
    height: f32,
}

impl PageGeometry {
    /// US Letter, used when a page carries text but no usable MediaBox.
    pub const LETTER: Self = PageGeometry {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f32, height: f32) -> Result<Self, GeometryError> {
        if !width.is_finite() || width <= 0.0 {
            return Err(GeometryError::InvalidWidth(width));
        }
        if !height.is_finite() || height <= 0.0 {
            return Err(GeometryError::InvalidHeight(height));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

/// One page worth of layout data, validated once when it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    geometry: PageGeometry,
    glyphs: Vec<Glyph>,
    words: Vec<Word>,
}

impl Page {
    /// Build a page from collaborator output.
    ///
    /// Glyphs with non-finite coordinates or a negative size, and words with
    /// non-finite coordinates or blank text, are dropped here so the
    /// extractors can trust every record they see.
    pub fn new(geometry: PageGeometry, glyphs: Vec<Glyph>, words: Vec<Word>) -> Self {
        let glyphs = glyphs
            .into_iter()
            .filter(|g| {
                g.size.is_finite() && g.size >= 0.0 && g.x0.is_finite() && g.y0.is_finite()
            })
            .collect();
        let words = words
            .into_iter()
            .filter(|w| {
                !w.text.trim().is_empty()
                    && w.x0.is_finite()
                    && w.x1.is_finite()
                    && w.top.is_finite()
            })
            .collect();

        Self {
            geometry,
            glyphs,
            words,
        }
    }

    /// A page with no layout information at all (scanned pages, OCR input).
    pub fn text_only() -> Self {
        Self {
            geometry: PageGeometry::LETTER,
            glyphs: Vec::new(),
            words: Vec::new(),
        }
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Page width must be a positive number, got {0}")]
    InvalidWidth(f32),
    #[error("Page height must be a positive number, got {0}")]
    InvalidHeight(f32),
}

// ---------------------------------------------------------------------------
// Extraction result
// ---------------------------------------------------------------------------

/// Which stage produced a [`TitleExtraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    FontAnalysis,
    PositionAnalysisCentered,
    PositionAnalysisTop,
    PositionAnalysis,
    FallbackValidated,
    FallbackFirstLine,
    Fallback,
    OcrFailed,
    Error,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::FontAnalysis => "font_analysis",
            Method::PositionAnalysisCentered => "position_analysis_centered",
            Method::PositionAnalysisTop => "position_analysis_top",
            Method::PositionAnalysis => "position_analysis",
            Method::FallbackValidated => "fallback_validated",
            Method::FallbackFirstLine => "fallback_first_line",
            Method::Fallback => "fallback",
            Method::OcrFailed => "ocr_failed",
            Method::Error => "error",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one extraction attempt.
///
/// Every stage returns one of these, successful or not, so the orchestrator
/// can always compare results by score. After construction only language
/// normalization touches it, replacing the title and extending `explanation`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleExtraction {
    title: Option<String>,
    method: Method,
    score: f64,
    explanation: String,
    original_text_sample: String,
}

impl TitleExtraction {
    /// A successful extraction.
    ///
    /// A blank `title` is demoted to a null result with score 0, keeping the
    /// "a present title is never blank" rule in one place.
    pub fn found(
        title: impl Into<String>,
        method: Method,
        score: f64,
        explanation: impl Into<String>,
    ) -> Self {
        let title = title.into();
        if title.trim().is_empty() {
            return Self::none(method, "Candidate title was blank");
        }

        let original_text_sample = sample(&title);
        Self {
            title: Some(title),
            method,
            score: score.clamp(0.0, 1.0),
            explanation: non_empty(explanation.into()),
            original_text_sample,
        }
    }

    /// A stage that ran but did not find a title.
    pub fn none(method: Method, explanation: impl Into<String>) -> Self {
        Self {
            title: None,
            method,
            score: 0.0,
            explanation: non_empty(explanation.into()),
            original_text_sample: String::new(),
        }
    }

    /// The page produced no usable text and OCR could not recover any.
    pub fn ocr_failed(reason: impl fmt::Display) -> Self {
        Self::none(Method::OcrFailed, format!("OCR failed: {reason}"))
    }

    /// Processing of the file failed before extraction could run.
    pub fn error(reason: impl fmt::Display) -> Self {
        Self::none(Method::Error, reason.to_string())
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn has_title(&self) -> bool {
        self.title.is_some()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn original_text_sample(&self) -> &str {
        &self.original_text_sample
    }

    pub(crate) fn append_explanation(&mut self, note: &str) {
        self.explanation.push_str(" | ");
        self.explanation.push_str(note);
    }

    pub(crate) fn replace_title(&mut self, title: String) {
        self.title = Some(title);
    }
}

fn sample(text: &str) -> String {
    text.chars().take(SAMPLE_CHARS).collect()
}

fn non_empty(explanation: String) -> String {
    if explanation.trim().is_empty() {
        "No explanation available".to_string()
    } else {
        explanation
    }
}
