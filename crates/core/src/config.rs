//! Pipeline configuration.
//!
//! A [`Config`] value is built once by the caller and passed into every
//! pipeline call. Nothing in the core reads configuration from the
//! environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Fraction of the page height, measured from the top edge, searched by
    /// the positional extractor.
    pub top_region_fraction: f32,
    /// Maximum distance between a line's center and the page center, as a
    /// fraction of the page width, for the line to count as centered.
    pub center_tolerance: f32,
    /// Number of distinct font sizes (largest first) examined by font analysis.
    pub font_bucket_count: usize,
    /// Number of non-empty lines scanned by the fallback extractor.
    pub fallback_line_limit: usize,
    /// Pages with less extracted text than this are sent to OCR.
    pub min_text_chars: usize,
    /// Tesseract language codes used for OCR.
    pub ocr_languages: Vec<String>,
    /// ISO-639-1 codes of title languages that get translated.
    pub translate_from: Vec<String>,
    /// ISO-639-1 code titles are translated into.
    pub target_language: String,
    /// Model identifier forwarded to the translation service, if it takes one.
    pub translation_model: Option<String>,
    /// Embedding model used by the ingestion tool that consumes renamed files.
    pub embedding_model: Option<String>,
    /// Translation endpoint. Translation is disabled when unset.
    pub translate_url: Option<String>,
    /// Seconds a translation request may take before it counts as failed.
    pub translate_timeout_secs: u64,
    /// Seconds tesseract may spend on one page before it is stopped.
    pub ocr_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            top_region_fraction: 0.3,
            center_tolerance: 0.25,
            font_bucket_count: 3,
            fallback_line_limit: 10,
            min_text_chars: 10,
            ocr_languages: vec!["eng".to_string(), "heb".to_string()],
            translate_from: vec!["he".to_string()],
            target_language: "en".to_string(),
            translation_model: None,
            embedding_model: None,
            translate_url: None,
            translate_timeout_secs: 30,
            ocr_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("`{field}` must be in (0, 1], got {value}")]
    FractionOutOfRange { field: &'static str, value: f32 },
    #[error("`{0}` must be at least 1")]
    ZeroCount(&'static str),
    #[error("`target_language` must not be empty")]
    EmptyTargetLanguage,
}

impl Config {
    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("top_region_fraction", self.top_region_fraction)?;
        check_fraction("center_tolerance", self.center_tolerance)?;

        if self.font_bucket_count == 0 {
            return Err(ConfigError::ZeroCount("font_bucket_count"));
        }
        if self.fallback_line_limit == 0 {
            return Err(ConfigError::ZeroCount("fallback_line_limit"));
        }
        if self.translate_timeout_secs == 0 {
            return Err(ConfigError::ZeroCount("translate_timeout_secs"));
        }
        if self.ocr_timeout_secs == 0 {
            return Err(ConfigError::ZeroCount("ocr_timeout_secs"));
        }
        if self.target_language.trim().is_empty() {
            return Err(ConfigError::EmptyTargetLanguage);
        }

        Ok(())
    }

    /// Whether titles in `language` (ISO-639-1) should be translated.
    pub fn should_translate(&self, language: &str) -> bool {
        self.translate_from
            .iter()
            .any(|code| code.eq_ignore_ascii_case(language))
    }
}

fn check_fraction(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { field, value })
    }
}
