//! Language normalization of an extracted title.
//!
//! Split into a pure planning step and a pure application step so the shell
//! can run the (network-bound) translation in between:
//!
//! ```text
//! title -> plan() -> NormalizationPlan -> [translate] -> apply() -> TitleExtraction
//! ```
//!
//! Normalization never discards a title. Detection or translation failures
//! keep the original text and record the failure in the explanation.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::types::TitleExtraction;

/// An ISO-639-1 language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Language(String);

impl Language {
    pub fn new(code: impl Into<String>) -> Self {
        Language(code.into().to_ascii_lowercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// English name for explanations, falling back to the code.
    pub fn name(&self) -> &str {
        match self.0.as_str() {
            "he" => "Hebrew",
            "ar" => "Arabic",
            "el" => "Greek",
            "ru" => "Russian",
            "zh" => "Chinese",
            "ja" => "Japanese",
            "ko" => "Korean",
            "th" => "Thai",
            "en" => "English",
            other => other,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("no letters to detect a language from")]
    NoLetters,
    #[error("{0}")]
    Backend(String),
}

/// Detects the language of a short piece of text.
pub trait LanguageDetector {
    fn detect(&self, text: &str) -> Result<Language, DetectError>;
}

// ---------------------------------------------------------------------------
// Script-based detection
// ---------------------------------------------------------------------------

/// Share of letters a non-Latin script needs before the text is attributed
/// to it. Mixed titles ("דוח 2023 Annual") still count as the non-Latin one.
const SCRIPT_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Script {
    Hebrew,
    Arabic,
    Greek,
    Cyrillic,
    Han,
    Kana,
    Hangul,
    Thai,
}

impl Script {
    const ALL: [Script; 8] = [
        Script::Hebrew,
        Script::Arabic,
        Script::Greek,
        Script::Cyrillic,
        Script::Han,
        Script::Kana,
        Script::Hangul,
        Script::Thai,
    ];

    fn of(c: char) -> Option<Script> {
        match c {
            '\u{0590}'..='\u{05FF}' | '\u{FB1D}'..='\u{FB4F}' => Some(Script::Hebrew),
            '\u{0600}'..='\u{06FF}'
            | '\u{0750}'..='\u{077F}'
            | '\u{08A0}'..='\u{08FF}'
            | '\u{FB50}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}' => Some(Script::Arabic),
            '\u{0370}'..='\u{03FF}' | '\u{1F00}'..='\u{1FFF}' => Some(Script::Greek),
            '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}' => Some(Script::Cyrillic),
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}' => {
                Some(Script::Han)
            }
            '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' => {
                Some(Script::Kana)
            }
            '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}' => {
                Some(Script::Hangul)
            }
            '\u{0E00}'..='\u{0E7F}' => Some(Script::Thai),
            _ => None,
        }
    }

    fn language(self) -> &'static str {
        match self {
            Script::Hebrew => "he",
            Script::Arabic => "ar",
            Script::Greek => "el",
            Script::Cyrillic => "ru",
            Script::Han => "zh",
            Script::Kana => "ja",
            Script::Hangul => "ko",
            Script::Thai => "th",
        }
    }
}

/// Detects language from the Unicode script of the letters.
///
/// Scripts map to their dominant language (Cyrillic to Russian, Han to
/// Chinese). Latin-script text is reported as English: the corpus this tool
/// renames is English and Hebrew, and only Hebrew is translated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptDetector;

impl LanguageDetector for ScriptDetector {
    fn detect(&self, text: &str) -> Result<Language, DetectError> {
        let mut counts: HashMap<Script, usize> = HashMap::new();
        let mut letters = 0usize;

        for c in text.chars().filter(|c| c.is_alphabetic()) {
            letters += 1;
            if let Some(script) = Script::of(c) {
                *counts.entry(script).or_default() += 1;
            }
        }

        if letters == 0 {
            return Err(DetectError::NoLetters);
        }

        // Japanese mixes kana with Han; any kana at all decides it.
        if counts.contains_key(&Script::Kana) {
            return Ok(Language::new(Script::Kana.language()));
        }

        let dominant = Script::ALL
            .into_iter()
            .map(|script| (script, counts.get(&script).copied().unwrap_or(0)))
            .filter(|&(_, count)| count as f64 / letters as f64 > SCRIPT_THRESHOLD)
            .max_by_key(|&(_, count)| count);

        Ok(match dominant {
            Some((script, _)) => Language::new(script.language()),
            None => Language::new("en"),
        })
    }
}

// ---------------------------------------------------------------------------
// Plan / apply
// ---------------------------------------------------------------------------

/// What should happen to a title before it is turned into a filename.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationPlan {
    /// Keep the title as is.
    Keep { language: Language },
    /// Translate the title from `from` into `to`.
    Translate { from: Language, to: Language },
    /// The language could not be determined; keep the title.
    DetectionFailed { reason: String },
}

/// Outcome of the translation requested by a [`NormalizationPlan::Translate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// Translation was disabled by the caller.
    Skipped,
    Translated(String),
    Failed(String),
}

/// Decide whether `title` needs translating.
pub fn plan(title: &str, detector: &dyn LanguageDetector, config: &Config) -> NormalizationPlan {
    match detector.detect(title) {
        Ok(language) if config.should_translate(language.code()) => NormalizationPlan::Translate {
            from: language,
            to: Language::new(config.target_language.as_str()),
        },
        Ok(language) => NormalizationPlan::Keep { language },
        Err(e) => NormalizationPlan::DetectionFailed {
            reason: e.to_string(),
        },
    }
}

/// Apply a plan and the translation outcome to an extraction result.
///
/// Only `title` and `explanation` can change; `score` and `method` are
/// preserved.
pub fn apply(
    mut result: TitleExtraction,
    plan: &NormalizationPlan,
    translation: Translation,
) -> TitleExtraction {
    if !result.has_title() {
        return result;
    }

    match plan {
        NormalizationPlan::Keep { .. } => {}
        NormalizationPlan::DetectionFailed { reason } => {
            result.append_explanation(&format!("Language detection failed: {reason}"));
        }
        NormalizationPlan::Translate { from, .. } => match translation {
            Translation::Translated(text) if !text.trim().is_empty() => {
                result.replace_title(text.trim().to_string());
                result.append_explanation(&format!("Translated from {}", from.name()));
            }
            Translation::Translated(_) => {
                result.append_explanation("Translation failed: translator returned empty text");
            }
            Translation::Failed(reason) => {
                result.append_explanation(&format!("Translation failed: {reason}"));
            }
            Translation::Skipped => {
                result.append_explanation(&format!(
                    "Translation skipped ({} title)",
                    from.name()
                ));
            }
        },
    }

    result
}
