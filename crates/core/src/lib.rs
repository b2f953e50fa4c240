//! Core library for titler
//!
//! This crate implements the **Functional Core** of titler, following the
//! Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! titler uses a three-crate workspace:
//!
//! - **`titler_core`** (this crate): title extraction, language planning and
//!   filename canonicalization, with zero I/O
//! - **`pdf`**: reads page geometry and scanned images out of PDF files
//! - **`titler`**: the Imperative Shell (CLI, OCR, translation, batch copy)
//!
//! ## Functional Core Principles
//!
//! - **Pure functions**: the same page always yields the same title
//! - **No side effects**: no file system, network or process access
//! - **Explicit configuration**: every tunable arrives as a [`Config`] value
//! - **Testable**: every stage is tested with hand-built pages, no PDFs needed
//!
//! # Pipeline
//!
//! ```text
//! Page + raw text ──► extract::extract_title ──► TitleExtraction
//!                        font → position → fallback
//!                                                     │
//!            normalize::plan ──► (shell translates) ──► normalize::apply
//!                                                     │
//!                                  filename::format_filename ──► "title.pdf"
//! ```
//!
//! # Module Organization
//!
//! - [`types`]: page geometry, glyphs, words and the extraction result
//! - [`classify`]: the "does this line read like a title" heuristic
//! - [`extract`]: the three extraction stages and their orchestrator
//! - [`normalize`]: language detection and the translation plan
//! - [`filename`]: title to `snake_case.pdf` conversion
//! - [`config`]: pipeline configuration and its validation
//! - [`report`]: processing log rows and the batch summary
//!
//! # Example Usage
//!
//! ```rust
//! use titler_core::{extract_title, format_filename, Config, Glyph, Page, PageGeometry};
//!
//! let glyphs: Vec<Glyph> = "Annual Report 2023 Summary"
//!     .chars()
//!     .enumerate()
//!     .map(|(i, c)| Glyph::new(c, 18.0, 200.0 + i as f32 * 9.0, 720.0))
//!     .collect();
//! let page = Page::new(PageGeometry::LETTER, glyphs, Vec::new());
//!
//! let result = extract_title(&page, "Annual Report 2023 Summary", &Config::default());
//! let name = format_filename(result.title().unwrap());
//!
//! assert_eq!(name, "annual_report_2023_summary.pdf");
//! ```

pub mod classify;
pub mod config;
pub mod extract;
pub mod filename;
pub mod normalize;
pub mod report;
pub mod types;

pub use classify::is_likely_title;
pub use config::{Config, ConfigError};
pub use extract::extract_title;
pub use filename::{dedupe_filename, format_filename};
pub use normalize::{LanguageDetector, NormalizationPlan, ScriptDetector, Translation};
pub use report::{LogRow, Status, Summary};
pub use types::{Glyph, Method, Page, PageGeometry, TitleExtraction, Word};
