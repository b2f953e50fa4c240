//! Per-character geometry from a page's content stream.
//!
//! A small PDF text-state machine walks the operators and places every shown
//! character as a [`GlyphBox`]. Glyph runs are then arranged into lines,
//! which yield the page's words and plain text.
//!
//! ```text
//! content ops -> runs -> lines -> { glyphs, words, text }
//! ```
//!
//! Widths come from a fixed ratio of the font size rather than the font's
//! widths array, so x extents are estimates.

use super::backend::{ContentOp, Operand, PageBox, PageId, PdfBackend};
use crate::cleanup::{normalize_fragment, tidy_page_text};
use crate::types::{GlyphBox, PageExtract, WordBox};
use crate::PdfError;

/// Advance width of one character as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Runs whose baselines differ by at most this many points share a line.
const Y_TOLERANCE: f32 = 1.0;

/// Horizontal gap (points) between two runs that reads as a word break.
const MIN_WORD_GAP: f32 = 1.5;

/// A `TJ` adjustment wider than this fraction of a character is a word break.
const KERN_SPACE_RATIO: f32 = 0.3;

/// Row-vector affine matrix `[a b c d e f]`, as in the PDF reference.
type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m × n`: a point is transformed by `m` first, then by `n`.
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn matrix_from(operands: &[Operand]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = operand.number()?;
    }
    Some(m)
}

/// Scripts written without spaces between words.
fn is_spaceless(c: char) -> bool {
    matches!(c,
        '\u{0E00}'..='\u{0E7F}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}')
}

// ---------------------------------------------------------------------------
// Text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    ctm: Matrix,
    saved_ctm: Vec<Matrix>,
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            ctm: IDENTITY,
            saved_ctm: Vec::new(),
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Text space to user space.
    fn rendering_matrix(&self) -> Matrix {
        multiply(&self.text_matrix, &self.ctm)
    }

    /// User-space position of the next glyph's baseline origin.
    fn origin(&self) -> (f32, f32) {
        let m = self.rendering_matrix();
        (m[4] + self.rise * m[2], m[5] + self.rise * m[3])
    }

    fn rendered_size(&self) -> f32 {
        let m = self.rendering_matrix();
        (self.font_size * m[1].hypot(m[3])).abs()
    }

    /// User-space length of one horizontal text-space unit.
    fn horizontal_unit(&self) -> f32 {
        let m = self.rendering_matrix();
        m[0].hypot(m[1])
    }

    fn glyph_width(&self) -> f32 {
        (self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale).abs()
    }

    /// Text-space advance after showing `ch`.
    fn advance_for(&self, ch: char) -> f32 {
        let word = if ch == ' ' { self.word_spacing } else { 0.0 };
        (self.font_size * APPROX_CHAR_WIDTH_RATIO + self.char_spacing + word) * self.horiz_scale
    }

    fn advance(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn glyph(&self, ch: char) -> GlyphBox {
        let (x0, y0) = self.origin();
        GlyphBox {
            ch,
            size: self.rendered_size(),
            x0,
            y0,
            width: self.glyph_width() * self.horizontal_unit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Content walk
// ---------------------------------------------------------------------------

/// Glyphs painted by one text-showing operator.
#[derive(Debug, Clone, Default, PartialEq)]
struct Run {
    glyphs: Vec<GlyphBox>,
}

impl Run {
    fn y(&self) -> f32 {
        self.glyphs.first().map(|g| g.y0).unwrap_or(0.0)
    }

    fn x0(&self) -> f32 {
        self.glyphs
            .iter()
            .map(|g| g.x0)
            .fold(f32::INFINITY, f32::min)
    }

    fn has_ink(&self) -> bool {
        self.glyphs.iter().any(|g| !g.ch.is_whitespace())
    }
}

struct Walker<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
    state: TextState,
    runs: Vec<Run>,
}

impl<'a> Walker<'a> {
    fn new(backend: &'a dyn PdfBackend, page: PageId) -> Self {
        Self {
            backend,
            page,
            state: TextState::default(),
            runs: Vec::new(),
        }
    }

    fn decode(&self, operand: &Operand) -> String {
        match operand {
            Operand::Str(bytes) => {
                normalize_fragment(&self.backend.decode_text(self.page, &self.state.font_key, bytes))
            }
            _ => String::new(),
        }
    }

    fn show(&mut self, text: &str, run: &mut Run) {
        for ch in text.chars() {
            run.glyphs.push(self.state.glyph(ch));
            let dx = self.state.advance_for(ch);
            self.state.advance(dx);
        }
    }

    fn show_string(&mut self, operand: &Operand) {
        let text = self.decode(operand);
        let mut run = Run::default();
        self.show(&text, &mut run);
        self.push(run);
    }

    /// `TJ`: strings interleaved with adjustments in thousandths of a text
    /// space unit; negative values move right.
    fn show_array(&mut self, items: &[Operand]) {
        let mut run = Run::default();
        for item in items {
            if let Some(adjust) = item.number() {
                let dx = -adjust / 1000.0 * self.state.font_size * self.state.horiz_scale;
                let ends_in_space = run.glyphs.last().is_none_or(|g| g.ch.is_whitespace());
                if dx > self.state.glyph_width() * KERN_SPACE_RATIO && !ends_in_space {
                    let mut space = self.state.glyph(' ');
                    space.width = dx * self.state.horizontal_unit();
                    run.glyphs.push(space);
                }
                self.state.advance(dx);
            } else {
                let text = self.decode(item);
                self.show(&text, &mut run);
            }
        }
        self.push(run);
    }

    fn push(&mut self, run: Run) {
        if !run.glyphs.is_empty() {
            self.runs.push(run);
        }
    }

    fn apply(&mut self, op: &ContentOp) {
        let operands = op.operands.as_slice();
        let first = operands.first().and_then(Operand::number);

        match op.operator.as_str() {
            "q" => self.state.saved_ctm.push(self.state.ctm),
            "Q" => {
                if let Some(ctm) = self.state.saved_ctm.pop() {
                    self.state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from(operands) {
                    self.state.ctm = multiply(&m, &self.state.ctm);
                }
            }

            "BT" => {
                self.state.text_matrix = IDENTITY;
                self.state.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let [Operand::Name(key), size, ..] = operands {
                    self.state.font_key = key.clone();
                    self.state.font_size = size.number().unwrap_or(0.0);
                }
            }
            "Tm" => {
                if let Some(m) = matrix_from(operands) {
                    self.state.text_matrix = m;
                    self.state.line_matrix = m;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty, ..] = operands {
                    let tx = tx.number().unwrap_or(0.0);
                    let ty = ty.number().unwrap_or(0.0);
                    if op.operator == "TD" {
                        self.state.leading = -ty;
                    }
                    self.state.translate_line(tx, ty);
                }
            }
            "T*" => self.state.next_line(),
            "TL" => self.state.leading = first.unwrap_or(self.state.leading),
            "Tc" => self.state.char_spacing = first.unwrap_or(self.state.char_spacing),
            "Tw" => self.state.word_spacing = first.unwrap_or(self.state.word_spacing),
            "Tz" => {
                if let Some(percent) = first {
                    self.state.horiz_scale = percent / 100.0;
                }
            }
            "Ts" => self.state.rise = first.unwrap_or(self.state.rise),

            "Tj" => {
                if let Some(s) = operands.first() {
                    self.show_string(s);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(items)) = operands.first() {
                    self.show_array(items);
                }
            }
            "'" => {
                self.state.next_line();
                if let Some(s) = operands.first() {
                    self.show_string(s);
                }
            }
            "\"" => {
                if let [aw, ac, s, ..] = operands {
                    self.state.word_spacing = aw.number().unwrap_or(self.state.word_spacing);
                    self.state.char_spacing = ac.number().unwrap_or(self.state.char_spacing);
                    self.state.next_line();
                    self.show_string(s);
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Line assembly
// ---------------------------------------------------------------------------

/// Glyphs sharing a baseline, left to right, with a synthetic space glyph
/// wherever two runs are separated by a visible gap.
#[derive(Debug, Clone, PartialEq)]
struct Line {
    y: f32,
    glyphs: Vec<GlyphBox>,
}

impl Line {
    fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch).collect()
    }

    fn words(&self) -> Vec<WordBox> {
        self.glyphs
            .split(|g| g.ch.is_whitespace())
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| WordBox {
                text: chunk.iter().map(|g| g.ch).collect(),
                x0: chunk.iter().map(|g| g.x0).fold(f32::INFINITY, f32::min),
                x1: chunk.iter().map(GlyphBox::x1).fold(f32::NEG_INFINITY, f32::max),
                top: self.y,
            })
            .collect()
    }
}

fn arrange(runs: Vec<Run>) -> Vec<Line> {
    let mut runs: Vec<Run> = runs.into_iter().filter(Run::has_ink).collect();
    runs.sort_by(|a, b| b.y().total_cmp(&a.y()).then(a.x0().total_cmp(&b.x0())));

    let mut grouped: Vec<Vec<Run>> = Vec::new();
    for run in runs {
        match grouped.last_mut() {
            Some(line) if (line[0].y() - run.y()).abs() <= Y_TOLERANCE => line.push(run),
            _ => grouped.push(vec![run]),
        }
    }

    grouped.into_iter().map(join_runs).collect()
}

fn join_runs(mut runs: Vec<Run>) -> Line {
    runs.sort_by(|a, b| a.x0().total_cmp(&b.x0()));
    let y = runs.first().map(Run::y).unwrap_or(0.0);

    let mut glyphs: Vec<GlyphBox> = Vec::new();
    for run in runs {
        let gap_space = match (glyphs.last(), run.glyphs.first()) {
            (Some(prev), Some(next))
                if next.x0 - prev.x1() >= MIN_WORD_GAP
                    && !prev.ch.is_whitespace()
                    && !next.ch.is_whitespace()
                    && !(is_spaceless(prev.ch) && is_spaceless(next.ch)) =>
            {
                Some(GlyphBox {
                    ch: ' ',
                    size: prev.size,
                    x0: prev.x1(),
                    y0: prev.y0,
                    width: next.x0 - prev.x1(),
                })
            }
            _ => None,
        };
        glyphs.extend(gap_space);
        glyphs.extend(run.glyphs);
    }

    Line { y, glyphs }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk one page and collect its glyphs, words and plain text.
///
/// Coordinates are shifted so the MediaBox's lower-left corner is the
/// origin.
pub fn extract_page(backend: &dyn PdfBackend, page: PageId) -> Result<PageExtract, PdfError> {
    let page_box = backend.page_box(page)?;
    let raw = backend.page_content(page)?;
    let ops = backend.decode_content(&raw)?;

    let mut walker = Walker::new(backend, page);
    for op in &ops {
        walker.apply(op);
    }

    let runs = walker
        .runs
        .into_iter()
        .map(|run| relative_to(run, &page_box))
        .collect();
    let lines = arrange(runs);

    let text = lines.iter().map(Line::text).collect::<Vec<_>>().join("\n");
    log::debug!(
        "page {:?}: {} ops, {} lines",
        page,
        ops.len(),
        lines.len()
    );

    Ok(PageExtract {
        width: page_box.width,
        height: page_box.height,
        words: lines.iter().flat_map(Line::words).collect(),
        glyphs: lines.into_iter().flat_map(|l| l.glyphs).collect(),
        text: tidy_page_text(&text),
    })
}

fn relative_to(mut run: Run, page_box: &PageBox) -> Run {
    for glyph in &mut run.glyphs {
        glyph.x0 -= page_box.left;
        glyph.y0 -= page_box.bottom;
    }
    run
}
