use std::fmt;

use serde::Serialize;

/// One shown character.
///
/// Coordinates are PDF user space relative to the page's lower-left corner:
/// `y0` is the baseline and grows upward.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphBox {
    pub ch: char,
    /// Rendered font size in points.
    pub size: f32,
    pub x0: f32,
    pub y0: f32,
    /// Estimated advance width in points.
    pub width: f32,
}

impl GlyphBox {
    pub fn x1(&self) -> f32 {
        self.x0 + self.width
    }
}

/// A whitespace-delimited word. `top` is the baseline, measured from the
/// bottom edge like [`GlyphBox::y0`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordBox {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
}

/// Everything the title pipeline reads from one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageExtract {
    pub width: f32,
    pub height: f32,
    pub glyphs: Vec<GlyphBox>,
    pub words: Vec<WordBox>,
    /// Plain text, lines top to bottom separated by `\n`.
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    Jpeg,
    Jpeg2000,
    Png,
    Tiff,
    Unknown,
}

impl ImageFormat {
    /// File extension used when the image is written out for OCR.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Jpeg2000 => "jp2",
            ImageFormat::Png => "png",
            ImageFormat::Tiff => "tif",
            ImageFormat::Unknown => "bin",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Jpeg2000 => "jpeg2000",
            ImageFormat::Png => "png",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// An encoded image pulled out of a page.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// XObject resource name, e.g. `Im0`.
    pub name: String,
    pub format: ImageFormat,
    /// Pixel dimensions as declared by the image dictionary.
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_extension() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Unknown.extension(), "bin");
    }

    #[test]
    fn test_image_format_display() {
        assert_eq!(ImageFormat::Jpeg2000.to_string(), "jpeg2000");
        assert_eq!(ImageFormat::Tiff.to_string(), "tiff");
    }

    #[test]
    fn test_glyph_right_edge() {
        let g = GlyphBox {
            ch: 'A',
            size: 12.0,
            x0: 72.0,
            y0: 700.0,
            width: 6.0,
        };
        assert_eq!(g.x1(), 78.0);
    }
}
