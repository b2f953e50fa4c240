//! Page geometry and scanned-image extraction for PDF files.
//!
//! Only the first page matters to the title pipeline, so the API is built
//! around it: [`PageGeometrySource::first_page`] returns the glyphs, words
//! and plain text of that page, and [`PageGeometrySource::largest_page_image`]
//! returns the image an OCR engine should read when the page has no text
//! layer.

use thiserror::Error;

use parser::backend::{LopdfBackend, PageId, PdfBackend};

pub mod cleanup;
pub mod parser;
pub mod scan;
pub mod types;

pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Document has no pages")]
    NoPages,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A loaded PDF that page data can be read from.
pub struct PageGeometrySource {
    backend: LopdfBackend,
}

impl PageGeometrySource {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        Ok(Self {
            backend: LopdfBackend::load_bytes(bytes)?,
        })
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    /// Glyphs, words, dimensions and plain text of the first page.
    pub fn first_page(&self) -> Result<PageExtract, PdfError> {
        parser::glyphs::extract_page(&self.backend, self.first_page_id()?)
    }

    /// The largest decodable image on the first page, if any.
    pub fn largest_page_image(&self) -> Result<Option<ImageData>, PdfError> {
        scan::largest_image(&self.backend, self.first_page_id()?)
    }

    fn first_page_id(&self) -> Result<PageId, PdfError> {
        self.backend
            .pages()
            .into_values()
            .next()
            .ok_or(PdfError::NoPages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Number `objects` from 1 and wrap them in a PDF with a correct xref
    /// table. Object 1 must be the catalog.
    fn assemble(objects: &[String]) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).into_bytes());
        }

        let xref_at = out.len();
        out.extend(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).into_bytes());
        for offset in offsets {
            out.extend(format!("{offset:010} 00000 n \n").into_bytes());
        }
        out.extend(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
                objects.len() + 1
            )
            .into_bytes(),
        );
        out
    }

    fn stream(dict: &str, content: &str) -> String {
        format!(
            "<< {dict} /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        )
    }

    /// A single page with one font. `pages_extra` and `page_extra` are
    /// spliced into the `/Pages` node and the page; `more` become objects 6+.
    fn pdf_with(content: &str, pages_extra: &str, page_extra: &str, more: &[String]) -> Vec<u8> {
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] {pages_extra} >>"),
            format!("<< /Type /Page /Parent 2 0 R {page_extra} /Contents 4 0 R >>"),
            stream("", content),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        objects.extend(more.iter().cloned());
        assemble(&objects)
    }

    fn minimal_pdf(content: &str) -> Vec<u8> {
        pdf_with(content, "", "/Resources << /Font << /F1 5 0 R >> >>", &[])
    }

    fn gray_image(width: i64, height: i64, bits: i64, samples: &str) -> String {
        stream(
            &format!(
                "/Type /XObject /Subtype /Image /Width {width} /Height {height} \
                 /BitsPerComponent {bits} /ColorSpace /DeviceGray"
            ),
            samples,
        )
    }

    #[test]
    fn test_first_page_from_real_bytes() {
        let pdf = minimal_pdf("BT /F1 18 Tf 1 0 0 1 200 720 Tm (Annual Report 2023 Summary) Tj ET");
        let source = PageGeometrySource::from_bytes(&pdf).unwrap();
        let page = source.first_page().unwrap();

        assert_eq!(source.page_count(), 1);
        assert_eq!((page.width, page.height), (612.0, 792.0));
        assert_eq!(page.text, "Annual Report 2023 Summary");
        assert_eq!(page.words.len(), 4);
        assert!(page.glyphs.iter().all(|g| g.size == 18.0 && g.y0 == 720.0));
    }

    #[test]
    fn test_page_without_images() {
        let pdf = minimal_pdf("BT /F1 12 Tf (x) Tj ET");
        let source = PageGeometrySource::from_bytes(&pdf).unwrap();
        assert!(source.largest_page_image().unwrap().is_none());
    }

    #[test]
    fn test_image_from_inherited_resources() {
        let pdf = pdf_with(
            "q 4 0 0 2 0 0 cm /Im1 Do Q",
            "/Resources << /XObject << /Im1 6 0 R >> >>",
            "",
            &[gray_image(4, 2, 8, "abcdefgh")],
        );
        let source = PageGeometrySource::from_bytes(&pdf).unwrap();
        let image = source.largest_page_image().unwrap().unwrap();

        assert_eq!(image.name, "Im1");
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.bytes[..4], [0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_zero_width_image_is_skipped() {
        let pdf = pdf_with(
            "q 1 0 0 1 0 0 cm /Im1 Do Q",
            "",
            "/Resources << /XObject << /Im1 6 0 R >> >>",
            &[gray_image(0, 2, 1, "ab")],
        );
        let source = PageGeometrySource::from_bytes(&pdf).unwrap();
        assert!(source.largest_page_image().unwrap().is_none());
    }

    #[test]
    fn test_invalid_bytes() {
        assert!(matches!(
            PageGeometrySource::from_bytes(b"%PDF-1.4 truncated"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PageGeometrySource::open("/definitely/not/here.pdf"),
            Err(PdfError::Io(_))
        ));
    }
}
