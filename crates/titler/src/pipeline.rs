//! Per-file work: PDF bytes in, title extraction and normalization plan out.
//!
//! Everything here is synchronous and runs on a blocking thread. Translation
//! happens afterwards, on the async side.

use pdf::{PageExtract, PageGeometrySource, PdfError};
use titler_core::normalize::{self, ScriptDetector};
use titler_core::{
    extract_title, Config, Glyph, NormalizationPlan, Page, PageGeometry, TitleExtraction, Word,
};

use crate::ocr::{OcrError, OcrProvider};

/// Where the text given to the extractors came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    TextLayer,
    Ocr,
    /// OCR was needed and failed; extraction did not run.
    OcrFailed,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub extraction: TitleExtraction,
    /// `None` when no title was found.
    pub plan: Option<NormalizationPlan>,
    pub source: TextSource,
    pub page_text: String,
}

/// Read the first page of `bytes`, OCR it if its text layer is too thin,
/// and extract a title.
///
/// `ocr` is `None` when OCR is turned off; thin pages then go through the
/// extractors with whatever text they have.
pub fn analyze(
    bytes: &[u8],
    config: &Config,
    ocr: Option<&dyn OcrProvider>,
) -> Result<Analysis, PdfError> {
    let document = PageGeometrySource::from_bytes(bytes)?;
    let extract = document.first_page()?;
    log::debug!(
        "first page: {}x{} pt, {} glyphs, {} words, {} chars of text",
        extract.width,
        extract.height,
        extract.glyphs.len(),
        extract.words.len(),
        extract.text.chars().count()
    );

    let (page, mut page_text) = into_page(extract);
    let mut source = TextSource::TextLayer;

    if let Some(ocr) = ocr.filter(|_| page_text.chars().count() < config.min_text_chars) {
        log::info!("little or no text on first page, attempting OCR");
        match recognize(&document, ocr, config) {
            Ok(text) => {
                page_text = text;
                source = TextSource::Ocr;
            }
            Err(e) => {
                return Ok(Analysis {
                    extraction: TitleExtraction::ocr_failed(e),
                    plan: None,
                    source: TextSource::OcrFailed,
                    page_text,
                });
            }
        }
    }

    let extraction = extract_title(&page, &page_text, config);
    let plan = extraction
        .title()
        .map(|title| normalize::plan(title, &ScriptDetector, config));

    Ok(Analysis {
        extraction,
        plan,
        source,
        page_text,
    })
}

fn recognize(
    document: &PageGeometrySource,
    ocr: &dyn OcrProvider,
    config: &Config,
) -> Result<String, OcrError> {
    let image = document
        .largest_page_image()?
        .ok_or(OcrError::NoImage)?;

    log::debug!(
        "OCR on image {} ({}x{}, {})",
        image.name,
        image.width,
        image.height,
        image.format
    );
    ocr.recognize(&image, &config.ocr_languages)
}

/// Convert the PDF crate's page data into the core's validated [`Page`].
fn into_page(extract: PageExtract) -> (Page, String) {
    let geometry = match PageGeometry::new(extract.width, extract.height) {
        Ok(geometry) => geometry,
        Err(e) => {
            log::warn!("{e}; assuming US Letter");
            PageGeometry::LETTER
        }
    };

    let glyphs = extract
        .glyphs
        .iter()
        .map(|g| Glyph::new(g.ch, g.size, g.x0, g.y0))
        .collect();
    let words = extract
        .words
        .into_iter()
        .map(|w| Word::new(w.text, w.x0, w.x1, w.top))
        .collect();

    (Page::new(geometry, glyphs, words), extract.text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pdf::ImageData;
    use titler_core::Method;

    /// A single-page PDF whose content stream is `content`.
    ///
    /// `image` adds a 2x2 grayscale image XObject named `Im1`.
    pub(crate) fn pdf_bytes(content: &str, image: bool) -> Vec<u8> {
        let resources = if image {
            "<< /Font << /F1 5 0 R >> /XObject << /Im1 6 0 R >> >>"
        } else {
            "<< /Font << /F1 5 0 R >> >>"
        };
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources {resources} /Contents 4 0 R >>"
            ),
            format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        if image {
            objects.push(
                "<< /Type /XObject /Subtype /Image /Width 2 /Height 2 /ColorSpace /DeviceGray /BitsPerComponent 8 /Length 4 >>\nstream\n\u{0}\u{7f}\u{7f}\u{0}\nendstream"
                    .to_string(),
            );
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend(format!("{} 0 obj\n{body}\nendobj\n", i + 1).into_bytes());
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

    /// Content stream for a centered 18pt title above some body text.
    pub(crate) fn titled_page(title: &str) -> String {
        format!(
            "BT /F1 18 Tf 1 0 0 1 200 720 Tm ({title}) Tj ET \
             BT /F1 10 Tf 1 0 0 1 72 600 Tm (This report covers the operations of the past year.) Tj ET"
        )
    }

    struct FixedOcr(&'static str);

    impl OcrProvider for FixedOcr {
        fn recognize(&self, _image: &ImageData, languages: &[String]) -> Result<String, OcrError> {
            assert_eq!(languages, ["eng", "heb"]);
            Ok(self.0.to_string())
        }
    }

    struct PanicOcr;

    impl OcrProvider for PanicOcr {
        fn recognize(&self, _image: &ImageData, _languages: &[String]) -> Result<String, OcrError> {
            panic!("OCR must not run for pages with a text layer");
        }
    }

    #[test]
    fn test_text_layer_title() {
        let bytes = pdf_bytes(&titled_page("Annual Report 2023 Summary"), false);
        let analysis = analyze(&bytes, &Config::default(), Some(&PanicOcr)).unwrap();

        assert_eq!(analysis.source, TextSource::TextLayer);
        assert_eq!(analysis.extraction.title(), Some("Annual Report 2023 Summary"));
        assert_eq!(analysis.extraction.method(), Method::FontAnalysis);
        assert!(matches!(
            analysis.plan,
            Some(NormalizationPlan::Keep { .. })
        ));
    }

    #[test]
    fn test_scanned_page_uses_ocr_text() {
        let bytes = pdf_bytes("q 612 0 0 792 0 0 cm /Im1 Do Q", true);
        let ocr = FixedOcr("Quarterly Financial Report 2024\nPrepared by the finance team");
        let analysis = analyze(&bytes, &Config::default(), Some(&ocr)).unwrap();

        assert_eq!(analysis.source, TextSource::Ocr);
        assert_eq!(
            analysis.extraction.title(),
            Some("Quarterly Financial Report 2024")
        );
        assert_eq!(analysis.extraction.method(), Method::FallbackValidated);
    }

    #[test]
    fn test_scanned_page_without_image() {
        let bytes = pdf_bytes("", false);
        let analysis = analyze(&bytes, &Config::default(), Some(&FixedOcr("unused"))).unwrap();

        assert_eq!(analysis.source, TextSource::OcrFailed);
        assert_eq!(analysis.extraction.method(), Method::OcrFailed);
        assert_eq!(analysis.extraction.score(), 0.0);
        assert!(analysis
            .extraction
            .explanation()
            .starts_with("OCR failed: no image"));
        assert!(analysis.plan.is_none());
    }

    #[test]
    fn test_ocr_disabled() {
        let bytes = pdf_bytes("", false);
        let analysis = analyze(&bytes, &Config::default(), None).unwrap();

        assert_eq!(analysis.source, TextSource::TextLayer);
        assert!(!analysis.extraction.has_title());
        assert_eq!(analysis.extraction.method(), Method::Fallback);
    }

    #[test]
    fn test_not_a_pdf() {
        assert!(analyze(b"plain text", &Config::default(), None).is_err());
    }

    #[test]
    fn test_invalid_page_size_falls_back_to_letter() {
        let extract = PageExtract {
            width: 0.0,
            height: f32::NAN,
            glyphs: Vec::new(),
            words: Vec::new(),
            text: "scan".to_string(),
        };
        let (page, text) = into_page(extract);

        assert_eq!(page.geometry(), PageGeometry::LETTER);
        assert_eq!(text, "scan");
    }
}
