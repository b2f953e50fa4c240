use std::collections::BTreeMap;

use lopdf::content::Content;

use crate::PdfError;

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// The visible area of a page in user space, taken from its MediaBox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    /// Build from the four MediaBox numbers, accepting corners in any order.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        PageBox {
            left: x0.min(x1),
            bottom: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }
}

/// A content-stream operand, detached from `lopdf::Object`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<Operand>),
    Dict(Vec<(Vec<u8>, Operand)>),
    Reference(PageId),
}

impl Operand {
    /// Numeric value of an `Integer` or `Real` operand.
    pub fn number(&self) -> Option<f32> {
        match self {
            Operand::Integer(i) => Some(*i as f32),
            Operand::Real(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&lopdf::Object> for Operand {
    fn from(obj: &lopdf::Object) -> Self {
        match obj {
            lopdf::Object::Null => Operand::Null,
            lopdf::Object::Boolean(b) => Operand::Bool(*b),
            lopdf::Object::Integer(i) => Operand::Integer(*i),
            lopdf::Object::Real(f) => Operand::Real(*f),
            lopdf::Object::Name(n) => Operand::Name(n.clone()),
            lopdf::Object::String(s, _) => Operand::Str(s.clone()),
            lopdf::Object::Array(items) => Operand::Array(items.iter().map(Operand::from).collect()),
            lopdf::Object::Dictionary(dict) => Operand::Dict(
                dict.iter()
                    .map(|(k, v)| (k.clone(), Operand::from(v)))
                    .collect(),
            ),
            // Inline stream data is never needed by the text walker.
            lopdf::Object::Stream(stream) => Operand::Dict(
                stream
                    .dict
                    .iter()
                    .map(|(k, v)| (k.clone(), Operand::from(v)))
                    .collect(),
            ),
            lopdf::Object::Reference(id) => Operand::Reference(*id),
        }
    }
}

/// One content-stream operation.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<Operand>,
}

/// Decode string bytes without font information.
///
/// UTF-16BE with a BOM first, then UTF-8, then Latin-1 byte-per-char.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16be(payload);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Decode big-endian UTF-16 code units. A trailing odd byte is ignored.
fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Access to the parts of a PDF the glyph walker and image scanner need.
///
/// Implemented by [`LopdfBackend`] and by in-memory mocks in tests.
pub trait PdfBackend {
    /// 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError>;

    /// The page's content streams, decompressed and concatenated.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode the bytes of a shown string using what is known about the font.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;
}

/// [`PdfBackend`] over a [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn raw_doc(&self) -> &lopdf::Document {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// The resource dictionary in effect for `page`, which may live on an
    /// ancestor `/Pages` node.
    pub fn page_resources(&self, page: PageId) -> Option<&lopdf::Dictionary> {
        let dict = self.doc.get_object(page).ok()?.as_dict().ok()?;
        match self.inherited(dict, b"Resources")? {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok()?.as_dict().ok(),
            other => other.as_dict().ok(),
        }
    }

    /// Look for `key` on the page dictionary, then on its ancestors.
    /// MediaBox and Resources are both inheritable.
    fn inherited<'a>(&'a self, dict: &'a lopdf::Dictionary, key: &[u8]) -> Option<&'a lopdf::Object> {
        let mut current = dict;
        // The page tree is shallow; the bound only guards against cycles.
        for _ in 0..32 {
            if let Ok(obj) = current.get(key) {
                return Some(obj);
            }
            let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        }
        None
    }

    fn number(&self, obj: &lopdf::Object) -> Option<f32> {
        let obj = match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok()?,
            other => other,
        };
        match obj {
            lopdf::Object::Integer(i) => Some(*i as f32),
            lopdf::Object::Real(f) => Some(*f),
            _ => None,
        }
    }

    fn font_encoding(&self, page: PageId, font_key: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        match fonts.get(font_key)?.get(b"Encoding").ok()? {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError> {
        let dict = self
            .doc
            .get_object(page)
            .and_then(|obj| obj.as_dict())
            .map_err(|e| PdfError::Parse(format!("cannot read page dictionary: {e}")))?;

        let media_box = self
            .inherited(dict, b"MediaBox")
            .and_then(|obj| match obj {
                lopdf::Object::Reference(id) => self.doc.get_object(*id).ok(),
                other => Some(other),
            })
            .and_then(|obj| obj.as_array().ok())
            .ok_or_else(|| PdfError::Parse("MediaBox not found for page".into()))?;

        let nums: Vec<f32> = media_box.iter().filter_map(|o| self.number(o)).collect();
        match nums.as_slice() {
            [x0, y0, x1, y1, ..] => Ok(PageBox::from_corners(*x0, *y0, *x1, *y1)),
            _ => Err(PdfError::Parse(format!(
                "MediaBox has {} numeric entries, expected 4",
                nums.len()
            ))),
        }
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {e}")))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {e}")))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(Operand::from).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-H/V fonts show 2-byte codes; many producers map them
        // straight to UTF-16.
        let identity = self
            .font_encoding(page, font_key)
            .is_some_and(|enc| enc.starts_with("Identity"));

        if identity && !bytes.is_empty() && bytes.len() % 2 == 0 {
            let decoded = decode_utf16be(bytes);
            if decoded.chars().any(|c| c != '\u{FFFD}' && c != '\0') {
                return decoded;
            }
        }

        decode_text_simple(bytes)
    }
}
