//! Image extraction for scanned pages.
//!
//! A scanned page is typically one full-page image XObject. The largest
//! image on the page is pulled out and converted to something an OCR
//! engine can read: JPEG and JPEG 2000 pass through, CCITT G4 fax data and
//! raw pixel buffers are re-encoded as PNG.

use std::io::Cursor;

use crate::parser::backend::{LopdfBackend, PageId};
use crate::types::{ImageData, ImageFormat};
use crate::PdfError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorSpace {
    fn channels(self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    fn from_components(n: i64) -> Option<Self> {
        match n {
            1 => Some(ColorSpace::Gray),
            3 => Some(ColorSpace::Rgb),
            4 => Some(ColorSpace::Cmyk),
            _ => None,
        }
    }
}

/// Pixel layout of an uncompressed (or Flate-decompressed) image stream.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PixelLayout {
    width: u32,
    height: u32,
    bits_per_component: u8,
    color_space: ColorSpace,
}

impl PixelLayout {
    fn row_bytes(&self) -> usize {
        (self.width as usize * self.color_space.channels() * self.bits_per_component as usize)
            .div_ceil(8)
    }

    fn byte_len(&self) -> usize {
        self.row_bytes() * self.height as usize
    }
}

/// Identify an encoded image by its leading bytes.
pub fn sniff_format(bytes: &[u8]) -> ImageFormat {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => ImageFormat::Png,
        [0x00, 0x00, 0x00, 0x0C, b'j', b'P', b' ', b' ', ..] | [0xFF, 0x4F, 0xFF, 0x51, ..] => {
            ImageFormat::Jpeg2000
        }
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => ImageFormat::Tiff,
        _ => ImageFormat::Unknown,
    }
}

/// Extract the largest decodable image on `page`.
///
/// Returns `Ok(None)` when the page has no image the OCR engine could use.
pub fn largest_image(backend: &LopdfBackend, page: PageId) -> Result<Option<ImageData>, PdfError> {
    let doc = backend.raw_doc();
    doc.get_object(page)
        .and_then(|obj| obj.as_dict())
        .map_err(|e| PdfError::Parse(format!("cannot read page dictionary: {e}")))?;

    let Some(xobjects) = backend
        .page_resources(page)
        .and_then(|resources| resolve(doc, resources.get(b"XObject").ok()?).as_dict().ok())
    else {
        return Ok(None);
    };

    let mut candidates: Vec<(&[u8], &lopdf::Stream, u32, u32)> = xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let stream = resolve(doc, obj).as_stream().ok()?;
            let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
            if subtype != b"Image" {
                return None;
            }
            let width = positive_dimension(doc, &stream.dict, b"Width")?;
            let height = positive_dimension(doc, &stream.dict, b"Height")?;
            Some((name.as_slice(), stream, width, height))
        })
        .collect();

    // Largest first; the first one that decodes wins.
    candidates.sort_by_key(|(_, _, w, h)| std::cmp::Reverse(u64::from(*w) * u64::from(*h)));

    for (name, stream, width, height) in candidates {
        let name = String::from_utf8_lossy(name).into_owned();
        match decode_stream(doc, stream) {
            Some((format, bytes)) => {
                log::debug!("image {name}: {width}x{height} {format}");
                return Ok(Some(ImageData {
                    name,
                    format,
                    width,
                    height,
                    bytes,
                }));
            }
            None => log::debug!("image {name}: {width}x{height} could not be decoded"),
        }
    }

    Ok(None)
}

/// Turn an image stream into encoded bytes an OCR engine accepts.
fn decode_stream(doc: &lopdf::Document, stream: &lopdf::Stream) -> Option<(ImageFormat, Vec<u8>)> {
    match first_filter(&stream.dict).as_deref() {
        Some("DCTDecode") => return Some((ImageFormat::Jpeg, stream.content.clone())),
        Some("JPXDecode") => return Some((ImageFormat::Jpeg2000, stream.content.clone())),
        Some("CCITTFaxDecode") => {
            return decode_ccitt(&stream.dict, &stream.content).map(|png| (ImageFormat::Png, png))
        }
        _ => {}
    }

    // Unfiltered streams make lopdf report an error; their content is raw.
    let bytes = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    match sniff_format(&bytes) {
        ImageFormat::Unknown => {
            let layout = pixel_layout(doc, &stream.dict)?;
            encode_png(&layout, &bytes).map(|png| (ImageFormat::Png, png))
        }
        format => Some((format, bytes)),
    }
}

// ---------------------------------------------------------------------------
// Raw pixels
// ---------------------------------------------------------------------------

fn pixel_layout(doc: &lopdf::Document, dict: &lopdf::Dictionary) -> Option<PixelLayout> {
    let width = positive_dimension(doc, dict, b"Width")?;
    let height = positive_dimension(doc, dict, b"Height")?;
    let bits_per_component = dict_int(doc, dict, b"BitsPerComponent")
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(8);

    if !matches!(bits_per_component, 1 | 2 | 4 | 8) {
        return None;
    }

    let color_space = match resolve(doc, dict.get(b"ColorSpace").ok()?) {
        lopdf::Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => ColorSpace::Gray,
            b"DeviceRGB" | b"CalRGB" => ColorSpace::Rgb,
            b"DeviceCMYK" => ColorSpace::Cmyk,
            _ => return None,
        },
        // [/ICCBased <stream>]: the profile's /N gives the component count.
        lopdf::Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let profile = resolve(doc, items.get(1)?).as_stream().ok()?;
                    ColorSpace::from_components(dict_int(doc, &profile.dict, b"N")?)?
                }
                b"CalGray" => ColorSpace::Gray,
                b"CalRGB" => ColorSpace::Rgb,
                _ => return None,
            }
        }
        _ => return None,
    };

    Some(PixelLayout {
        width,
        height,
        bits_per_component,
        color_space,
    })
}

fn encode_png(layout: &PixelLayout, raw: &[u8]) -> Option<Vec<u8>> {
    if raw.len() < layout.byte_len() {
        return None;
    }
    let raw = &raw[..layout.byte_len()];

    let samples = if layout.bits_per_component < 8 {
        widen_samples(raw, layout)
    } else {
        raw.to_vec()
    };

    let image = match layout.color_space {
        ColorSpace::Gray => {
            image::DynamicImage::ImageLuma8(image::GrayImage::from_raw(layout.width, layout.height, samples)?)
        }
        ColorSpace::Rgb => {
            image::DynamicImage::ImageRgb8(image::RgbImage::from_raw(layout.width, layout.height, samples)?)
        }
        ColorSpace::Cmyk => image::DynamicImage::ImageRgb8(image::RgbImage::from_raw(
            layout.width,
            layout.height,
            cmyk_to_rgb(&samples),
        )?),
    };

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .ok()?;
    Some(png)
}

/// Scale 1, 2 or 4 bit samples up to 8 bits. Rows are byte aligned.
fn widen_samples(raw: &[u8], layout: &PixelLayout) -> Vec<u8> {
    let bits = layout.bits_per_component as usize;
    let per_row = layout.width as usize * layout.color_space.channels();
    let max = (1u16 << bits) - 1;
    let mask = max as u8;

    raw.chunks(layout.row_bytes())
        .take(layout.height as usize)
        .flat_map(|row| {
            (0..per_row).map(move |i| {
                let bit = i * bits;
                let shift = 8 - bits - bit % 8;
                let value = (row[bit / 8] >> shift) & mask;
                (u16::from(value) * 255 / max) as u8
            })
        })
        .collect()
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    cmyk.chunks_exact(4)
        .flat_map(|px| {
            let k = u16::from(px[3]);
            let channel = |c: u8| 255u16.saturating_sub((u16::from(c) + k).min(255)) as u8;
            [channel(px[0]), channel(px[1]), channel(px[2])]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CCITT G4
// ---------------------------------------------------------------------------

/// Decode Group 4 fax data to a grayscale PNG with black ink on white.
fn decode_ccitt(dict: &lopdf::Dictionary, data: &[u8]) -> Option<Vec<u8>> {
    let parms = decode_parms(dict)?;
    let columns = parms
        .get(b"Columns")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(1728);
    let width = u16::try_from(columns).ok().filter(|&w| w > 0)?;
    let rows = parms
        .get(b"Rows")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u16::try_from(v).ok());
    let k = parms.get(b"K").ok().and_then(|o| o.as_i64().ok()).unwrap_or(0);

    // Only pure two-dimensional (G4) data is supported.
    if k >= 0 {
        return None;
    }

    let mut pixels: Vec<u8> = Vec::new();
    let mut height: u32 = 0;
    fax::decoder::decode_g4(data.iter().copied(), width, rows, |transitions| {
        pixels.extend(render_fax_row(transitions, width));
        height += 1;
    })?;

    if height == 0 {
        return None;
    }

    let layout = PixelLayout {
        width: u32::from(width),
        height,
        bits_per_component: 8,
        color_space: ColorSpace::Gray,
    };
    encode_png(&layout, &pixels)
}

fn decode_parms(dict: &lopdf::Dictionary) -> Option<&lopdf::Dictionary> {
    match dict.get(b"DecodeParms").ok()? {
        lopdf::Object::Dictionary(d) => Some(d),
        lopdf::Object::Array(items) => items.first().and_then(|o| o.as_dict().ok()),
        _ => None,
    }
}

/// One 8-bit row from fax color transitions: white (255) until the first
/// transition, then alternating black (0) and white runs.
fn render_fax_row(transitions: &[u16], width: u16) -> Vec<u8> {
    let mut row = vec![255u8; width as usize];
    let mut black = false;
    let mut start = 0usize;

    for &pos in transitions.iter().chain(std::iter::once(&width)) {
        let end = (pos as usize).min(row.len());
        if black && start < end {
            row[start..end].fill(0);
        }
        start = end;
        black = !black;
    }

    row
}

// ---------------------------------------------------------------------------
// lopdf helpers
// ---------------------------------------------------------------------------

fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn dict_int(doc: &lopdf::Document, dict: &lopdf::Dictionary, key: &[u8]) -> Option<i64> {
    resolve(doc, dict.get(key).ok()?).as_i64().ok()
}

/// Image dimensions must fit in `u32` and be non-zero.
fn positive_dimension(doc: &lopdf::Document, dict: &lopdf::Dictionary, key: &[u8]) -> Option<u32> {
    u32::try_from(dict_int(doc, dict, key)?).ok().filter(|&v| v > 0)
}

fn first_filter(dict: &lopdf::Dictionary) -> Option<String> {
    let name = match dict.get(b"Filter").ok()? {
        lopdf::Object::Name(name) => name.as_slice(),
        lopdf::Object::Array(items) => items.first()?.as_name().ok()?,
        _ => return None,
    };
    Some(String::from_utf8_lossy(name).into_owned())
}
