//! TGA (Truevision Targa) decoding
//!
//! Every icon the game ships, and every alternative we offer, is a TGA file.
//! This module turns one into a top-left-origin RGBA8 bitmap.
//!
//! Supported image types:
//! - 1 / 9: color-mapped, raw / run-length encoded
//! - 2 / 10: true-color, raw / run-length encoded
//! - 3 / 11: grayscale, raw / run-length encoded
//!
//! Reference: Truevision TGA File Format Specification, version 2.0

pub mod cache;
pub mod transfer;

use binrw::prelude::*;
use image::{Rgba, RgbaImage};
use std::io::Cursor;

pub use cache::{BitmapCache, LoadError, SourceId};
pub use transfer::{EncodeError, TransferFormat};

/// Size of the fixed header
pub const HEADER_LEN: usize = 18;

/// Descriptor bit: rows are stored top-to-bottom
const DESC_TOP_ORIGIN: u8 = 0x20;

/// Descriptor bit: pixels within a row are stored right-to-left
const DESC_RIGHT_ORIGIN: u8 = 0x10;

/// Descriptor bits 0-3: attribute (alpha) bits per pixel
const DESC_ALPHA_BITS: u8 = 0x0f;

/// RLE packet header bit: run-length packet (vs. raw packet)
const RLE_RUN_FLAG: u8 = 0x80;

/// TGA file header
#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct TgaHeader {
    /// Length of the image ID field following the header
    pub id_length: u8,
    /// 1 if a color map is present
    pub color_map_type: u8,
    /// Image type code
    pub image_type: u8,
    /// Index of the first color map entry
    pub color_map_first: u16,
    /// Number of color map entries
    pub color_map_length: u16,
    /// Bits per color map entry
    pub color_map_depth: u8,
    pub x_origin: u16,
    pub y_origin: u16,
    pub width: u16,
    pub height: u16,
    /// Bits per pixel in the image data
    pub pixel_depth: u8,
    /// Alpha bits and origin flags
    pub descriptor: u8,
}

impl TgaHeader {
    pub fn top_origin(&self) -> bool {
        self.descriptor & DESC_TOP_ORIGIN != 0
    }

    pub fn right_origin(&self) -> bool {
        self.descriptor & DESC_RIGHT_ORIGIN != 0
    }

    fn alpha_bits(&self) -> u8 {
        self.descriptor & DESC_ALPHA_BITS
    }
}

/// Errors from parsing a TGA buffer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("TGA header truncated: {len} bytes, need {HEADER_LEN}")]
    TruncatedHeader { len: usize },

    #[error("Unsupported TGA image type: {0}")]
    UnsupportedImageType(u8),

    #[error("Unsupported pixel depth {depth} for TGA image type {image_type}")]
    UnsupportedPixelDepth { image_type: u8, depth: u8 },

    #[error("Unsupported color map entry depth: {0}")]
    UnsupportedColorMapDepth(u8),

    #[error("Unsupported TGA color map type: {0}")]
    UnsupportedColorMapType(u8),

    #[error("Color-mapped TGA has no color map")]
    MissingColorMap,

    #[error("Invalid TGA dimensions: {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },

    #[error("TGA data truncated at offset {offset} (needed {needed} more bytes)")]
    Truncated { offset: usize, needed: usize },

    #[error("Color map index {index} out of range ({len} entries)")]
    PaletteIndexOutOfRange { index: usize, len: usize },
}

/// A decoded bitmap: RGBA8, row-major, top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedBitmap {
    /// Flat stand-in shown when an icon fails to load.
    pub fn placeholder(width: u32, height: u32) -> Self {
        let pixel = [0x1c, 0x21, 0x28, 0xff];
        let pixels = pixel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at (x, y), with (0, 0) the top-left corner
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get(idx..idx + 4)?.try_into().ok()
    }

    /// Convert into an `image` buffer for display or re-encoding
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba(self.pixel(x, y).unwrap_or_default())
        })
    }
}

/// Broad image class from the type code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    ColorMapped,
    TrueColor,
    Grayscale,
}

impl ImageKind {
    /// Returns the kind and whether the pixel stream is run-length encoded
    fn from_code(code: u8) -> Result<(Self, bool), DecodeError> {
        match code {
            1 => Ok((ImageKind::ColorMapped, false)),
            2 => Ok((ImageKind::TrueColor, false)),
            3 => Ok((ImageKind::Grayscale, false)),
            9 => Ok((ImageKind::ColorMapped, true)),
            10 => Ok((ImageKind::TrueColor, true)),
            11 => Ok((ImageKind::Grayscale, true)),
            other => Err(DecodeError::UnsupportedImageType(other)),
        }
    }
}

/// Bounds-checked cursor over the input buffer
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(DecodeError::Truncated {
                offset: self.pos,
                needed: self.pos + n - self.data.len(),
            }),
        }
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }
}

/// Expand a 5-bit channel to 8 bits
fn expand5(v: u16) -> u8 {
    let v = (v & 0x1f) as u8;
    (v << 3) | (v >> 2)
}

/// Convert a 15/16/24/32-bit BGR(A) value to RGBA
fn bgra_to_rgba(raw: &[u8], use_alpha: bool) -> [u8; 4] {
    match raw.len() {
        2 => {
            let v = u16::from_le_bytes([raw[0], raw[1]]);
            let a = if use_alpha && v & 0x8000 == 0 { 0 } else { 0xff };
            [expand5(v >> 10), expand5(v >> 5), expand5(v), a]
        }
        3 => [raw[2], raw[1], raw[0], 0xff],
        _ => [raw[2], raw[1], raw[0], if use_alpha { raw[3] } else { 0xff }],
    }
}

/// Per-image pixel converter
struct PixelFormat {
    kind: ImageKind,
    bytes_per_pixel: usize,
    alpha: bool,
    palette: Vec<[u8; 4]>,
    palette_first: usize,
}

impl PixelFormat {
    fn new(header: &TgaHeader, kind: ImageKind) -> Result<Self, DecodeError> {
        let depth = header.pixel_depth;
        let supported = match kind {
            ImageKind::ColorMapped => matches!(depth, 8 | 16),
            ImageKind::TrueColor => matches!(depth, 15 | 16 | 24 | 32),
            ImageKind::Grayscale => matches!(depth, 8 | 16),
        };
        if !supported {
            return Err(DecodeError::UnsupportedPixelDepth {
                image_type: header.image_type,
                depth,
            });
        }

        let alpha = match (kind, depth) {
            (ImageKind::TrueColor, 32) => true,
            (ImageKind::TrueColor, 16) => header.alpha_bits() > 0,
            (ImageKind::Grayscale, 16) => true,
            _ => false,
        };

        Ok(Self {
            kind,
            bytes_per_pixel: (depth as usize).div_ceil(8),
            alpha,
            palette: Vec::new(),
            palette_first: header.color_map_first as usize,
        })
    }

    fn convert(&self, raw: &[u8]) -> Result<[u8; 4], DecodeError> {
        match self.kind {
            ImageKind::TrueColor => Ok(bgra_to_rgba(raw, self.alpha)),
            ImageKind::Grayscale => {
                let a = if self.alpha { raw[1] } else { 0xff };
                Ok([raw[0], raw[0], raw[0], a])
            }
            ImageKind::ColorMapped => {
                let index = match raw.len() {
                    1 => raw[0] as usize,
                    _ => u16::from_le_bytes([raw[0], raw[1]]) as usize,
                };
                index
                    .checked_sub(self.palette_first)
                    .and_then(|i| self.palette.get(i))
                    .copied()
                    .ok_or(DecodeError::PaletteIndexOutOfRange {
                        index,
                        len: self.palette.len(),
                    })
            }
        }
    }
}

/// Read the color map block, returning RGBA entries.
fn read_color_map(
    header: &TgaHeader,
    reader: &mut ByteReader<'_>,
) -> Result<Vec<[u8; 4]>, DecodeError> {
    let entry_depth = header.color_map_depth;
    if !matches!(entry_depth, 15 | 16 | 24 | 32) {
        return Err(DecodeError::UnsupportedColorMapDepth(entry_depth));
    }
    let entry_len = (entry_depth as usize).div_ceil(8);
    let use_alpha = entry_depth == 32 || (entry_depth == 16 && header.alpha_bits() > 0);

    (0..header.color_map_length)
        .map(|_| Ok(bgra_to_rgba(reader.take(entry_len)?, use_alpha)))
        .collect()
}

/// Parse just the header.
pub fn read_header(bytes: &[u8]) -> Result<TgaHeader, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::TruncatedHeader { len: bytes.len() });
    }
    TgaHeader::read(&mut Cursor::new(bytes))
        .map_err(|_| DecodeError::TruncatedHeader { len: bytes.len() })
}

/// Decode a TGA buffer into a top-left-origin RGBA bitmap.
///
/// Pure: the same bytes always produce the same bitmap.
pub fn decode(bytes: &[u8]) -> Result<DecodedBitmap, DecodeError> {
    let header = read_header(bytes)?;
    let (kind, rle) = ImageKind::from_code(header.image_type)?;

    if header.width == 0 || header.height == 0 {
        return Err(DecodeError::InvalidDimensions {
            width: header.width,
            height: header.height,
        });
    }

    let mut format = PixelFormat::new(&header, kind)?;
    let mut reader = ByteReader {
        data: bytes,
        pos: HEADER_LEN,
    };
    reader.take(header.id_length as usize)?;

    match header.color_map_type {
        0 => {}
        1 if kind == ImageKind::ColorMapped => {
            format.palette = read_color_map(&header, &mut reader)?;
        }
        // A map the pixels never index: skip it unparsed
        1 => {
            let entry_len = (header.color_map_depth as usize).div_ceil(8);
            reader.take(header.color_map_length as usize * entry_len)?;
        }
        other => return Err(DecodeError::UnsupportedColorMapType(other)),
    }
    if kind == ImageKind::ColorMapped && format.palette.is_empty() {
        return Err(DecodeError::MissingColorMap);
    }

    let width = header.width as usize;
    let height = header.height as usize;
    let pixel_count = width * height;
    let bpp = format.bytes_per_pixel;

    // Smallest pixel stream that could cover the image, checked before allocating
    let min_stream = if rle {
        pixel_count.div_ceil(128) * (1 + bpp)
    } else {
        pixel_count * bpp
    };
    let remaining = bytes.len() - reader.pos;
    if remaining < min_stream {
        return Err(DecodeError::Truncated {
            offset: reader.pos,
            needed: min_stream - remaining,
        });
    }

    let top_origin = header.top_origin();
    let right_origin = header.right_origin();
    let mut pixels = vec![0u8; pixel_count * 4];

    // Map the i-th pixel in file order to its top-left-origin position
    let mut put = |i: usize, rgba: [u8; 4]| {
        let (row, col) = (i / width, i % width);
        let y = if top_origin { row } else { height - 1 - row };
        let x = if right_origin { width - 1 - col } else { col };
        let idx = (y * width + x) * 4;
        pixels[idx..idx + 4].copy_from_slice(&rgba);
    };

    if rle {
        let mut i = 0;
        while i < pixel_count {
            let packet = reader.byte()?;
            let count = ((packet & !RLE_RUN_FLAG) as usize + 1).min(pixel_count - i);
            if packet & RLE_RUN_FLAG != 0 {
                let rgba = format.convert(reader.take(bpp)?)?;
                for _ in 0..count {
                    put(i, rgba);
                    i += 1;
                }
            } else {
                for _ in 0..count {
                    put(i, format.convert(reader.take(bpp)?)?);
                    i += 1;
                }
            }
        }
    } else {
        let data = reader.take(pixel_count * bpp)?;
        for (i, raw) in data.chunks_exact(bpp).enumerate() {
            put(i, format.convert(raw)?);
        }
    }

    Ok(DecodedBitmap {
        width: header.width as u32,
        height: header.height as u32,
        pixels,
    })
}
