//! Re-encoding decoded bitmaps for the install step
//!
//! The game loads icons by file name, so the payload format follows the
//! target file's extension: `.tga` targets get a TGA, anything
//! else gets PNG.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::ImageFormat;
use std::io::Cursor;

use super::DecodedBitmap;
use crate::paths;

/// Encoding used when handing a bitmap to the apply step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFormat {
    Png,
    Tga,
}

impl TransferFormat {
    /// Pick the format matching a target file name
    pub fn for_target(file_name: &str) -> Self {
        match paths::extension(file_name).as_deref() {
            Some("tga") => TransferFormat::Tga,
            _ => TransferFormat::Png,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            TransferFormat::Png => "image/png",
            TransferFormat::Tga => "image/x-tga",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            TransferFormat::Png => ImageFormat::Png,
            TransferFormat::Tga => ImageFormat::Tga,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to encode bitmap as {format:?}: {source}")]
pub struct EncodeError {
    format: TransferFormat,
    #[source]
    source: image::ImageError,
}

impl DecodedBitmap {
    /// Encode into file bytes for the apply step
    pub fn encode_for_transfer(&self, format: TransferFormat) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        self.to_rgba_image()
            .write_to(&mut Cursor::new(&mut buf), format.image_format())
            .map_err(|source| EncodeError { format, source })?;
        Ok(buf)
    }

    /// Encode as an embeddable `data:` URL
    pub fn to_data_url(&self, format: TransferFormat) -> Result<String, EncodeError> {
        let bytes = self.encode_for_transfer(format)?;
        Ok(format!(
            "data:{};base64,{}",
            format.mime_type(),
            STANDARD.encode(bytes)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tga::{decode, tests::rle_sample};

    #[test]
    fn test_format_for_target() {
        assert_eq!(TransferFormat::for_target("Spell_Frost_Stun.tga"), TransferFormat::Tga);
        assert_eq!(TransferFormat::for_target("SPELL_FROST_STUN.TGA"), TransferFormat::Tga);
        assert_eq!(TransferFormat::for_target("spell_frost_stun.jpg"), TransferFormat::Png);
    }

    #[test]
    fn test_png_payload() {
        let bitmap = decode(&rle_sample(0x20)).unwrap();
        let png = bitmap.encode_for_transfer(TransferFormat::Png).unwrap();
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47]));

        let reloaded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(reloaded, bitmap.to_rgba_image());
    }

    #[test]
    fn test_tga_payload_decodes_back() {
        let bitmap = decode(&rle_sample(0)).unwrap();
        let tga = bitmap.encode_for_transfer(TransferFormat::Tga).unwrap();
        assert_eq!(decode(&tga).unwrap(), bitmap);
    }

    #[test]
    fn test_data_url() {
        let bitmap = DecodedBitmap::placeholder(2, 2);
        let url = bitmap.to_data_url(TransferFormat::Png).unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBOR"));
    }
}
