//! Codec trait and shared types.
//!
//! The [`ImageCodec`] trait is the seam between the pixel pipeline and the
//! raster formats on either side of it: `decode(bytes) → RGBA` and
//! `encode(RGBA, format) → bytes`. The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec). Tests use a mock that
//! records calls, so batch and packaging logic can be checked without real
//! image files.

use crate::naming;
use image::RgbaImage;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("Failed to encode {format}: {reason}")]
    Encode { format: OutputFormat, reason: String },
    #[error("Unsupported output format: {0:?}")]
    UnsupportedFormat(String),
}

/// Target encoding for a cropped image, derived from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    /// SVG sources are rasterized on decode, so they are written back as PNG
    /// bytes under their original name.
    Svg,
}

impl OutputFormat {
    /// Map a dot-less, lower-case extension to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Format for a file name, via [`naming::dotless_extension`].
    pub fn for_name(name: &str) -> Result<Self, CodecError> {
        let ext = naming::dotless_extension(name);
        Self::from_extension(&ext).ok_or(CodecError::UnsupportedFormat(ext))
    }

    /// MIME type of the bytes actually produced.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png | Self::Svg => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Decode/encode collaborator for the crop pipeline.
///
/// `Sync` so one codec can be shared across rayon workers.
pub trait ImageCodec: Sync {
    /// Decode `bytes` to straight (non-premultiplied) RGBA8.
    ///
    /// `name` is the upload or entry name; implementations use its extension
    /// to pick decoders that cannot sniff their format (SVG).
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<RgbaImage, CodecError>;

    /// Encode an RGBA8 buffer in the requested format.
    fn encode(&self, pixels: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, CodecError>;
}
