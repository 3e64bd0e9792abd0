//! Production codec: `image` for PNG/JPEG, `resvg` for SVG.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG) | `image::load_from_memory` → `to_rgba8` |
//! | Decode (SVG) | `resvg` (usvg parse + tiny-skia raster at intrinsic size) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (RGBA8) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (RGB8, alpha dropped) |

use super::backend::{CodecError, ImageCodec, OutputFormat};
use crate::naming;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use resvg::{tiny_skia, usvg};

/// Default JPEG quality for cropped output.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Codec backed by the `image` crate and `resvg`.
pub struct RustCodec {
    jpeg_quality: u8,
}

impl RustCodec {
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// JPEG quality, clamped to 1-100.
    pub fn with_jpeg_quality(quality: u8) -> Self {
        Self {
            jpeg_quality: quality.clamp(1, 100),
        }
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_raster(name: &str, bytes: &[u8]) -> Result<RgbaImage, CodecError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| CodecError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

/// Rasterize an SVG at its intrinsic size onto a transparent canvas.
fn decode_svg(name: &str, bytes: &[u8]) -> Result<RgbaImage, CodecError> {
    let fail = |reason: String| CodecError::Decode {
        name: name.to_string(),
        reason,
    };
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| fail(e.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| fail(format!("invalid canvas size {}x{}", size.width(), size.height())))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; the pipeline works on straight RGBA.
    let raw: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(size.width(), size.height(), raw)
        .ok_or_else(|| fail("rasterized buffer has unexpected length".to_string()))
}

fn encode_png(pixels: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| CodecError::Encode {
            format,
            reason: e.to_string(),
        })?;
    Ok(buf)
}

/// JPEG has no alpha channel: transparent padding comes out as whatever color
/// the transparent pixels hold, which is black for the padding band.
fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| CodecError::Encode {
            format: OutputFormat::Jpeg,
            reason: e.to_string(),
        })?;
    Ok(buf)
}

impl ImageCodec for RustCodec {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<RgbaImage, CodecError> {
        if naming::dotless_extension(name) == "svg" {
            return decode_svg(name, bytes);
        }
        decode_raster(name, bytes)
    }

    fn encode(&self, pixels: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, CodecError> {
        match format {
            OutputFormat::Png | OutputFormat::Svg => encode_png(pixels, format),
            OutputFormat::Jpeg => encode_jpeg(pixels, self.jpeg_quality),
        }
    }
}
