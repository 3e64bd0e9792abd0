//! Shared test utilities for the autocrop test suite.
//!
//! Pixel-buffer builders plus in-memory PNG and zip fixtures, so tests never
//! need image files on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let dot = make_image("dot.png", image_with_visible(3, 3, &[(1, 1)]));
//! assert_eq!(dot.bounds, CropBounds::new(1, 1, 1, 1));
//!
//! let archive = zip_bytes(&[("dot.png", &png_bytes(&dot.pixels))]);
//! ```

use crate::archive::{ArchiveEntry, list_entries};
use crate::imaging::detect_bounds;
use crate::types::Image;
use image::{ImageEncoder, Rgba, RgbaImage};
use std::io::{Cursor, Write};

/// Color used for every visible test pixel.
pub const INK: Rgba<u8> = Rgba([30, 144, 255, 255]);

// =========================================================================
// Pixel buffers
// =========================================================================

/// Transparent `width × height` image with `INK` at each listed coordinate.
pub fn image_with_visible(width: u32, height: u32, visible: &[(u32, u32)]) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);
    for &(x, y) in visible {
        img.put_pixel(x, y, INK);
    }
    img
}

/// Every pixel visible, colored by position so copies can be checked exactly.
pub fn opaque_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 40 % 256) as u8, (y * 40 % 256) as u8, 99, 255])
    })
}

/// Opaque gradient with a unique color per pixel on small images.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

/// Wrap pixels in an [`Image`] with detected bounds.
pub fn make_image(name: &str, pixels: RgbaImage) -> Image {
    let bounds = detect_bounds(&pixels);
    Image {
        name: name.to_string(),
        pixels,
        bounds,
    }
}

// =========================================================================
// Encoded fixtures
// =========================================================================

/// Encode pixels as an in-memory PNG.
pub fn png_bytes(pixels: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    buf
}

/// Build an in-memory zip with stored (uncompressed) entries, in order.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, bytes) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Read a zip that is expected to be fully readable.
pub fn read_zip(bytes: &[u8]) -> Vec<ArchiveEntry> {
    list_entries(bytes)
        .unwrap()
        .into_iter()
        .map(|entry| entry.unwrap())
        .collect()
}

/// Flip one byte of a stored entry's payload so its checksum no longer matches.
///
/// `payload` must occur exactly once in `archive`, which holds for entries
/// written by [`zip_bytes`].
pub fn corrupt_payload(archive: &mut [u8], payload: &[u8]) {
    let at = archive
        .windows(payload.len())
        .position(|w| w == payload)
        .unwrap();
    archive[at] ^= 0xFF;
}
