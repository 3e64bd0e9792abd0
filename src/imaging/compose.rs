//! Crop + pad compositing.
//!
//! The visible rectangle is copied verbatim into a new fully transparent
//! canvas, offset by `padding` on both axes:
//!
//! ```text
//! source (bounds = x 2..=4, y 1..=2)      output, padding = 1
//!
//! . . . . . .                             . . . . .
//! . . # # # .                             . # # # .
//! . . # # # .                ──►          . # # # .
//! . . . . . .                             . . . . .
//! ```
//!
//! No blending and no resampling: every copied pixel keeps all four channels.
//! The source image is never touched; the result is a new [`Image`].

use super::bounds::CropBounds;
use crate::config::Padding;
use crate::types::Image;
use image::RgbaImage;
use thiserror::Error;

const CHANNELS: usize = 4;

/// Largest output canvas, in pixels (16384 × 16384, 1 GiB of RGBA).
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("{name}: no visible pixels to crop (bounds {bounds})")]
    InvalidBounds { name: String, bounds: CropBounds },
    #[error("{name}: padded canvas would be too large ({padding}px padding, limit 16384x16384)")]
    CanvasTooLarge { name: String, padding: u32 },
}

/// Crop `image` to `bounds` and surround the result with `padding` transparent pixels.
///
/// Output size is `(bounds width + 2 * padding) × (bounds height + 2 * padding)`.
/// The returned image carries its new bounds directly (`padding..=padding + w - 1`
/// on each axis), so callers never need to re-run detection on it. The name is
/// carried over unchanged.
///
/// Fails with [`ComposeError::InvalidBounds`] when `bounds` is empty or does not
/// fit inside the image, and with [`ComposeError::CanvasTooLarge`] when the
/// output would exceed [`MAX_CANVAS_PIXELS`] or cannot be allocated.
pub fn compose(image: &Image, bounds: CropBounds, padding: Padding) -> Result<Image, ComposeError> {
    let invalid = || ComposeError::InvalidBounds {
        name: image.name.clone(),
        bounds,
    };
    if !bounds.fits_within(image.width(), image.height()) {
        return Err(invalid());
    }
    let (Some(crop_w), Some(crop_h)) = (bounds.width(), bounds.height()) else {
        return Err(invalid());
    };

    let pad = padding.value();
    let too_large = || ComposeError::CanvasTooLarge {
        name: image.name.clone(),
        padding: pad,
    };
    let out_w = pad
        .checked_mul(2)
        .and_then(|p| p.checked_add(crop_w))
        .ok_or_else(too_large)?;
    let out_h = pad
        .checked_mul(2)
        .and_then(|p| p.checked_add(crop_h))
        .ok_or_else(too_large)?;
    if u64::from(out_w) * u64::from(out_h) > MAX_CANVAS_PIXELS {
        return Err(too_large());
    }
    let len = (out_w as usize)
        .checked_mul(out_h as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(too_large)?;

    let src = image.pixels.as_raw();
    let src_stride = image.width() as usize * CHANNELS;
    let dst_stride = out_w as usize * CHANNELS;
    let row_len = crop_w as usize * CHANNELS;
    // fits_within guarantees the bounds are non-negative.
    let min_x = bounds.min_x as usize;
    let min_y = bounds.min_y as usize;

    let mut dst = Vec::new();
    dst.try_reserve_exact(len).map_err(|_| too_large())?;
    dst.resize(len, 0);
    for row in 0..crop_h as usize {
        let s = (min_y + row) * src_stride + min_x * CHANNELS;
        let d = (pad as usize + row) * dst_stride + pad as usize * CHANNELS;
        dst[d..d + row_len].copy_from_slice(&src[s..s + row_len]);
    }

    let pixels = RgbaImage::from_raw(out_w, out_h, dst).ok_or_else(too_large)?;
    let pad = i64::from(pad);
    Ok(Image {
        name: image.name.clone(),
        pixels,
        bounds: CropBounds::new(
            pad,
            pad + i64::from(crop_w) - 1,
            pad,
            pad + i64::from(crop_h) - 1,
        ),
    })
}
