//! Bounding-box detection over the alpha channel.
//!
//! A pixel is *visible* when its alpha is anything other than zero. There is
//! no threshold: alpha 1 counts exactly like alpha 255.

use image::RgbaImage;
use serde::Serialize;
use std::fmt;

/// Inclusive pixel rectangle spanning every visible pixel of an image.
///
/// A fully transparent image has no rectangle. That state is encoded the way
/// a running min/max starts out (`min = i64::MAX`, `max = i64::MIN`), so it
/// is never mistaken for a 1×1 box at the origin. Use [`is_empty`](Self::is_empty)
/// to tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropBounds {
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
}

impl CropBounds {
    /// The "no visible pixels" bounds.
    pub const EMPTY: Self = Self {
        min_x: i64::MAX,
        max_x: i64::MIN,
        min_y: i64::MAX,
        max_y: i64::MIN,
    };

    pub fn new(min_x: i64, max_x: i64, min_y: i64, max_y: i64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Width of the rectangle, `None` when empty.
    pub fn width(&self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        u32::try_from(self.max_x - self.min_x + 1).ok()
    }

    /// Height of the rectangle, `None` when empty.
    pub fn height(&self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        u32::try_from(self.max_y - self.min_y + 1).ok()
    }

    /// True when the rectangle is non-empty and lies inside a `width × height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && self.min_x >= 0
            && self.min_y >= 0
            && self.max_x < i64::from(width)
            && self.max_y < i64::from(height)
    }

    fn include(&mut self, x: i64, y: i64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }
}

impl Default for CropBounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for CropBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("empty");
        }
        write!(
            f,
            "x {}..={}, y {}..={}",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// Scan every pixel and return the tightest rectangle holding all visible ones.
///
/// Always a full scan: visibility is not monotonic in index order, so there is
/// no point at which the remaining pixels can be skipped.
pub fn detect_bounds(pixels: &RgbaImage) -> CropBounds {
    let mut bounds = CropBounds::EMPTY;
    for (x, y, pixel) in pixels.enumerate_pixels() {
        if pixel[3] != 0 {
            bounds.include(i64::from(x), i64::from(y));
        }
    }
    bounds
}
