//! Shared types passed between pipeline stages.
//!
//! An [`Image`] is created once by decoding and never mutated afterwards.
//! Cropping produces a *new* `Image`, so originals and cropped results can
//! coexist in a [`Session`](crate::session::Session) and be listed side by side.

use crate::imaging::CropBounds;
use crate::naming;
use image::RgbaImage;
use serde::Serialize;

/// A decoded image plus the bounds of its visible pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Entry name: the archive path for archive uploads, the upload filename otherwise.
    pub name: String,
    /// Row-major RGBA8 pixel buffer.
    pub pixels: RgbaImage,
    pub bounds: CropBounds,
}

impl Image {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// True when the image has no visible pixel at all.
    pub fn is_blank(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Ordered images. Order is by entry name once loading has finished.
pub type Batch = Vec<Image>;

/// How the upload was routed by the name classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Image,
    Archive,
}

/// The original upload's filename and how it was classified.
///
/// Drives the output packaging decision: a bare image comes back as a
/// single image, an archive comes back as an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadContext {
    pub name: String,
    pub kind: UploadKind,
}

impl UploadContext {
    /// Classify an upload by name. Returns `None` for unsupported file types.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = if naming::is_archive_name(name) {
            UploadKind::Archive
        } else if naming::is_image_name(name) {
            UploadKind::Image
        } else {
            return None;
        };
        Some(Self {
            name: name.to_string(),
            kind,
        })
    }
}
