//! CLI output formatting for both pipeline stages.
//!
//! # Information-First Display
//!
//! Every image is shown by positional index and entry name, with its pixel
//! facts (size, bounds, crop result) as indented context lines. The listing
//! reads as an inventory of the upload rather than a log of work done.
//!
//! # Output Format
//!
//! ## Inspect
//!
//! ```text
//! batch.zip (archive, 3 images)
//! 001 icons/home.png
//!     Size: 64x64
//!     Bounds: x 8..=55, y 4..=59 (48x56)
//! 002 icons/blank.png
//!     Size: 32x32
//!     Bounds: no visible pixels
//!
//! Skipped
//!     readme.txt
//!
//! Failed
//!     broken.png: Failed to decode broken.png: ...
//! ```
//!
//! ## Crop
//!
//! ```text
//! cropped icons/home.png → 52x60
//! failed  icons/blank.png: icons/blank.png: no visible pixels to crop (bounds empty)
//!
//! Wrote batch.cropped.zip (1 image, 1 failed)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::CropBounds;
use crate::process::{BatchOutcome, ItemFailure, LoadedUpload, ProcessEvent};
use crate::types::{Image, UploadKind};
use serde::Serialize;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn kind_label(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::Image => "image",
        UploadKind::Archive => "archive",
    }
}

/// `x 1..=4, y 2..=2 (4x1)`, or `no visible pixels`.
fn bounds_line(bounds: &CropBounds) -> String {
    match (bounds.width(), bounds.height()) {
        (Some(w), Some(h)) => format!("{bounds} ({w}x{h})"),
        _ => "no visible pixels".to_string(),
    }
}

fn failure_lines(failures: &[ItemFailure]) -> Vec<String> {
    failures
        .iter()
        .map(|f| format!("{}{}: {}", indent(1), f.name, f.error))
        .collect()
}

// ============================================================================
// Inspect
// ============================================================================

/// Format the loaded upload as an inventory of images, skipped and failed entries.
pub fn format_load_output(loaded: &LoadedUpload) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, {})",
        loaded.upload.name,
        kind_label(loaded.upload.kind),
        plural(loaded.images.len(), "image")
    )];

    for (i, image) in loaded.images.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), image.name));
        lines.push(format!(
            "{}Size: {}x{}",
            indent(1),
            image.width(),
            image.height()
        ));
        lines.push(format!("{}Bounds: {}", indent(1), bounds_line(&image.bounds)));
    }

    if !loaded.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for name in &loaded.skipped {
            lines.push(format!("{}{}", indent(1), name));
        }
    }

    if !loaded.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        lines.extend(failure_lines(&loaded.failures));
    }

    lines
}

pub fn print_load_output(loaded: &LoadedUpload) {
    for line in format_load_output(loaded) {
        println!("{}", line);
    }
}

/// Machine-readable view of one loaded image for `inspect --json`.
#[derive(Debug, Serialize)]
pub struct ImageSummary<'a> {
    pub name: &'a str,
    pub width: u32,
    pub height: u32,
    /// `None` for images with no visible pixels.
    pub bounds: Option<CropBounds>,
}

impl<'a> From<&'a Image> for ImageSummary<'a> {
    fn from(image: &'a Image) -> Self {
        Self {
            name: &image.name,
            width: image.width(),
            height: image.height(),
            bounds: (!image.bounds.is_empty()).then_some(image.bounds),
        }
    }
}

/// Loaded images as a JSON array, in listing order.
pub fn format_load_json(loaded: &LoadedUpload) -> serde_json::Result<String> {
    let summaries: Vec<ImageSummary<'_>> = loaded.images.iter().map(ImageSummary::from).collect();
    serde_json::to_string_pretty(&summaries)
}

// ============================================================================
// Progress events
// ============================================================================

/// Format a single progress event as display lines.
///
/// Load events are only shown for problems; the inventory listing covers the
/// rest. Crop events show every item.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::UploadStarted {
            name,
            kind,
            entry_count,
        } => vec![format!(
            "Loading {} ({}, {})",
            name,
            kind_label(*kind),
            plural(*entry_count, "image")
        )],
        ProcessEvent::EntrySkipped { .. } | ProcessEvent::ImageLoaded { .. } => Vec::new(),
        ProcessEvent::ImageCropped {
            name,
            width,
            height,
        } => vec![format!("cropped {} \u{2192} {}x{}", name, width, height)],
        ProcessEvent::ItemFailed { name, error } => vec![format!("failed  {}: {}", name, error)],
    }
}

// ============================================================================
// Crop summary
// ============================================================================

/// Final line(s) after a crop: where the artifact went and what it holds.
pub fn format_crop_summary(outcome: &BatchOutcome, written: &Path, packaged: usize, encode_failed: usize) -> Vec<String> {
    let failed = outcome.failures.len() + encode_failed;
    let mut detail = plural(packaged, "image");
    if failed > 0 {
        detail.push_str(&format!(", {failed} failed"));
    }
    vec![String::new(), format!("Wrote {} ({})", written.display(), detail)]
}

pub fn print_crop_summary(outcome: &BatchOutcome, written: &Path, packaged: usize, encode_failed: usize) {
    for line in format_crop_summary(outcome, written, packaged, encode_failed) {
        println!("{}", line);
    }
}
