//! # Autocrop
//!
//! Trims the transparent margin off images and puts back a uniform one.
//! Upload a single image or a zip of images; every image is cropped to the
//! bounding box of its visible (non-zero alpha) pixels, surrounded by a
//! transparent band `padding` pixels wide, and packaged in the same shape it
//! came in.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Load      upload bytes   →  Session      (route, unpack, decode, detect bounds)
//! 2. Crop      Session + pad  →  BatchOutcome (crop + pad every image)
//!    Package   BatchOutcome   →  OutputArtifact (one image, or a zip)
//! ```
//!
//! Bounds are detected once at load time. Changing the padding re-runs only the
//! crop stage, against the untouched originals, so the result never drifts no
//! matter how many times padding changes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Filename classification: image, archive, hidden entries |
//! | [`types`] | Shared types: [`types::Image`], [`types::Batch`], [`types::UploadContext`] |
//! | [`imaging`] | Bounds detection, crop + pad compositing, decode/encode |
//! | [`archive`] | Zip reading and writing |
//! | [`process`] | Stage 1 load and stage 2 crop, parallel per image |
//! | [`session`] | Current upload state, cancellation of superseded uploads |
//! | [`package`] | Output artifact and download filename |
//! | [`config`] | Padding parsing and `autocrop.toml` loading |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Partial Success
//!
//! One bad image never sinks a batch. Every input ends up either in the
//! cropped batch or in a failure list with its error; nothing is dropped
//! silently. Only when *no* image could be cropped is there nothing to package.
//!
//! ## Pure-Rust Imaging
//!
//! Raster formats go through the `image` crate and SVG through `resvg`, both
//! pure Rust. The binary has no system dependencies.
//!
//! ## Codec Seam
//!
//! Decoding and encoding sit behind the [`imaging::ImageCodec`] trait. Pipeline
//! tests run against a recording mock and never touch real codecs.

pub mod archive;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod package;
pub mod process;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
