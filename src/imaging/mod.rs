//! Pixel work: bounds detection, crop + pad, and the codec seam.
//!
//! | Operation | Where |
//! |---|---|
//! | **Detect** visible bounds | [`detect_bounds`] (alpha scan) |
//! | **Crop + pad** | [`compose`] (row copy into a transparent canvas) |
//! | **Decode / encode** | [`ImageCodec`] trait, [`RustCodec`] (`image` + `resvg`) |
//!
//! The module is split into:
//! - **Bounds**: alpha-channel scan and the [`CropBounds`] rectangle
//! - **Compose**: crop/pad compositing into a new buffer
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]

pub mod backend;
mod bounds;
mod compose;
pub mod rust_backend;

pub use backend::{CodecError, ImageCodec, OutputFormat};
pub use bounds::{CropBounds, detect_bounds};
pub use compose::{ComposeError, MAX_CANVAS_PIXELS, compose};
pub use rust_backend::RustCodec;
