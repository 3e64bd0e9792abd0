//! Batch loading and batch cropping.
//!
//! Two stages, each a set of independent per-image tasks run in parallel with
//! [rayon](https://docs.rs/rayon):
//!
//! ```text
//! 1. Load   upload bytes  →  Batch       (route, unpack, decode, detect bounds)
//! 2. Crop   Batch + pad   →  BatchOutcome (crop + pad every image)
//! ```
//!
//! ## Ordering
//!
//! Loaded images are sorted by entry name once, after every decode has
//! finished, so the order never depends on archive layout or on which worker
//! finished first. The crop stage preserves its input order.
//!
//! ## Failure policy
//!
//! Partial success. A failing item never aborts its siblings and is never
//! dropped silently: every input ends up either in the successful batch or in
//! the failure list, with the error that stopped it. A fully transparent image
//! is a crop failure ([`ComposeError::InvalidBounds`]), not a skipped item.
//!
//! ## Cancellation
//!
//! Loading checks a [`CancelToken`] between items and before publishing. A
//! cancelled load returns [`LoadError::Cancelled`] and none of its partial work.

use crate::archive::{self, ArchiveEntry, ArchiveError};
use crate::config::Padding;
use crate::imaging::{CodecError, ComposeError, CropBounds, ImageCodec, compose, detect_bounds};
use crate::naming;
use crate::session::CancelToken;
use crate::types::{Batch, Image, UploadContext, UploadKind};
use rayon::prelude::*;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unsupported file type: {0} (expected .zip, .png, .jpg, .jpeg or .svg)")]
    UnsupportedFileType(String),
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Load cancelled: a newer upload replaced {0}")]
    Cancelled(String),
}

/// Why a single item did not make it through a stage.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// A named item that failed, with the error that stopped it.
#[derive(Debug)]
pub struct ItemFailure {
    pub name: String,
    pub error: ItemError,
}

/// Progress events emitted while stages run, for the CLI printer.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// An upload was routed and is about to be decoded.
    UploadStarted {
        name: String,
        kind: UploadKind,
        entry_count: usize,
    },
    /// An archive entry was left out (hidden, directory-like, or not an image).
    EntrySkipped { name: String },
    /// An image was decoded and its bounds detected.
    ImageLoaded {
        name: String,
        width: u32,
        height: u32,
        bounds: CropBounds,
    },
    /// An image was cropped and padded.
    ImageCropped {
        name: String,
        width: u32,
        height: u32,
    },
    /// An item failed in either stage.
    ItemFailed { name: String, error: String },
}

/// Result of the load stage.
#[derive(Debug)]
pub struct LoadedUpload {
    pub upload: UploadContext,
    /// Decoded images sorted by name.
    pub images: Batch,
    /// Entries that were left out before decoding, in archive order.
    pub skipped: Vec<String>,
    /// Entries that failed to decode.
    pub failures: Vec<ItemFailure>,
}

/// Result of the crop stage.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Cropped images, in input order.
    pub cropped: Batch,
    /// Images that could not be cropped, in input order.
    pub failures: Vec<ItemFailure>,
}

impl BatchOutcome {
    /// Total number of images the stage was given.
    pub fn total(&self) -> usize {
        self.cropped.len() + self.failures.len()
    }
}

fn emit(events: &Option<Sender<ProcessEvent>>, event: ProcessEvent) {
    if let Some(tx) = events {
        // A closed receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

fn failure_event(failure: &ItemFailure) -> ProcessEvent {
    ProcessEvent::ItemFailed {
        name: failure.name.clone(),
        error: failure.error.to_string(),
    }
}

/// Decode one entry and detect its bounds.
pub fn load_image(
    codec: &impl ImageCodec,
    name: &str,
    bytes: &[u8],
) -> Result<Image, CodecError> {
    let pixels = codec.decode(name, bytes)?;
    let bounds = detect_bounds(&pixels);
    Ok(Image {
        name: name.to_string(),
        pixels,
        bounds,
    })
}

/// Route an upload, unpack it if it is an archive, and load every image.
///
/// `name` is the upload's filename. For a bare image upload it also becomes
/// the single image's name.
pub fn load_upload(
    codec: &impl ImageCodec,
    name: &str,
    bytes: Vec<u8>,
    cancel: &CancelToken,
    events: Option<Sender<ProcessEvent>>,
) -> Result<LoadedUpload, LoadError> {
    let upload = UploadContext::from_name(name)
        .ok_or_else(|| LoadError::UnsupportedFileType(name.to_string()))?;

    let mut skipped = Vec::new();
    let mut unreadable = Vec::new();
    let entries = match upload.kind {
        UploadKind::Image => vec![ArchiveEntry {
            name: name.to_string(),
            bytes,
        }],
        UploadKind::Archive => {
            let mut images = Vec::new();
            for entry in archive::list_entries(&bytes)? {
                match entry {
                    Ok(entry) if naming::is_image_name(&entry.name) => images.push(entry),
                    Ok(entry) => skipped.push(entry.name),
                    Err(bad) if naming::is_image_name(&bad.name) => unreadable.push(ItemFailure {
                        name: bad.name,
                        error: bad.error.into(),
                    }),
                    Err(bad) => skipped.push(bad.name),
                }
            }
            images
        }
    };

    emit(
        &events,
        ProcessEvent::UploadStarted {
            name: upload.name.clone(),
            kind: upload.kind,
            entry_count: entries.len() + unreadable.len(),
        },
    );
    for name in &skipped {
        debug!(entry = %name, "skipping non-image archive entry");
        emit(&events, ProcessEvent::EntrySkipped { name: name.clone() });
    }
    for failure in &unreadable {
        warn!(entry = %failure.name, error = %failure.error, "unreadable archive entry");
        emit(&events, failure_event(failure));
    }

    let results: Vec<Option<Result<Image, ItemFailure>>> = entries
        .par_iter()
        .map_with(events.clone(), |events, entry| {
            if cancel.is_cancelled() {
                return None;
            }
            let result = load_image(codec, &entry.name, &entry.bytes).map_err(|error| {
                ItemFailure {
                    name: entry.name.clone(),
                    error: error.into(),
                }
            });
            match &result {
                Ok(image) => emit(
                    events,
                    ProcessEvent::ImageLoaded {
                        name: image.name.clone(),
                        width: image.width(),
                        height: image.height(),
                        bounds: image.bounds,
                    },
                ),
                Err(failure) => {
                    warn!(entry = %failure.name, error = %failure.error, "decode failed");
                    emit(events, failure_event(failure));
                }
            }
            Some(result)
        })
        .collect();

    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled(upload.name));
    }

    let mut images = Vec::with_capacity(results.len());
    let mut failures = unreadable;
    for result in results.into_iter().flatten() {
        match result {
            Ok(image) => images.push(image),
            Err(failure) => failures.push(failure),
        }
    }
    images.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(LoadedUpload {
        upload,
        images,
        skipped,
        failures,
    })
}

/// Crop and pad every image using its own previously detected bounds.
///
/// Items are independent: there is no cross-item state, so the result for an
/// image does not depend on its siblings or on scheduling.
pub fn process_batch(
    images: &[Image],
    padding: Padding,
    events: Option<Sender<ProcessEvent>>,
) -> BatchOutcome {
    let results: Vec<Result<Image, ItemFailure>> = images
        .par_iter()
        .map_with(events, |events, image| {
            let result = compose(image, image.bounds, padding).map_err(|error| ItemFailure {
                name: image.name.clone(),
                error: error.into(),
            });
            match &result {
                Ok(out) => emit(
                    events,
                    ProcessEvent::ImageCropped {
                        name: out.name.clone(),
                        width: out.width(),
                        height: out.height(),
                    },
                ),
                Err(failure) => {
                    warn!(image = %failure.name, error = %failure.error, "crop failed");
                    emit(events, failure_event(failure));
                }
            }
            result
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    for result in results {
        match result {
            Ok(image) => outcome.cropped.push(image),
            Err(failure) => outcome.failures.push(failure),
        }
    }
    debug!(
        cropped = outcome.cropped.len(),
        failed = outcome.failures.len(),
        "batch cropped"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockCodec, RecordedOp};
    use crate::test_helpers::{corrupt_payload, image_with_visible, make_image, opaque_image, zip_bytes};
    use image::RgbaImage;
    use std::sync::mpsc;

    fn names(batch: &Batch) -> Vec<&str> {
        batch.iter().map(|i| i.name.as_str()).collect()
    }

    // =========================================================================
    // Load stage
    // =========================================================================

    #[test]
    fn load_bare_image_upload() {
        let codec = MockCodec::new().with_image(b"px", image_with_visible(3, 3, &[(1, 1)]));
        let loaded = load_upload(
            &codec,
            "photo.png",
            b"px".to_vec(),
            &CancelToken::new(),
            None,
        )
        .unwrap();

        assert_eq!(loaded.upload.kind, UploadKind::Image);
        assert_eq!(names(&loaded.images), vec!["photo.png"]);
        assert_eq!(loaded.images[0].bounds, CropBounds::new(1, 1, 1, 1));
        assert!(loaded.skipped.is_empty());
        assert!(loaded.failures.is_empty());
    }

    #[test]
    fn load_rejects_unsupported_type() {
        let codec = MockCodec::new();
        let err = load_upload(&codec, "notes.txt", Vec::new(), &CancelToken::new(), None)
            .unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFileType(n) if n == "notes.txt"));
        assert!(codec.get_operations().is_empty());
    }

    #[test]
    fn load_archive_filters_and_sorts() {
        let archive = zip_bytes(&[
            ("z/last.png", b"a"),
            (".DS_Store", b"junk"),
            ("readme.txt", b"text"),
            ("__MACOSX/._first.png", b"fork"),
            ("a/first.png", b"b"),
            ("m/middle.svg", b"c"),
        ]);
        let codec = MockCodec::new()
            .with_image(b"a", opaque_image(2, 2))
            .with_image(b"b", opaque_image(3, 1))
            .with_image(b"c", opaque_image(1, 4));

        let loaded =
            load_upload(&codec, "batch.zip", archive, &CancelToken::new(), None).unwrap();

        assert_eq!(loaded.upload.kind, UploadKind::Archive);
        assert_eq!(
            names(&loaded.images),
            vec!["a/first.png", "m/middle.svg", "z/last.png"]
        );
        assert_eq!(
            loaded.skipped,
            vec![".DS_Store", "readme.txt", "__MACOSX/._first.png"]
        );
        let decoded = codec
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Decode(_)))
            .count();
        assert_eq!(decoded, 3);
    }

    #[test]
    fn load_decode_failure_keeps_siblings() {
        let archive = zip_bytes(&[("good.png", b"ok"), ("broken.png", b"??")]);
        let codec = MockCodec::new().with_image(b"ok", opaque_image(2, 2));

        let loaded =
            load_upload(&codec, "mixed.zip", archive, &CancelToken::new(), None).unwrap();

        assert_eq!(names(&loaded.images), vec!["good.png"]);
        assert_eq!(loaded.failures.len(), 1);
        assert_eq!(loaded.failures[0].name, "broken.png");
        assert!(matches!(loaded.failures[0].error, ItemError::Codec(_)));
    }

    #[test]
    fn load_corrupt_entry_keeps_siblings() {
        let mut archive = zip_bytes(&[
            ("good.png", b"good-bytes"),
            ("bad.png", b"bad-bytes"),
            ("notes.txt", b"notes-bytes"),
        ]);
        corrupt_payload(&mut archive, b"bad-bytes");
        corrupt_payload(&mut archive, b"notes-bytes");
        let codec = MockCodec::new().with_image(b"good-bytes", opaque_image(2, 2));

        let loaded =
            load_upload(&codec, "mixed.zip", archive, &CancelToken::new(), None).unwrap();

        assert_eq!(names(&loaded.images), vec!["good.png"]);
        assert_eq!(loaded.failures.len(), 1);
        assert_eq!(loaded.failures[0].name, "bad.png");
        assert!(matches!(loaded.failures[0].error, ItemError::Archive(_)));
        // A corrupt non-image entry is simply skipped.
        assert_eq!(loaded.skipped, vec!["notes.txt"]);
        // The corrupt entry never reaches the decoder.
        assert_eq!(codec.get_operations(), vec![RecordedOp::Decode("good.png".into())]);
    }

    #[test]
    fn load_keeps_blank_images() {
        let codec = MockCodec::new().with_image(b"blank", RgbaImage::new(4, 4));
        let loaded = load_upload(
            &codec,
            "blank.png",
            b"blank".to_vec(),
            &CancelToken::new(),
            None,
        )
        .unwrap();
        assert_eq!(loaded.images.len(), 1);
        assert!(loaded.images[0].is_blank());
    }

    #[test]
    fn load_cancelled_publishes_nothing() {
        let codec = MockCodec::new().with_image(b"px", opaque_image(1, 1));
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = load_upload(&codec, "p.png", b"px".to_vec(), &cancel, None).unwrap_err();
        assert!(matches!(err, LoadError::Cancelled(n) if n == "p.png"));
        assert!(codec.get_operations().is_empty());
    }

    #[test]
    fn load_invalid_archive_is_error() {
        let codec = MockCodec::new();
        let err = load_upload(
            &codec,
            "broken.zip",
            b"nope".to_vec(),
            &CancelToken::new(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Archive(_)));
    }

    #[test]
    fn load_emits_events() {
        let archive = zip_bytes(&[("a.png", b"a"), ("skip.txt", b"t")]);
        let codec = MockCodec::new().with_image(b"a", image_with_visible(4, 4, &[(2, 1)]));
        let (tx, rx) = mpsc::channel();

        load_upload(&codec, "e.zip", archive, &CancelToken::new(), Some(tx)).unwrap();
        let events: Vec<ProcessEvent> = rx.iter().collect();

        assert_eq!(
            events,
            vec![
                ProcessEvent::UploadStarted {
                    name: "e.zip".into(),
                    kind: UploadKind::Archive,
                    entry_count: 1,
                },
                ProcessEvent::EntrySkipped {
                    name: "skip.txt".into()
                },
                ProcessEvent::ImageLoaded {
                    name: "a.png".into(),
                    width: 4,
                    height: 4,
                    bounds: CropBounds::new(2, 2, 1, 1),
                },
            ]
        );
    }

    // =========================================================================
    // Crop stage
    // =========================================================================

    #[test]
    fn batch_preserves_input_order() {
        let images: Batch = ["c.png", "a.png", "b.png"]
            .iter()
            .map(|n| make_image(n, opaque_image(2, 2)))
            .collect();
        let outcome = process_batch(&images, Padding::new(1), None);
        assert_eq!(names(&outcome.cropped), vec!["c.png", "a.png", "b.png"]);
        assert!(outcome.cropped.iter().all(|i| i.width() == 4 && i.height() == 4));
    }

    #[test]
    fn batch_reports_blank_image_without_dropping_it() {
        let images = vec![
            make_image("one.png", opaque_image(2, 2)),
            make_image("blank.png", RgbaImage::new(3, 3)),
            make_image("two.png", image_with_visible(5, 5, &[(2, 2)])),
        ];
        let outcome = process_batch(&images, Padding::new(2), None);

        assert_eq!(outcome.total(), 3);
        assert_eq!(names(&outcome.cropped), vec!["one.png", "two.png"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].name, "blank.png");
        assert!(matches!(
            outcome.failures[0].error,
            ItemError::Compose(ComposeError::InvalidBounds { .. })
        ));
        // Siblings are unaffected by the failure.
        assert_eq!(outcome.cropped[1].width(), 5);
        assert_eq!(outcome.cropped[1].bounds, CropBounds::new(2, 2, 2, 2));
    }

    #[test]
    fn batch_leaves_originals_untouched() {
        let images = vec![make_image("keep.png", image_with_visible(6, 6, &[(1, 4)]))];
        let before = images.clone();
        let _ = process_batch(&images, Padding::new(3), None);
        assert_eq!(images, before);
    }

    #[test]
    fn batch_empty_input() {
        let outcome = process_batch(&[], Padding::new(1), None);
        assert_eq!(outcome.total(), 0);
    }

    #[test]
    fn batch_emits_event_per_item() {
        let images = vec![
            make_image("a.png", opaque_image(1, 1)),
            make_image("b.png", RgbaImage::new(1, 1)),
        ];
        let (tx, rx) = mpsc::channel();
        process_batch(&images, Padding::new(0), Some(tx));
        let mut events: Vec<ProcessEvent> = rx.iter().collect();
        events.sort_by_key(|e| format!("{e:?}"));

        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| matches!(
            e,
            ProcessEvent::ImageCropped { name, width: 1, height: 1 } if name == "a.png"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ProcessEvent::ItemFailed { name, .. } if name == "b.png"
        )));
    }
}
