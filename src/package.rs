//! Output packaging.
//!
//! The shape of the result mirrors the shape of the upload:
//!
//! | Upload | Artifact | Suggested name |
//! |---|---|---|
//! | `photo.png` | one encoded image | `photo.cropped.png` |
//! | `batch.zip` | zip, one entry per cropped image | `batch.cropped.zip` |
//!
//! Archive entry names are the original entry names, byte for byte: no
//! renaming, no deduplication. Each entry is encoded in the format of its own
//! extension. Since a zip cannot hold the same name twice, a batch with a
//! repeated name fails with [`ArchiveError::DuplicateEntry`] instead of
//! silently dropping or renaming one of them.

use crate::archive::{self, ArchiveEntry, ArchiveError};
use crate::imaging::{CodecError, ImageCodec, OutputFormat};
use crate::naming;
use crate::process::{ItemError, ItemFailure};
use crate::types::{Image, UploadContext, UploadKind};
use rayon::prelude::*;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Nothing to package: no image of {0} could be cropped")]
    Empty(String),
    #[error("Failed to encode {name}: {source}")]
    Codec { name: String, source: CodecError },
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Final bytes plus the filename they should be saved under.
#[derive(Debug)]
pub struct OutputArtifact {
    pub kind: UploadKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: &'static str,
    /// Number of images packaged.
    pub image_count: usize,
    /// Archive entries that failed to encode and were left out.
    pub failures: Vec<ItemFailure>,
}

/// `photo.PNG` → `photo.cropped.png`: the final extension is replaced by
/// `.cropped.<ext>`, with `<ext>` lower-cased.
pub fn cropped_image_name(name: &str) -> String {
    let ext = naming::dotless_extension(name);
    match name.rfind('.') {
        Some(dot) => format!("{}.cropped.{}", &name[..dot], ext),
        None => format!("{name}.cropped"),
    }
}

/// `batch.ZIP` → `batch.cropped.zip`: a trailing `.zip` (any case) becomes
/// `.cropped.zip`.
pub fn cropped_archive_name(name: &str) -> String {
    let split = name.len().saturating_sub(4);
    match name.get(split..) {
        Some(tail) if tail.eq_ignore_ascii_case(".zip") => {
            format!("{}.cropped.zip", &name[..split])
        }
        _ => format!("{name}.cropped.zip"),
    }
}

/// Encode `image` in the format named by `format_name`'s extension.
fn encode_image(codec: &impl ImageCodec, image: &Image, format_name: &str) -> Result<Vec<u8>, CodecError> {
    OutputFormat::for_name(format_name).and_then(|format| codec.encode(&image.pixels, format))
}

/// Package a cropped batch for download.
///
/// A bare-image upload packages the first (only) cropped image, encoded in the
/// format of the upload's extension. An archive upload packages every cropped
/// image under its original entry name; entries that fail to encode are
/// reported in [`OutputArtifact::failures`] and left out.
pub fn package(
    upload: &UploadContext,
    cropped: &[Image],
    codec: &impl ImageCodec,
) -> Result<OutputArtifact, PackageError> {
    match upload.kind {
        UploadKind::Image => {
            let image = cropped
                .first()
                .ok_or_else(|| PackageError::Empty(upload.name.clone()))?;
            let codec_error = |source: CodecError| PackageError::Codec {
                name: upload.name.clone(),
                source,
            };
            let format = OutputFormat::for_name(&upload.name).map_err(codec_error)?;
            let bytes = codec
                .encode(&image.pixels, format)
                .map_err(codec_error)?;
            Ok(OutputArtifact {
                kind: UploadKind::Image,
                file_name: cropped_image_name(&upload.name),
                bytes,
                mime_type: format.mime_type(),
                image_count: 1,
                failures: Vec::new(),
            })
        }
        UploadKind::Archive => {
            let encoded: Vec<Result<ArchiveEntry, ItemFailure>> = cropped
                .par_iter()
                .map(|image| {
                    encode_image(codec, image, &image.name)
                        .map(|bytes| ArchiveEntry {
                            name: image.name.clone(),
                            bytes,
                        })
                        .map_err(|source| ItemFailure {
                            name: image.name.clone(),
                            error: ItemError::Codec(source),
                        })
                })
                .collect();

            let mut entries = Vec::with_capacity(encoded.len());
            let mut failures = Vec::new();
            for result in encoded {
                match result {
                    Ok(entry) => entries.push(entry),
                    Err(failure) => {
                        warn!(entry = %failure.name, error = %failure.error, "encode failed");
                        failures.push(failure);
                    }
                }
            }
            if entries.is_empty() {
                return Err(PackageError::Empty(upload.name.clone()));
            }

            Ok(OutputArtifact {
                kind: UploadKind::Archive,
                file_name: cropped_archive_name(&upload.name),
                image_count: entries.len(),
                bytes: archive::build(&entries)?,
                mime_type: "application/zip",
                failures,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockCodec, RecordedOp};
    use crate::test_helpers::{make_image, opaque_image, read_zip};

    fn upload(name: &str) -> UploadContext {
        UploadContext::from_name(name).unwrap()
    }

    // =========================================================================
    // Filename derivation
    // =========================================================================

    #[test]
    fn image_name_gets_cropped_suffix() {
        assert_eq!(cropped_image_name("photo.png"), "photo.cropped.png");
    }

    #[test]
    fn image_name_only_last_extension_replaced() {
        assert_eq!(cropped_image_name("a.b.PNG"), "a.b.cropped.png");
        assert_eq!(cropped_image_name("shot.JPEG"), "shot.cropped.jpeg");
    }

    #[test]
    fn image_name_without_extension() {
        assert_eq!(cropped_image_name("noext"), "noext.cropped");
    }

    #[test]
    fn archive_name_gets_cropped_suffix() {
        assert_eq!(cropped_archive_name("batch.zip"), "batch.cropped.zip");
    }

    #[test]
    fn archive_name_case_insensitive() {
        assert_eq!(cropped_archive_name("Icons.ZIP"), "Icons.cropped.zip");
    }

    #[test]
    fn archive_name_without_zip_suffix() {
        assert_eq!(cropped_archive_name("bundle"), "bundle.cropped.zip");
        assert_eq!(cropped_archive_name("zip"), "zip.cropped.zip");
    }

    #[test]
    fn archive_name_non_ascii_stem() {
        assert_eq!(cropped_archive_name("résumé.zip"), "résumé.cropped.zip");
    }

    // =========================================================================
    // Packaging
    // =========================================================================

    #[test]
    fn bare_image_packaged_as_single_file() {
        let codec = MockCodec::new();
        let cropped = vec![make_image("photo.png", opaque_image(6, 6))];

        let artifact = package(&upload("photo.png"), &cropped, &codec).unwrap();

        assert_eq!(artifact.kind, UploadKind::Image);
        assert_eq!(artifact.file_name, "photo.cropped.png");
        assert_eq!(artifact.mime_type, "image/png");
        assert_eq!(artifact.bytes, MockCodec::fake_payload(6, 6, OutputFormat::Png));
        assert_eq!(artifact.image_count, 1);
    }

    #[test]
    fn bare_jpeg_encoded_as_jpeg() {
        let codec = MockCodec::new();
        let cropped = vec![make_image("shot.JPG", opaque_image(2, 2))];
        let artifact = package(&upload("shot.JPG"), &cropped, &codec).unwrap();
        assert_eq!(artifact.file_name, "shot.cropped.jpg");
        assert_eq!(artifact.mime_type, "image/jpeg");
        assert!(matches!(
            codec.get_operations()[0],
            RecordedOp::Encode {
                format: OutputFormat::Jpeg,
                ..
            }
        ));
    }

    #[test]
    fn bare_image_with_nothing_cropped_is_empty() {
        let err = package(&upload("blank.png"), &[], &MockCodec::new()).unwrap_err();
        assert!(matches!(err, PackageError::Empty(n) if n == "blank.png"));
    }

    #[test]
    fn bare_image_encode_failure_is_error() {
        let codec = MockCodec::new().failing_encode();
        let cropped = vec![make_image("p.png", opaque_image(1, 1))];
        let err = package(&upload("p.png"), &cropped, &codec).unwrap_err();
        assert!(matches!(err, PackageError::Codec { .. }));
    }

    #[test]
    fn archive_keeps_entry_names_verbatim() {
        let codec = MockCodec::new();
        let names = ["Icons/Home Icon.PNG", "icons/home icon.png", "logo.svg", "x/y/z.jpeg"];
        let cropped: Vec<Image> = names
            .iter()
            .map(|n| make_image(n, opaque_image(3, 2)))
            .collect();

        let artifact = package(&upload("batch.zip"), &cropped, &codec).unwrap();

        assert_eq!(artifact.kind, UploadKind::Archive);
        assert_eq!(artifact.file_name, "batch.cropped.zip");
        assert_eq!(artifact.mime_type, "application/zip");
        assert_eq!(artifact.image_count, 4);
        let entries = read_zip(&artifact.bytes);
        let entry_names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(entry_names, names);
        assert_eq!(
            entries[3].bytes,
            MockCodec::fake_payload(3, 2, OutputFormat::Jpeg)
        );
        assert_eq!(
            entries[2].bytes,
            MockCodec::fake_payload(3, 2, OutputFormat::Svg)
        );
    }

    #[test]
    fn archive_all_encodes_failing_is_empty() {
        let codec = MockCodec::new().failing_encode();
        let cropped = vec![make_image("a.png", opaque_image(1, 1))];
        let err = package(&upload("b.zip"), &cropped, &codec).unwrap_err();
        assert!(matches!(err, PackageError::Empty(_)));
    }

    #[test]
    fn archive_with_no_images_is_empty() {
        let err = package(&upload("b.zip"), &[], &MockCodec::new()).unwrap_err();
        assert!(matches!(err, PackageError::Empty(n) if n == "b.zip"));
    }

    #[test]
    fn archive_with_repeated_name_is_archive_error() {
        let cropped = vec![
            make_image("a.png", opaque_image(1, 1)),
            make_image("a.png", opaque_image(2, 2)),
        ];
        let err = package(&upload("dups.zip"), &cropped, &MockCodec::new()).unwrap_err();
        assert!(matches!(
            err,
            PackageError::Archive(ArchiveError::DuplicateEntry(ref n)) if n == "a.png"
        ));
    }
}
