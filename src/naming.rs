//! Filename classification for uploads and archive entries.
//!
//! Every decision is a pure string check, case-insensitive on the extension:
//!
//! - `batch.zip`, `a.ZIP` → archive
//! - `photo.png`, `a.b.PNG`, `x.jpeg`, `logo.svg` → image
//! - `.hidden.png`, `folder/.DS_Store`, `folder/` → neither (hidden or empty final segment)
//!
//! Archive entry filtering reuses [`is_image_name`], so directories and hidden
//! entries never reach the decoder regardless of their extension.

/// Extensions accepted as images, including the leading dot.
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".svg"];

const ARCHIVE_EXTENSION: &str = ".zip";

/// Final path segment, splitting on both `/` and `\`.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// True when the final path segment is empty (a directory) or starts with `.`.
pub fn is_hidden_or_empty(name: &str) -> bool {
    let base = base_name(name);
    base.is_empty() || base.starts_with('.')
}

/// Does `name` denote a zip archive?
pub fn is_archive_name(name: &str) -> bool {
    if is_hidden_or_empty(name) {
        return false;
    }
    name.to_lowercase().ends_with(ARCHIVE_EXTENSION)
}

/// Does `name` denote one of the supported image types?
pub fn is_image_name(name: &str) -> bool {
    if is_hidden_or_empty(name) {
        return false;
    }
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Lower-cased text after the last `.`, or `""` when there is none.
///
/// ```
/// # use autocrop::naming::dotless_extension;
/// assert_eq!(dotless_extension("Photo.PNG"), "png");
/// assert_eq!(dotless_extension("archive.tar.gz"), "gz");
/// assert_eq!(dotless_extension("README"), "");
/// ```
pub fn dotless_extension(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => String::new(),
    }
}
