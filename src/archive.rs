//! Zip container reading and writing.
//!
//! Only the container is handled here: enumerate entries and inflate them to
//! bytes on the way in, add named entries and produce archive bytes on the way
//! out. Deciding which entries are images belongs to [`naming`](crate::naming).

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Duplicate entry name {0}: zip entries must be unique")]
    DuplicateEntry(String),
}

/// One named file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, exactly as stored.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// An entry listed in the archive whose data could not be read (bad local
/// header, checksum mismatch, unsupported compression).
#[derive(Error, Debug)]
#[error("{name}: {error}")]
pub struct UnreadableEntry {
    pub name: String,
    #[source]
    pub error: ArchiveError,
}

/// Read every file entry of a zip archive, in stored order.
///
/// Only an archive whose directory cannot be opened at all is an error. A
/// corrupt entry comes back as its own `Err` in place, next to its readable
/// siblings. Directory entries carry no data and are left out.
pub fn list_entries(
    archive: &[u8],
) -> Result<Vec<Result<ArchiveEntry, UnreadableEntry>>, ArchiveError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let mut entries = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let name = zip
            .name_for_index(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("entry #{index}"));
        match read_entry(&mut zip, index) {
            Ok(Some(entry)) => entries.push(Ok(entry)),
            Ok(None) => {}
            Err(_) if name.ends_with('/') => {}
            Err(error) => entries.push(Err(UnreadableEntry { name, error })),
        }
    }
    Ok(entries)
}

/// `Ok(None)` for directory entries.
fn read_entry<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    index: usize,
) -> Result<Option<ArchiveEntry>, ArchiveError> {
    let mut file = zip.by_index(index)?;
    if file.is_dir() {
        return Ok(None);
    }
    // The header's declared size is not trusted for preallocation.
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(ArchiveEntry {
        name: file.name().to_string(),
        bytes,
    }))
}

/// Build a deflate-compressed zip archive from entries, in the given order.
///
/// Names are written verbatim. A zip cannot hold two entries with the same
/// name, so a repeated name is [`ArchiveError::DuplicateEntry`].
pub fn build(entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
    let mut seen = HashSet::with_capacity(entries.len());
    if let Some(dup) = entries.iter().find(|e| !seen.insert(e.name.as_str())) {
        return Err(ArchiveError::DuplicateEntry(dup.name.clone()));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in entries {
        writer.start_file(entry.name.as_str(), options)?;
        writer.write_all(&entry.bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}
