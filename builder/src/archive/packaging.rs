//! Zip packaging of the result directory.
//!
//! Entries are written in the order given, each with the same fixed
//! modification time and permissions, so the same tree always produces the
//! same bytes.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Permissions recorded for regular files.
const FILE_MODE: u32 = 0o644;

/// Permissions recorded for directories.
const DIR_MODE: u32 = 0o755;

/// Errors arising while writing a zip archive.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// Reading a source file or writing the archive failed.
    #[error("I/O error during packaging: {0}")]
    Io(#[from] io::Error),

    /// The zip encoder rejected an entry.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// One entry of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZipEntry {
    /// A directory, named with `/` separators and no trailing slash.
    Directory {
        /// Name inside the archive.
        name: String,
    },
    /// A regular file copied from disk.
    File {
        /// Name inside the archive.
        name: String,
        /// Where the contents are read from.
        source: Utf8PathBuf,
    },
}

impl ZipEntry {
    /// Name of the entry inside the archive.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name } | Self::File { name, .. } => name,
        }
    }
}

/// Archive name for `path` relative to `base`, using `/` separators.
///
/// Returns `None` when `path` is not inside `base`.
#[must_use]
pub fn entry_name(base: &Utf8Path, path: &Utf8Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<&str> = relative.components().map(|c| c.as_str()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Write `entries` into a new deflate-compressed zip at `output_path`.
///
/// The archive is written to a temporary file beside `output_path` and only
/// renamed into place once complete, so a failure leaves no partial zip. An
/// existing file at `output_path` is replaced.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if a source cannot be read or the archive
/// cannot be written, and [`PackagingError::Zip`] if encoding fails.
pub fn create_zip(output_path: &Utf8Path, entries: &[ZipEntry]) -> Result<(), PackagingError> {
    let parent = match output_path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let output = NamedTempFile::new_in(parent)?;
    let mut writer = ZipWriter::new(output);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for entry in entries {
        match entry {
            ZipEntry::Directory { name } => {
                writer.add_directory(name.as_str(), options.unix_permissions(DIR_MODE))?;
            }
            ZipEntry::File { name, source } => {
                writer.start_file(name.as_str(), options.unix_permissions(FILE_MODE))?;
                let mut input = fs::File::open(source)?;
                io::copy(&mut input, &mut writer)?;
            }
        }
    }

    writer.finish()?.persist(output_path).map_err(|e| e.error)?;
    Ok(())
}
