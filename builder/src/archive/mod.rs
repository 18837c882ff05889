//! Archiving of the assembled result directory.
//!
//! # Sub-modules
//!
//! - [`checksum`] - SHA-256 sidecar next to the archive.
//! - [`naming`] - Archive naming policy (`ArchiveName`).
//! - [`packaging`] - Deterministic zip writer.

pub mod checksum;
pub mod naming;
pub mod packaging;

pub use naming::ArchiveName;

use crate::error::{BuilderError, Result};
use crate::scan::DirectoryScan;
use crate::target::TargetDescriptor;
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use packaging::{ZipEntry, create_zip, entry_name};
use serde::Serialize;

/// What archiving produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveOutput {
    /// Path of the written zip.
    pub archive_path: Utf8PathBuf,
    /// Path of the `.sha256` sidecar.
    pub checksum_path: Utf8PathBuf,
}

/// Zip `result_dir` into `output_dir` under the descriptor's archive name.
///
/// Entry names are rooted at the result directory's own name, so
/// extracting the archive recreates `libnode/...`.
///
/// # Errors
///
/// Returns [`BuilderError::ArchiveFailed`] if the result directory is
/// missing or the archive or sidecar cannot be written.
pub fn archive(
    result_dir: &Utf8Path,
    descriptor: &TargetDescriptor,
    version: &str,
    output_dir: &Utf8Path,
) -> Result<ArchiveOutput> {
    let archive_path = output_dir.join(ArchiveName::new(version, descriptor).filename());
    let failed = |reason: String| BuilderError::ArchiveFailed {
        path: archive_path.clone(),
        reason,
    };

    if !result_dir.is_dir() {
        return Err(failed(format!("{result_dir} is not a directory")));
    }

    let entries = collect_entries(result_dir)?;
    info!("writing {} entries to {archive_path}", entries.len());
    create_zip(&archive_path, &entries).map_err(|e| failed(e.to_string()))?;
    let checksum_path = checksum::write_sidecar(&archive_path)?;

    Ok(ArchiveOutput {
        archive_path,
        checksum_path,
    })
}

/// List the result directory and everything under it as zip entries,
/// sorted by entry name so parents precede their children.
///
/// # Errors
///
/// Returns [`BuilderError::AssemblyFailure`] if the directory cannot be
/// scanned.
pub fn collect_entries(result_dir: &Utf8Path) -> Result<Vec<ZipEntry>> {
    let base = result_dir.parent().unwrap_or(Utf8Path::new(""));
    let mut entries = Vec::new();
    for path in std::iter::once(Ok(result_dir.to_owned()))
        .chain(DirectoryScan::everything(result_dir).paths()?)
    {
        let path = path?;
        let Some(name) = entry_name(base, &path) else {
            continue;
        };
        if path.is_dir() {
            entries.push(ZipEntry::Directory { name });
        } else {
            entries.push(ZipEntry::File { name, source: path });
        }
    }
    entries.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(entries)
}
