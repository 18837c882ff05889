//! SHA-256 sidecar files.
//!
//! The sidecar holds a single `sha256sum --binary` line so downloads can be
//! verified with standard tools.

use crate::error::{BuilderError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;

/// Extension appended to the archive path for the sidecar.
pub const SIDECAR_EXTENSION: &str = "sha256";

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns [`BuilderError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Path of the sidecar for `archive`.
#[must_use]
pub fn sidecar_path(archive: &Utf8Path) -> Utf8PathBuf {
    let mut path = archive.as_str().to_owned();
    path.push('.');
    path.push_str(SIDECAR_EXTENSION);
    Utf8PathBuf::from(path)
}

/// Write `<archive>.sha256` next to `archive` and return its path.
///
/// # Errors
///
/// Returns [`BuilderError::ArchiveFailed`] if the archive cannot be hashed
/// or the sidecar cannot be written.
pub fn write_sidecar(archive: &Utf8Path) -> Result<Utf8PathBuf> {
    let failed = |reason: String| BuilderError::ArchiveFailed {
        path: archive.to_owned(),
        reason,
    };
    let digest = compute_sha256(archive).map_err(|e| failed(e.to_string()))?;
    let file_name = archive.file_name().unwrap_or(archive.as_str());
    let sidecar = sidecar_path(archive);
    fs::write(&sidecar, format!("{digest} *{file_name}\n")).map_err(|e| failed(e.to_string()))?;
    Ok(sidecar)
}
