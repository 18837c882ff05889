//! Shared helpers for the builder behaviour tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use camino::{Utf8Path, Utf8PathBuf};
use libnode_builder::config::Settings;
use libnode_builder::target::HostOs;
use std::fs;
use tempfile::TempDir;

/// A temporary directory together with its UTF-8 path.
pub struct Scratch {
    _dir: TempDir,
    /// Root of the temporary directory.
    pub root: Utf8PathBuf,
}

impl Scratch {
    /// Create an empty scratch directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        Self { _dir: dir, root }
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &[u8]) -> Utf8PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, contents).expect("write");
        path
    }
}

/// Map a platform name used in feature files onto a host OS.
pub fn host_os(name: &str) -> HostOs {
    match name {
        "linux" => HostOs::Linux,
        "windows" => HostOs::Windows,
        "darwin" => HostOs::Darwin,
        other => panic!("unknown host OS in feature file: {other}"),
    }
}

/// Settings for `version` with every other key at its default.
pub fn settings_for(version: &str) -> Settings {
    Settings::from_lookup(|key| (key == "LIBNODE_NODE_VERSION").then(|| version.to_owned()))
        .expect("settings")
}

/// Names of every entry in the zip at `path`.
pub fn zip_entry_names(path: &Utf8Path) -> Vec<String> {
    let file = fs::File::open(path).expect("open archive");
    let archive = zip::ZipArchive::new(file).expect("read archive");
    archive.file_names().map(str::to_owned).collect()
}
