//! Build-output discovery.
//!
//! The Node.js build scatters its byproducts differently per platform: a
//! single flat directory on Windows and macOS, a deep `obj.target` tree on
//! Linux. [`DirectoryScan`] makes that policy explicit through [`ScanMode`]
//! and yields paths lazily; [`classify_library`] decides which static
//! libraries are worth packaging.

use crate::error::{BuilderError, Result};
use camino::Utf8PathBuf;
use glob::{MatchOptions, Paths, Pattern};
use serde::Serialize;

/// Substrings marking static libraries that must never be packaged: test
/// harnesses, V8's snapshot-less and init variants, and ICU build tools.
pub const EXCLUDED_LIBRARY_MARKERS: &[&str] = &["gtest", "v8_nosnapshot", "v8_init", "icutools"];

/// Whether a scan descends into subdirectories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Only direct children of the root.
    Flat,
    /// Every descendant of the root.
    Recursive,
}

/// Classification of a discovered build byproduct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactClass {
    /// A static library that belongs in the package.
    RelevantStaticLib,
    /// A static library filtered out by [`EXCLUDED_LIBRARY_MARKERS`].
    ExcludedStaticLib,
    /// A generated object file destined for the snapshot library.
    GeneratedObject,
}

/// A discovered file together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Path of the file.
    pub path: Utf8PathBuf,
    /// How the pipeline treats the file.
    pub class: ArtifactClass,
}

impl Artifact {
    /// The file name component of the path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or(self.path.as_str())
    }
}

/// Decide whether a static library file name should be packaged.
///
/// # Examples
///
/// ```
/// use libnode_builder::scan::{ArtifactClass, classify_library};
///
/// assert_eq!(classify_library("libv8_base.a"), ArtifactClass::RelevantStaticLib);
/// assert_eq!(classify_library("gtest.lib"), ArtifactClass::ExcludedStaticLib);
/// ```
#[must_use]
pub fn classify_library(file_name: &str) -> ArtifactClass {
    if EXCLUDED_LIBRARY_MARKERS
        .iter()
        .any(|marker| file_name.contains(marker))
    {
        ArtifactClass::ExcludedStaticLib
    } else {
        ArtifactClass::RelevantStaticLib
    }
}

/// A scan of one directory for files with a given extension.
#[derive(Debug, Clone)]
pub struct DirectoryScan {
    root: Utf8PathBuf,
    mode: ScanMode,
    file_pattern: String,
}

impl DirectoryScan {
    /// Scan `root` for files named `*.{extension}`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, mode: ScanMode, extension: &str) -> Self {
        Self {
            root: root.into(),
            mode,
            file_pattern: format!("*.{}", Pattern::escape(extension)),
        }
    }

    /// Scan `root` for every entry, files and directories alike.
    #[must_use]
    pub fn everything(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            mode: ScanMode::Recursive,
            file_pattern: "*".to_owned(),
        }
    }

    /// Lazily iterate matching paths in sorted order.
    ///
    /// A missing root yields nothing; an empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::AssemblyFailure`] if the root cannot be
    /// expressed as a glob pattern.
    pub fn paths(&self) -> Result<ScanIter> {
        let escaped_root = Pattern::escape(self.root.as_str());
        let pattern = match self.mode {
            ScanMode::Flat => format!("{escaped_root}/{}", self.file_pattern),
            ScanMode::Recursive => format!("{escaped_root}/**/{}", self.file_pattern),
        };
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let paths = glob::glob_with(&pattern, options).map_err(|e| {
            BuilderError::assembly(
                "scan",
                self.root.clone(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
            )
        })?;
        Ok(ScanIter {
            paths,
            files_only: self.file_pattern != "*",
        })
    }

    /// Collect matching files, each classified by `classify`.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::AssemblyFailure`] if the directory cannot be
    /// read or a path is not valid UTF-8.
    pub fn classify<F>(&self, classify: F) -> Result<Vec<Artifact>>
    where
        F: Fn(&str) -> ArtifactClass,
    {
        self.paths()?
            .map(|path| {
                let path = path?;
                let class = classify(path.file_name().unwrap_or_default());
                Ok(Artifact { path, class })
            })
            .collect()
    }
}

/// Iterator over the paths matched by a [`DirectoryScan`].
pub struct ScanIter {
    paths: Paths,
    files_only: bool,
}

impl Iterator for ScanIter {
    type Item = Result<Utf8PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.paths.next()? {
                Ok(path) => path,
                Err(e) => {
                    let path = Utf8PathBuf::from(e.path().to_string_lossy().into_owned());
                    let source = std::io::Error::from(e);
                    return Some(Err(BuilderError::assembly("scan", path, source)));
                }
            };
            if self.files_only && !entry.is_file() {
                continue;
            }
            return Some(Utf8PathBuf::from_path_buf(entry).map_err(|path| {
                BuilderError::assembly(
                    "scan",
                    path.to_string_lossy().into_owned(),
                    std::io::Error::new(std::io::ErrorKind::InvalidData, "path is not UTF-8"),
                )
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn build_tree() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        fs::create_dir_all(root.join("deps/v8")).expect("mkdir");
        fs::create_dir_all(root.join("tools/icu")).expect("mkdir");
        fs::write(root.join("libnode.a"), b"top").expect("write");
        fs::write(root.join("notes.txt"), b"skip").expect("write");
        fs::write(root.join("deps/v8/libv8_base.a"), b"nested").expect("write");
        fs::write(root.join("tools/icu/libicutools.a"), b"tool").expect("write");
        dir
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
    }

    fn names(paths: &[Utf8PathBuf]) -> Vec<&str> {
        paths.iter().filter_map(|p| p.file_name()).collect()
    }

    #[rstest]
    #[case::gtest("libgtest.a")]
    #[case::gtest_main("gtest_main.lib")]
    #[case::nosnapshot("libv8_nosnapshot.a")]
    #[case::init("v8_init.lib")]
    #[case::icutools("libicutools.a")]
    fn excludes_marked_libraries(#[case] name: &str) {
        assert_eq!(classify_library(name), ArtifactClass::ExcludedStaticLib);
    }

    #[rstest]
    #[case::node("libnode.a")]
    #[case::v8_base("v8_base_without_compiler.lib")]
    #[case::icu_data("libicudata.a")]
    #[case::v8_snapshot("libv8_snapshot.a")]
    fn accepts_everything_else(#[case] name: &str) {
        assert_eq!(classify_library(name), ArtifactClass::RelevantStaticLib);
    }

    #[rstest]
    fn flat_scan_ignores_subdirectories(build_tree: TempDir) {
        let scan = DirectoryScan::new(utf8(&build_tree), ScanMode::Flat, "a");
        let found: Vec<Utf8PathBuf> = scan
            .paths()
            .expect("scan")
            .collect::<Result<_>>()
            .expect("paths");
        assert_eq!(names(&found), ["libnode.a"]);
    }

    #[rstest]
    fn recursive_scan_descends(build_tree: TempDir) {
        let scan = DirectoryScan::new(utf8(&build_tree), ScanMode::Recursive, "a");
        let found: Vec<Utf8PathBuf> = scan
            .paths()
            .expect("scan")
            .collect::<Result<_>>()
            .expect("paths");
        let mut found_names = names(&found);
        found_names.sort_unstable();
        assert_eq!(found_names, ["libicutools.a", "libnode.a", "libv8_base.a"]);
    }

    #[rstest]
    fn classify_tags_each_entry(build_tree: TempDir) {
        let scan = DirectoryScan::new(utf8(&build_tree), ScanMode::Recursive, "a");
        let artifacts = scan.classify(classify_library).expect("classify");
        let excluded: Vec<&str> = artifacts
            .iter()
            .filter(|a| a.class == ArtifactClass::ExcludedStaticLib)
            .map(Artifact::file_name)
            .collect();
        assert_eq!(excluded, ["libicutools.a"]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let scan = DirectoryScan::new("/nonexistent/libnode-builder/out", ScanMode::Flat, "lib");
        assert_eq!(scan.paths().expect("scan").count(), 0);
    }

    #[rstest]
    fn everything_includes_directories(build_tree: TempDir) {
        let scan = DirectoryScan::everything(utf8(&build_tree));
        let found: Vec<Utf8PathBuf> = scan
            .paths()
            .expect("scan")
            .collect::<Result<_>>()
            .expect("paths");
        assert!(found.iter().any(|p| p.ends_with("deps/v8")));
        assert!(found.iter().any(|p| p.ends_with("notes.txt")));
    }
}
