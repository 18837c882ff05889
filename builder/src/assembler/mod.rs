//! Post-processing of a finished Node.js build.
//!
//! Assembly turns the build tree's scattered byproducts into the result
//! directory that gets archived:
//!
//! ```text
//! libnode/
//! ├── sys.rs                    (bindgen output)
//! └── lib/
//!     ├── <static libraries>    (.a or .lib)
//!     └── libnode_snapshot.{a,lib}
//! ```
//!
//! The result directory is deleted and recreated on every run, so nothing
//! from a previous assembly survives into the next one.
//!
//! # Sub-modules
//!
//! - [`bindings`] - bindgen invocation producing `sys.rs`.
//! - [`libraries`] - collection, merging, and stripping of static libraries.
//! - [`snapshot`] - linking of the snapshot library from generated objects.

pub mod bindings;
pub mod libraries;
pub mod snapshot;

use crate::error::{BuilderError, Result};
use crate::exec::{CommandExecutor, absolute_dir};
use crate::target::TargetDescriptor;
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use serde::Serialize;
use std::fs;

/// Name of the result directory inside the working directory.
pub const RESULT_DIR_NAME: &str = "libnode";

/// A file produced by assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "kebab-case")]
pub enum OutputArtifact {
    /// A static library copied or merged into `lib/`.
    MergedLibrary(Utf8PathBuf),
    /// The library linked from snapshot objects.
    SnapshotLibrary(Utf8PathBuf),
    /// The generated Rust bindings.
    BindingSurface(Utf8PathBuf),
}

impl OutputArtifact {
    /// Path of the produced file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::MergedLibrary(path) | Self::SnapshotLibrary(path) | Self::BindingSurface(path) => {
                path
            }
        }
    }
}

/// Where assembly reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyLayout {
    /// Directory tools run in; relative tool output resolves against it.
    pub workdir: Utf8PathBuf,
    /// The extracted Node.js source tree.
    pub source_dir: Utf8PathBuf,
    /// The directory that will be archived.
    pub result_dir: Utf8PathBuf,
    /// Header handed to bindgen.
    pub header: Utf8PathBuf,
}

impl AssemblyLayout {
    /// Standard layout under `workdir`: the source tree at
    /// `workdir/source_dir_name`, results in `workdir/libnode`, and `header`
    /// resolved against `workdir` when relative.
    #[must_use]
    pub fn new(workdir: &Utf8Path, source_dir_name: &str, header: &Utf8Path) -> Self {
        Self {
            workdir: workdir.to_owned(),
            source_dir: workdir.join(source_dir_name),
            result_dir: workdir.join(RESULT_DIR_NAME),
            header: workdir.join(header),
        }
    }

    /// The same layout with every path resolved against the current
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Io`] if the current directory is unavailable.
    pub fn absolute(&self) -> Result<Self> {
        Ok(Self {
            workdir: absolute_dir(&self.workdir)?,
            source_dir: absolute_dir(&self.source_dir)?,
            result_dir: absolute_dir(&self.result_dir)?,
            header: absolute_dir(&self.header)?,
        })
    }

    /// `out/Release` inside the source tree.
    #[must_use]
    pub fn release_dir(&self) -> Utf8PathBuf {
        self.source_dir.join("out").join("Release")
    }

    /// `lib/` inside the result directory.
    #[must_use]
    pub fn lib_dir(&self) -> Utf8PathBuf {
        self.result_dir.join("lib")
    }
}

/// Assemble the result directory for `descriptor`.
///
/// Steps run in a fixed order: clean, bindings, static libraries, snapshot
/// library. The first failure aborts assembly and leaves the result
/// directory in whatever partial state it reached.
///
/// # Errors
///
/// Returns [`BuilderError::ToolchainFailure`] when bindgen, `ar`, `lib`, or
/// `strip` fails, and [`BuilderError::AssemblyFailure`] on filesystem errors.
pub fn assemble(
    executor: &dyn CommandExecutor,
    descriptor: &TargetDescriptor,
    layout: &AssemblyLayout,
) -> Result<Vec<OutputArtifact>> {
    let layout = &layout.absolute()?;
    info!("assembling {} into {}", descriptor.triple(), layout.result_dir);
    prepare_result_dir(layout)?;

    let mut artifacts = vec![bindings::generate(executor, descriptor, layout)?];
    artifacts.extend(libraries::collect(executor, descriptor.host_os(), layout)?);
    artifacts.push(snapshot::link(executor, descriptor.host_os(), layout)?);
    Ok(artifacts)
}

/// Remove any previous result directory and recreate it with `lib/`.
///
/// # Errors
///
/// Returns [`BuilderError::AssemblyFailure`] if removal or creation fails.
pub fn prepare_result_dir(layout: &AssemblyLayout) -> Result<()> {
    match fs::remove_dir_all(&layout.result_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuilderError::assembly("remove", layout.result_dir.clone(), e)),
    }
    let lib_dir = layout.lib_dir();
    fs::create_dir_all(&lib_dir).map_err(|e| BuilderError::assembly("create", lib_dir, e))
}
