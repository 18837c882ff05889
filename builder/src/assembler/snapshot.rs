//! Snapshot library linking.
//!
//! `node_mksnapshot` output is never packaged into a static library by the
//! Node.js build itself, so the generated objects are bundled here: with the
//! MSVC librarian on Windows and `ar` elsewhere.

use super::{AssemblyLayout, OutputArtifact};
use crate::error::Result;
use crate::exec::{CommandExecutor, CommandSpec, run_checked};
use crate::scan::{ArtifactClass, DirectoryScan, ScanMode};
use crate::target::HostOs;
use camino::Utf8PathBuf;
use log::info;

/// File stem of the snapshot library.
pub const SNAPSHOT_STEM: &str = "libnode_snapshot";

/// Generated object files that make up the snapshot library.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::AssemblyFailure`] if a scanned
/// directory cannot be read.
pub fn snapshot_objects(host_os: HostOs, layout: &AssemblyLayout) -> Result<Vec<Utf8PathBuf>> {
    let release = layout.release_dir();
    let scans = match host_os {
        HostOs::Windows => {
            let mksnapshot = release.join("obj").join("node_mksnapshot");
            vec![
                DirectoryScan::new(mksnapshot.join("src"), ScanMode::Flat, "obj"),
                DirectoryScan::new(mksnapshot.join("tools/msvs/pch"), ScanMode::Flat, "obj"),
            ]
        }
        HostOs::Darwin | HostOs::Linux => vec![DirectoryScan::new(
            release.join("obj.target/node/gen"),
            ScanMode::Flat,
            "o",
        )],
    };

    let mut objects = Vec::new();
    for scan in &scans {
        objects.extend(
            scan.classify(|_| ArtifactClass::GeneratedObject)?
                .into_iter()
                .map(|artifact| artifact.path),
        );
    }
    Ok(objects)
}

/// Link the snapshot library into the layout's `lib/`.
///
/// The librarian runs even when no objects were found, matching what the
/// build tree would produce for an empty snapshot.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::ToolchainFailure`] if `lib` or `ar`
/// fails.
pub fn link(
    executor: &dyn CommandExecutor,
    host_os: HostOs,
    layout: &AssemblyLayout,
) -> Result<OutputArtifact> {
    let output = layout
        .lib_dir()
        .join(format!("{SNAPSHOT_STEM}.{}", host_os.static_lib_extension()));
    let objects = snapshot_objects(host_os, layout)?;
    info!("linking {} from {} objects", output, objects.len());

    let command = match host_os {
        HostOs::Windows => CommandSpec::new("lib").arg(format!("/OUT:{output}")),
        HostOs::Darwin | HostOs::Linux => {
            CommandSpec::new("ar").arg("cr").arg(output.as_str())
        }
    };
    let command = command
        .args(objects.iter().map(|object| object.as_str()))
        .current_dir(layout.workdir.clone());
    run_checked(executor, &command)?;

    Ok(OutputArtifact::SnapshotLibrary(output))
}
