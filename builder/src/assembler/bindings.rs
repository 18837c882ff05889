//! Rust bindings for the embedding API.

use super::{AssemblyLayout, OutputArtifact};
use crate::error::Result;
use crate::exec::{CommandExecutor, CommandSpec, run_checked};
use crate::target::TargetDescriptor;
use log::info;

/// Only functions with this prefix are bound.
pub const ALLOWLIST_PATTERN: &str = "^node_.*";

/// File name of the generated bindings inside the result directory.
pub const BINDINGS_FILE: &str = "sys.rs";

/// Run bindgen over the layout's header for the descriptor's triple.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::ToolchainFailure`] if bindgen
/// exits unsuccessfully.
pub fn generate(
    executor: &dyn CommandExecutor,
    descriptor: &TargetDescriptor,
    layout: &AssemblyLayout,
) -> Result<OutputArtifact> {
    let output = layout.result_dir.join(BINDINGS_FILE);
    info!("generating bindings from {}", layout.header);

    let command = CommandSpec::new("bindgen")
        .args(["--allowlist-function", ALLOWLIST_PATTERN])
        .arg(layout.header.as_str())
        .args(["--output", output.as_str()])
        .args(["--", "-target", descriptor.triple().as_str()])
        .current_dir(layout.workdir.clone());
    run_checked(executor, &command)?;

    Ok(OutputArtifact::BindingSurface(output))
}
