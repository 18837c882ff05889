//! User-facing output for the builder CLI.
//!
//! Progress and diagnostics go to stderr; stdout is reserved for the final
//! archive path (or the JSON report) so scripts can capture it.

use crate::error::Result;
use crate::pipeline::RunReport;
use std::fmt;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    write_line(stderr, message);
}

/// Write one line of results to `stdout`, ignoring write failures.
pub fn write_stdout_line(stdout: &mut dyn Write, message: impl fmt::Display) {
    write_line(stdout, message);
}

fn write_line(out: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Human-readable description of a resolved target.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use libnode_builder::config::Settings;
/// use libnode_builder::output::target_summary;
/// use libnode_builder::pipeline::{PipelineContext, describe};
/// use libnode_builder::target::{Architecture, Host, HostOs};
///
/// let settings = Settings::from_lookup(|key| {
///     (key == "LIBNODE_NODE_VERSION").then(|| "20.0.0".to_owned())
/// })
/// .expect("valid settings");
/// let context = PipelineContext {
///     workdir: Utf8Path::new("/work"),
///     settings: &settings,
///     host: Host { os: HostOs::Linux, architecture: Architecture::X64 },
///     quiet: true,
/// };
/// let summary = target_summary(&describe(&context).expect("supported"));
/// assert!(summary.contains("x86_64-unknown-linux-gnu"));
/// assert!(summary.contains("libnode-20.0.0-linux-x64.zip"));
/// ```
#[must_use]
pub fn target_summary(report: &RunReport) -> String {
    [
        format!("Target triple: {}", report.target.triple()),
        format!("Configure flags: {}", report.target.config_flags().join(" ")),
        format!("Archive: {}", report.archive_name),
    ]
    .join("\n")
}

/// Text printed for `--dry-run`.
#[must_use]
pub fn dry_run_text(report: &RunReport) -> String {
    let mut lines = vec![
        "Dry run - no commands will be executed".to_owned(),
        String::new(),
        target_summary(report),
    ];
    if !report.stages.is_empty() {
        let stages: Vec<&str> = report.stages.iter().map(|s| s.name()).collect();
        lines.push(format!("Stages: {}", stages.join(", ")));
        lines.push(String::new());
        lines.push("Planned steps:".to_owned());
        lines.extend(report.planned_commands.iter().map(|c| format!("  - {c}")));
    }
    lines.join("\n")
}

/// Serialize a report as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::Serialization`] if serialization
/// fails.
pub fn report_json(report: &RunReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
