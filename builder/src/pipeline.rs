//! Stage orchestration for one target.
//!
//! A run resolves the target first and then executes the selected stages in
//! their fixed order: build, post-process, archive. The first failing stage
//! ends the run, so an archive is only written after a complete assembly.

use crate::archive::{self, ArchiveName, ArchiveOutput};
use crate::assembler::{self, AssemblyLayout, OutputArtifact};
use crate::config::Settings;
use crate::error::Result;
use crate::exec::CommandExecutor;
pub use crate::exec::absolute_dir;
use crate::invoker::{BuildConfig, BuildInvoker};
use crate::output::write_stderr_line;
use crate::target::{Host, TargetDescriptor, resolve};
use crate::verify;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Configure and compile the Node.js source tree.
    Build,
    /// Assemble the result directory from build output.
    Postproc,
    /// Zip the result directory.
    Archive,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Self; 3] = [Self::Build, Self::Postproc, Self::Archive];

    /// Lowercase stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Postproc => "postproc",
            Self::Archive => "archive",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Context for a pipeline run.
pub struct PipelineContext<'a> {
    /// Working directory holding the source tree; results land here too.
    pub workdir: &'a Utf8Path,
    /// Resolved settings.
    pub settings: &'a Settings,
    /// The machine running the build.
    pub host: Host,
    /// Suppress progress output.
    pub quiet: bool,
}

impl PipelineContext<'_> {
    /// Resolve the target for this host and settings.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BuilderError::UnsupportedTarget`] if the
    /// requested architecture cannot be built on this host.
    pub fn descriptor(&self) -> Result<TargetDescriptor> {
        resolve(&self.settings.target_request(self.host.os))
    }

    /// Where assembly reads and writes.
    #[must_use]
    pub fn layout(&self) -> AssemblyLayout {
        AssemblyLayout::new(
            self.workdir,
            &self.settings.source_dir_name(),
            &self.settings.header,
        )
    }

    /// The build invoker configured from settings.
    #[must_use]
    pub fn invoker(&self) -> BuildInvoker {
        BuildInvoker::new(BuildConfig {
            python: self.settings.python.clone(),
            jobs: self.settings.jobs,
            host_architecture: self.host.architecture,
        })
    }

    fn progress(&self, stderr: &mut dyn Write, message: impl fmt::Display) {
        if !self.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

/// Summary of a pipeline run, printed as JSON with `--json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// The resolved target.
    pub target: TargetDescriptor,
    /// File name the archive has (or would have).
    pub archive_name: String,
    /// Stages that ran, or would run in a dry run.
    pub stages: Vec<Stage>,
    /// Whether nothing was executed.
    pub dry_run: bool,
    /// What a dry run would have done, one line per command or step.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned_commands: Vec<String>,
    /// Files produced by assembly.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<OutputArtifact>,
    /// The written archive, if the archive stage ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveOutput>,
}

impl RunReport {
    fn new(context: &PipelineContext<'_>, stages: Vec<Stage>, dry_run: bool) -> Result<Self> {
        let target = context.descriptor()?;
        let archive_name = ArchiveName::new(&context.settings.node_version, &target).filename();
        Ok(Self {
            target,
            archive_name,
            stages,
            dry_run,
            planned_commands: Vec::new(),
            artifacts: Vec::new(),
            archive: None,
        })
    }
}

/// Order `stages` for execution and drop duplicates.
#[must_use]
pub fn normalise_stages(stages: &[Stage]) -> Vec<Stage> {
    let mut ordered = stages.to_vec();
    ordered.sort_unstable();
    ordered.dedup();
    ordered
}

/// Resolve the target without running anything.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::UnsupportedTarget`] for an
/// unsupported architecture/OS pair.
pub fn describe(context: &PipelineContext<'_>) -> Result<RunReport> {
    RunReport::new(context, Vec::new(), true)
}

/// Report what `stages` would do without spawning any tool or touching the
/// filesystem.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::UnsupportedTarget`] for an
/// unsupported architecture/OS pair.
pub fn plan(context: &PipelineContext<'_>, stages: &[Stage]) -> Result<RunReport> {
    let mut report = RunReport::new(context, normalise_stages(stages), true)?;
    let layout = context.layout();
    for stage in report.stages.clone() {
        match stage {
            Stage::Build => report.planned_commands.extend(
                context
                    .invoker()
                    .plan(&report.target, &layout.source_dir)
                    .commands()
                    .iter()
                    .map(ToString::to_string),
            ),
            Stage::Postproc => report
                .planned_commands
                .push(format!("assemble {} into {}", layout.release_dir(), layout.result_dir)),
            Stage::Archive => report.planned_commands.push(format!(
                "zip {} into {}",
                layout.result_dir,
                context.workdir.join(&report.archive_name)
            )),
        }
    }
    Ok(report)
}

/// Run `stages` for the context's target.
///
/// # Errors
///
/// Returns the first stage's error; later stages do not run.
pub fn run(
    executor: &dyn CommandExecutor,
    context: &PipelineContext<'_>,
    stages: &[Stage],
    stderr: &mut dyn Write,
) -> Result<RunReport> {
    let mut report = RunReport::new(context, normalise_stages(stages), false)?;
    let layout = context.layout();

    for stage in report.stages.clone() {
        match stage {
            Stage::Build => {
                context.progress(stderr, format!("Building {} ...", report.target.triple()));
                context
                    .invoker()
                    .invoke(executor, &report.target, &layout.source_dir)?;
            }
            Stage::Postproc => {
                context.progress(stderr, format!("Assembling {} ...", layout.result_dir));
                report.artifacts = assembler::assemble(executor, &report.target, &layout)?;
                for artifact in &report.artifacts {
                    context.progress(stderr, format!("  - {}", artifact.path()));
                }
            }
            Stage::Archive => {
                context.progress(stderr, format!("Archiving {} ...", report.archive_name));
                report.archive = Some(archive::archive(
                    &layout.result_dir,
                    &report.target,
                    &context.settings.node_version,
                    context.workdir,
                )?);
            }
        }
    }
    Ok(report)
}

/// Run the consuming crate's tests in `crate_dir` against the result
/// directory.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::ToolchainFailure`] if the tests
/// fail, or a resolution error for an unsupported target.
pub fn test_consumer(
    executor: &dyn CommandExecutor,
    context: &PipelineContext<'_>,
    crate_dir: &Utf8Path,
    stderr: &mut dyn Write,
) -> Result<()> {
    let descriptor = context.descriptor()?;
    let result_dir = context.layout().result_dir;
    context.progress(stderr, format!("Testing {crate_dir} against {result_dir} ..."));
    verify::run_consumer_tests(executor, &descriptor, crate_dir, &result_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuilderError;
    use crate::target::{Architecture, HostOs};
    use crate::test_utils::RecordingExecutor;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        workdir: Utf8PathBuf,
        settings: Settings,
    }

    impl Fixture {
        fn context(&self, os: HostOs) -> PipelineContext<'_> {
            PipelineContext {
                workdir: &self.workdir,
                settings: &self.settings,
                host: Host {
                    os,
                    architecture: Architecture::X64,
                },
                quiet: false,
            }
        }
    }

    #[fixture]
    fn fixture() -> Fixture {
        let dir = TempDir::new().expect("temp dir");
        let workdir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let settings = Settings::from_lookup(|key| {
            (key == "LIBNODE_NODE_VERSION").then(|| "20.0.0".to_owned())
        })
        .expect("settings");
        let release = workdir.join("node-20.0.0/out/Release");
        fs::create_dir_all(&release).expect("mkdir");
        fs::write(release.join("libnode.a"), b"node").expect("write");
        Fixture {
            _dir: dir,
            workdir,
            settings,
        }
    }

    #[test]
    fn stages_are_ordered_and_deduplicated() {
        assert_eq!(
            normalise_stages(&[Stage::Archive, Stage::Build, Stage::Archive]),
            [Stage::Build, Stage::Archive]
        );
    }

    #[rstest]
    fn full_run_produces_archive(fixture: Fixture) {
        let executor = RecordingExecutor::succeeding();
        let mut stderr = Vec::new();

        let report = run(&executor, &fixture.context(HostOs::Darwin), &Stage::ALL, &mut stderr)
            .expect("pipeline succeeds");

        let archive = report.archive.expect("archive stage ran");
        assert_eq!(archive.archive_path, fixture.workdir.join("libnode-20.0.0-darwin-x64.zip"));
        assert!(archive.archive_path.is_file());
        assert!(!report.artifacts.is_empty());
        let progress = String::from_utf8(stderr).expect("utf-8");
        assert!(progress.contains("Building x86_64-apple-darwin"));
        assert!(progress.contains("Archiving libnode-20.0.0-darwin-x64.zip"));
    }

    #[rstest]
    #[case::build("make")]
    #[case::postproc("bindgen")]
    #[case::strip("strip")]
    fn failing_tool_prevents_archive(fixture: Fixture, #[case] tool: &str) {
        let executor = RecordingExecutor::failing_on(tool);
        let mut stderr = Vec::new();

        let err = run(&executor, &fixture.context(HostOs::Darwin), &Stage::ALL, &mut stderr)
            .expect_err("pipeline fails");

        assert!(matches!(err, BuilderError::ToolchainFailure { tool: ref failed, .. } if failed == tool));
        assert!(!fixture.workdir.join("libnode-20.0.0-darwin-x64.zip").exists());
    }

    #[rstest]
    fn unsupported_target_fails_before_any_command(fixture: Fixture) {
        let settings = Settings {
            architecture: Architecture::X86,
            ..fixture.settings.clone()
        };
        let context = PipelineContext {
            settings: &settings,
            ..fixture.context(HostOs::Linux)
        };
        let executor = RecordingExecutor::succeeding();

        let err = run(&executor, &context, &Stage::ALL, &mut Vec::new()).expect_err("unsupported");

        assert!(err.to_string().contains("i686-unknown-linux-gnu"));
        assert!(executor.calls().is_empty());
    }

    #[rstest]
    fn quiet_run_writes_nothing(fixture: Fixture) {
        let context = PipelineContext {
            quiet: true,
            ..fixture.context(HostOs::Linux)
        };
        let mut stderr = Vec::new();
        run(&RecordingExecutor::succeeding(), &context, &[Stage::Build], &mut stderr)
            .expect("build succeeds");
        assert!(stderr.is_empty());
    }

    #[rstest]
    fn plan_spawns_nothing_and_lists_commands(fixture: Fixture) {
        let report = plan(&fixture.context(HostOs::Windows), &Stage::ALL).expect("plan");

        assert!(report.dry_run);
        assert_eq!(report.archive_name, "libnode-20.0.0-win32-x64.zip");
        assert_eq!(report.planned_commands.len(), 3);
        assert!(report.planned_commands[0].contains("vcbuild.bat x64"));
        assert!(!fixture.workdir.join("libnode").exists());
    }

    #[rstest]
    fn archive_stage_alone_requires_assembled_results(fixture: Fixture) {
        let err = run(
            &RecordingExecutor::succeeding(),
            &fixture.context(HostOs::Linux),
            &[Stage::Archive],
            &mut Vec::new(),
        )
        .expect_err("nothing to archive");
        assert!(matches!(err, BuilderError::ArchiveFailed { .. }));
    }

    #[rstest]
    fn consumer_tests_point_at_result_dir(fixture: Fixture) {
        let executor = RecordingExecutor::succeeding();
        test_consumer(
            &executor,
            &fixture.context(HostOs::Linux),
            Utf8Path::new("/src/consumer"),
            &mut Vec::new(),
        )
        .expect("tests pass");

        let [call]: [crate::exec::CommandSpec; 1] =
            executor.calls().try_into().expect("one cargo call");
        let result_dir = fixture.workdir.join("libnode");
        assert_eq!(call.env_value(verify::LIBNODE_PATH_VAR), Some(result_dir.as_str()));
    }

    #[test]
    fn report_serializes_stage_names() {
        let json = serde_json::to_string(&Stage::Postproc).expect("serialize");
        assert_eq!(json, "\"postproc\"");
    }
}
