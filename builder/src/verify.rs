//! Consumer test-suite run against a freshly assembled result directory.
//!
//! The consuming crate's build script locates prebuilt libraries through
//! `LIBNODE_PATH`; pointing it at the local result directory exercises the
//! package before it is published.

use crate::error::Result;
use crate::exec::{CommandExecutor, CommandSpec, run_checked};
use crate::target::TargetDescriptor;
use camino::Utf8Path;
use log::info;

/// Variable through which the consuming crate finds the libraries.
pub const LIBNODE_PATH_VAR: &str = "LIBNODE_PATH";

/// The `cargo test` invocation for `crate_dir`.
#[must_use]
pub fn test_command(
    descriptor: &TargetDescriptor,
    crate_dir: &Utf8Path,
    result_dir: &Utf8Path,
) -> CommandSpec {
    CommandSpec::new("cargo")
        .args(["test", "--target", descriptor.triple().as_str(), "-vvvv", "--release"])
        .env(LIBNODE_PATH_VAR, result_dir.as_str())
        .current_dir(crate_dir)
}

/// Run the consuming crate's tests for `descriptor`.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::ToolchainFailure`] if any test
/// fails to build or pass.
pub fn run_consumer_tests(
    executor: &dyn CommandExecutor,
    descriptor: &TargetDescriptor,
    crate_dir: &Utf8Path,
    result_dir: &Utf8Path,
) -> Result<()> {
    info!("testing {crate_dir} against {result_dir}");
    run_checked(executor, &test_command(descriptor, crate_dir, result_dir))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuilderError;
    use crate::exec::MockCommandExecutor;
    use crate::target::{Architecture, HostOs, TargetRequest, resolve};
    use crate::test_utils::{failure_output, success_output};
    use mockall::predicate::function;

    fn descriptor() -> TargetDescriptor {
        resolve(&TargetRequest::new(Architecture::X64, HostOs::Windows)).expect("supported")
    }

    #[test]
    fn command_targets_triple_with_library_path() {
        let command = test_command(
            &descriptor(),
            Utf8Path::new("/src/libnode"),
            Utf8Path::new("/work/libnode"),
        );
        assert_eq!(
            command.arguments(),
            ["test", "--target", "x86_64-pc-windows-msvc", "-vvvv", "--release"]
        );
        assert_eq!(command.env_value(LIBNODE_PATH_VAR), Some("/work/libnode"));
        assert_eq!(command.working_dir(), Some(Utf8Path::new("/src/libnode")));
    }

    #[test]
    fn passing_suite_succeeds() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .with(function(|spec: &CommandSpec| spec.program() == "cargo"))
            .times(1)
            .returning(|_| Ok(success_output()));

        run_consumer_tests(
            &executor,
            &descriptor(),
            Utf8Path::new("/src/libnode"),
            Utf8Path::new("/work/libnode"),
        )
        .expect("tests pass");
    }

    #[test]
    fn failing_suite_names_cargo() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .returning(|_| Ok(failure_output("test simple ... FAILED")));

        let err = run_consumer_tests(
            &executor,
            &descriptor(),
            Utf8Path::new("/src/libnode"),
            Utf8Path::new("/work/libnode"),
        )
        .expect_err("tests fail");
        assert!(matches!(err, BuilderError::ToolchainFailure { ref tool, .. } if tool == "cargo"));
    }
}
