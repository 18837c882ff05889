//! Shared test utilities for the builder crate.

use crate::error::Result;
use crate::exec::{CommandExecutor, CommandSpec};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    #[expect(clippy::cast_sign_loss, reason = "test exit codes are small")]
    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        stdout: stdout.as_bytes().to_vec(),
        ..success_output()
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "ar").
    pub program: &'static str,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Replays expected command invocations in order and returns predefined
/// results, allowing tests to verify exact argument vectors without side
/// effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, command: &CommandSpec) -> Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command invocation: {command}"));

        assert_eq!(call.program, command.program());
        assert_eq!(call.args.as_slice(), command.arguments());

        call.result
    }
}

/// A `CommandExecutor` that records every invocation.
///
/// Every command succeeds with empty output unless its program matches the
/// configured failing tool. An optional `ar t` listing can be supplied so
/// archive merges see members.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: RefCell<Vec<CommandSpec>>,
    failing_tool: Option<String>,
    archive_listing: String,
}

impl RecordingExecutor {
    /// An executor on which every command succeeds.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// An executor on which commands for `tool` exit with status 1.
    #[must_use]
    pub fn failing_on(tool: &str) -> Self {
        Self {
            failing_tool: Some(tool.to_owned()),
            ..Self::default()
        }
    }

    /// Return `listing` as stdout for every `ar t` invocation.
    #[must_use]
    pub fn with_archive_listing(mut self, listing: &str) -> Self {
        listing.clone_into(&mut self.archive_listing);
        self
    }

    /// All recorded invocations, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Recorded invocations of `program`, in order.
    #[must_use]
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.program() == program)
            .cloned()
            .collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn run(&self, command: &CommandSpec) -> Result<Output> {
        self.calls.borrow_mut().push(command.clone());

        if self.failing_tool.as_deref() == Some(command.program()) {
            return Ok(failure_output("stubbed failure"));
        }

        let is_listing = command.program() == "ar"
            && command.arguments().first().map(String::as_str) == Some("t");
        if is_listing {
            return Ok(stdout_output(&self.archive_listing));
        }

        Ok(success_output())
    }
}
