//! External command execution.
//!
//! Every external tool the pipeline drives (the Node.js build scripts,
//! `bindgen`, `ar`, `lib`, `strip`, `cargo`) is described by a
//! [`CommandSpec`] and spawned through a [`CommandExecutor`]. Environment
//! overlays and working directories travel with each command, so nothing here
//! mutates process-wide state.

use crate::error::{BuilderError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::fmt;
use std::process::{Command, Output};

/// A fully described invocation of an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    current_dir: Option<Utf8PathBuf>,
}

impl CommandSpec {
    /// Describe a run of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a variable to the environment overlay.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run the program inside `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// The program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument vector, excluding the program.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The environment overlay, in insertion order.
    #[must_use]
    pub fn env_overlay(&self) -> &[(String, String)] {
        &self.env
    }

    /// Look up a variable in the environment overlay.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// The working directory, if one was set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.current_dir.as_deref()
    }

    /// Convert into a [`std::process::Command`].
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value:?} ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        if let Some(dir) = &self.current_dir {
            write!(f, " (in {dir})")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs the command to completion and returns its captured output.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::ToolSpawn`] if the program cannot be started.
    fn run(&self, command: &CommandSpec) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, command: &CommandSpec) -> Result<Output> {
        command
            .to_command()
            .output()
            .map_err(|source| BuilderError::ToolSpawn {
                tool: command.program().to_owned(),
                source,
            })
    }
}

/// Run `command` and treat any non-zero exit as fatal.
///
/// # Errors
///
/// Returns [`BuilderError::ToolchainFailure`] carrying the captured output
/// when the tool exits unsuccessfully, or the executor's spawn error.
pub fn run_checked(executor: &dyn CommandExecutor, command: &CommandSpec) -> Result<Output> {
    debug!("running {command}");
    let output = executor.run(command)?;
    trace!(
        "{} stdout: {}",
        command.program(),
        String::from_utf8_lossy(&output.stdout)
    );

    if output.status.success() {
        return Ok(output);
    }

    Err(BuilderError::ToolchainFailure {
        tool: command.program().to_owned(),
        status: output.status.to_string(),
        output: failure_text(&output),
    })
}

/// Turn `path` into an absolute UTF-8 path without touching the filesystem.
///
/// Tools often run in a directory other than the caller's, so paths handed
/// to them go through here first.
///
/// # Errors
///
/// Returns [`BuilderError::Io`] if the current directory is unavailable or
/// the result is not UTF-8.
pub fn absolute_dir(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let absolute = std::path::absolute(path)?;
    Utf8PathBuf::from_path_buf(absolute).map_err(|p| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} is not valid UTF-8", p.display()),
        )
        .into()
    })
}

/// Prefer stderr; fall back to stdout for tools that report errors there.
fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_owned()
    } else {
        stderr.trim().to_owned()
    }
}
