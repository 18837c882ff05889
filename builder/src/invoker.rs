//! Native build orchestration for the Node.js source tree.
//!
//! The build branches on the host OS: Windows drives `vcbuild.bat` with the
//! configure flags in an environment variable, while macOS and Linux run
//! `configure.py` followed by a parallel `make`. Each branch is planned as a
//! [`BuildInvocation`] first and only then executed, so the exact commands
//! can be inspected without spawning anything.

use crate::config::{DEFAULT_JOBS, DEFAULT_PYTHON};
use crate::error::Result;
use crate::exec::{CommandExecutor, CommandSpec, run_checked};
use crate::target::{Architecture, HostOs, TargetDescriptor};
use camino::Utf8Path;
use log::info;

/// Environment variable through which `vcbuild.bat` receives its flags.
pub const WINDOWS_FLAGS_VAR: &str = "config_flags";

/// Configuration for the build invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Interpreter used to run `configure.py`.
    pub python: String,
    /// Number of parallel `make` jobs.
    pub jobs: usize,
    /// Architecture of the machine running the build.
    pub host_architecture: Architecture,
}

impl BuildConfig {
    /// Default interpreter and parallelism for a host architecture.
    #[must_use]
    pub fn for_host(host_architecture: Architecture) -> Self {
        Self {
            python: DEFAULT_PYTHON.to_owned(),
            jobs: DEFAULT_JOBS,
            host_architecture,
        }
    }
}

/// The ordered commands that build one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    commands: Vec<CommandSpec>,
}

impl BuildInvocation {
    /// The commands, in execution order.
    #[must_use]
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }
}

/// Drives the native toolchain for a target.
pub struct BuildInvoker {
    config: BuildConfig,
}

impl BuildInvoker {
    /// Create an invoker with the given configuration.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Compute the commands that build `descriptor` in `source_dir`.
    #[must_use]
    pub fn plan(&self, descriptor: &TargetDescriptor, source_dir: &Utf8Path) -> BuildInvocation {
        let commands = match descriptor.host_os() {
            HostOs::Windows => vec![windows_build(descriptor, source_dir)],
            HostOs::Darwin => {
                let overlay = self.darwin_cross_overlay(descriptor.architecture());
                self.posix_build(descriptor, source_dir, &overlay)
            }
            HostOs::Linux => self.posix_build(descriptor, source_dir, &[]),
        };
        BuildInvocation { commands }
    }

    /// Run the build for `descriptor` in `source_dir`.
    ///
    /// Commands run in order and the first failure aborts the build; nothing
    /// is retried because a partially built tree is not safe to re-enter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BuilderError::ToolchainFailure`] naming the
    /// first tool that exits unsuccessfully.
    pub fn invoke(
        &self,
        executor: &dyn CommandExecutor,
        descriptor: &TargetDescriptor,
        source_dir: &Utf8Path,
    ) -> Result<()> {
        info!("building {} in {source_dir}", descriptor.triple());
        for command in self.plan(descriptor, source_dir).commands() {
            run_checked(executor, command)?;
        }
        Ok(())
    }

    /// `configure.py` then `make`, with an optional compiler overlay.
    fn posix_build(
        &self,
        descriptor: &TargetDescriptor,
        source_dir: &Utf8Path,
        overlay: &[(String, String)],
    ) -> Vec<CommandSpec> {
        let configure = overlay.iter().fold(
            CommandSpec::new(&self.config.python)
                .arg("configure.py")
                .args(descriptor.config_flags().iter().cloned())
                .arg(format!("--dest-cpu={}", descriptor.architecture().token()))
                .current_dir(source_dir),
            |spec, (key, value)| spec.env(key.clone(), value.clone()),
        );
        let make = overlay.iter().fold(
            CommandSpec::new("make")
                .arg(format!("-j{}", self.config.jobs))
                .current_dir(source_dir),
            |spec, (key, value)| spec.env(key.clone(), value.clone()),
        );
        vec![configure, make]
    }

    /// Compiler overrides for building a non-native architecture on macOS.
    ///
    /// gyp compiles host tools and target code with separate compiler
    /// variables; without explicit `-arch` flags both would use the native
    /// architecture.
    fn darwin_cross_overlay(&self, target: Architecture) -> Vec<(String, String)> {
        if target == self.config.host_architecture {
            return Vec::new();
        }
        let host = self.config.host_architecture.darwin_arch_flag();
        let target = target.darwin_arch_flag();
        vec![
            ("CC_host".to_owned(), format!("clang -arch {host}")),
            ("CXX_host".to_owned(), format!("clang++ -arch {host}")),
            ("CC_target".to_owned(), format!("clang -arch {target}")),
            ("CXX_target".to_owned(), format!("clang++ -arch {target}")),
        ]
    }
}

/// `vcbuild.bat` takes the architecture as its only argument and every
/// configure flag through [`WINDOWS_FLAGS_VAR`].
fn windows_build(descriptor: &TargetDescriptor, source_dir: &Utf8Path) -> CommandSpec {
    CommandSpec::new("cmd")
        .args(["/c", "vcbuild.bat", descriptor.architecture().token()])
        .env(WINDOWS_FLAGS_VAR, descriptor.config_flags().join(" "))
        .current_dir(source_dir)
}
