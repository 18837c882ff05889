//! CLI argument definitions for the libnode builder.
//!
//! Every setting can come from a `LIBNODE_*` environment variable; the
//! flags here override those values for a single run.

use crate::config::Settings;
use crate::pipeline::Stage;
use crate::target::Architecture;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};

/// Build Node.js as a static library and package it.
#[derive(Parser, Debug, Default)]
#[command(name = "libnode-builder")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build Node.js as a static library and package it.\n\n",
    "Runs in a working directory containing the extracted node-<version> ",
    "source tree. The build stage configures and compiles it, postproc ",
    "collects the static libraries and bindings into libnode/, and archive ",
    "zips libnode/ into libnode-<version>-<os>-<arch>[suffix].zip.\n\n",
    "Settings are read from LIBNODE_* environment variables and can be ",
    "overridden with the flags below.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  LIBNODE_NODE_VERSION   Node.js version (required)\n",
    "  LIBNODE_CONFIG_FLAGS   Extra configure flags\n",
    "  LIBNODE_ARCH           x64, arm64, or x86 [default: x64]\n",
    "  LIBNODE_ZIP_SUFFIX     Suffix for the archive name\n",
    "  LIBNODE_SMALL_ICU      Set to 1 to build with small ICU\n",
    "  LIBNODE_PYTHON         Interpreter for configure.py [default: python3]\n",
    "  LIBNODE_JOBS           make parallelism [default: 4]\n",
    "  LIBNODE_HEADER         bindgen input header\n\n",
    "EXAMPLES:\n",
    "  Build, assemble, and archive:\n",
    "    $ LIBNODE_NODE_VERSION=v20.0.0 libnode-builder\n\n",
    "  Re-run post-processing only:\n",
    "    $ libnode-builder --node-version v20.0.0 postproc\n\n",
    "  Show the resolved target as JSON:\n",
    "    $ libnode-builder --node-version v20.0.0 --arch arm64 --json resolve",
))]
pub struct Cli {
    /// Stage to run (defaults to `all`).
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Global options.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Build, assemble, and archive (default).
    All,
    /// Configure and compile the source tree.
    Build,
    /// Assemble libnode/ from the build output.
    Postproc,
    /// Zip libnode/ and write its checksum.
    Archive,
    /// Run a consuming crate's tests against libnode/.
    Test(TestArgs),
    /// Print the resolved target and archive name.
    Resolve,
}

impl Command {
    /// Pipeline stages this command runs; empty for commands outside the
    /// stage pipeline.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        match self {
            Self::All => Stage::ALL.to_vec(),
            Self::Build => vec![Stage::Build],
            Self::Postproc => vec![Stage::Postproc],
            Self::Archive => vec![Stage::Archive],
            Self::Test(_) | Self::Resolve => Vec::new(),
        }
    }
}

/// Arguments for the test command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TestArgs {
    /// Directory of the crate whose tests consume the libraries.
    #[arg(long, value_name = "DIR")]
    pub crate_dir: Utf8PathBuf,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Working directory containing the source tree [default: current].
    #[arg(short = 'C', long, value_name = "DIR", global = true)]
    pub workdir: Option<Utf8PathBuf>,

    /// Target architecture (overrides LIBNODE_ARCH).
    #[arg(long, value_name = "ARCH", global = true)]
    pub arch: Option<Architecture>,

    /// Node.js version (overrides LIBNODE_NODE_VERSION).
    #[arg(long, value_name = "VERSION", global = true)]
    pub node_version: Option<String>,

    /// Build with the small ICU data set.
    #[arg(long, global = true)]
    pub small_icu: bool,

    /// Suffix for the archive name (overrides LIBNODE_ZIP_SUFFIX).
    #[arg(long, value_name = "SUFFIX", global = true)]
    pub zip_suffix: Option<String>,

    /// Number of parallel make jobs (overrides LIBNODE_JOBS).
    #[arg(short, long, value_name = "N", global = true)]
    pub jobs: Option<usize>,

    /// Show what would run and exit without executing anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity", global = true)]
    pub quiet: bool,

    /// Print a JSON report on stdout instead of the archive path.
    #[arg(long, global = true)]
    pub json: bool,
}

impl Cli {
    /// The command to run, defaulting to [`Command::All`].
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::All)
    }

    /// The working directory, defaulting to the current directory.
    #[must_use]
    pub fn workdir(&self) -> &Utf8Path {
        self.global
            .workdir
            .as_deref()
            .unwrap_or(Utf8Path::new("."))
    }
}

impl GlobalArgs {
    /// Lay CLI overrides over environment-derived lookups.
    ///
    /// The returned closure answers configuration keys from flags first and
    /// `fallback` second, so [`Settings::from_lookup`] validates both
    /// sources the same way.
    pub fn overlay<'a, F>(&'a self, fallback: F) -> impl Fn(&str) -> Option<String> + 'a
    where
        F: Fn(&str) -> Option<String> + 'a,
    {
        use crate::config::{ARCH_KEY, JOBS_KEY, NODE_VERSION_KEY, SMALL_ICU_KEY, ZIP_SUFFIX_KEY};

        move |key| {
            let flag = match key {
                NODE_VERSION_KEY => self.node_version.clone(),
                ARCH_KEY => self.arch.map(|arch| arch.token().to_owned()),
                ZIP_SUFFIX_KEY => self.zip_suffix.clone(),
                SMALL_ICU_KEY => self.small_icu.then(|| "1".to_owned()),
                JOBS_KEY => self.jobs.map(|jobs| jobs.to_string()),
                _ => None,
            };
            flag.or_else(|| fallback(key))
        }
    }

    /// Resolve settings from flags over the process environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_lookup`].
    pub fn settings(&self) -> crate::error::Result<Settings> {
        Settings::from_lookup(self.overlay(|key| std::env::var(key).ok()))
    }
}
