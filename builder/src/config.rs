//! Environment-style build settings.
//!
//! CI drivers configure a build through `LIBNODE_*` variables. The loader
//! takes a lookup function so the rest of the crate never touches process
//! environment directly; [`Settings::from_env`] is the thin production
//! wrapper and tests pass closures over fixed maps instead.

use crate::error::{BuilderError, Result};
use crate::target::{Architecture, HostOs, TargetRequest};
use camino::Utf8PathBuf;

/// Version of the Node.js source tree, e.g. `v20.0.0`.
pub const NODE_VERSION_KEY: &str = "LIBNODE_NODE_VERSION";
/// Whitespace-separated extra configure flags.
pub const CONFIG_FLAGS_KEY: &str = "LIBNODE_CONFIG_FLAGS";
/// Target architecture token.
pub const ARCH_KEY: &str = "LIBNODE_ARCH";
/// Suffix appended to the archive name.
pub const ZIP_SUFFIX_KEY: &str = "LIBNODE_ZIP_SUFFIX";
/// Set to `1` to build with small ICU.
pub const SMALL_ICU_KEY: &str = "LIBNODE_SMALL_ICU";
/// Python interpreter used to run `configure.py`.
pub const PYTHON_KEY: &str = "LIBNODE_PYTHON";
/// Parallel job count for `make`.
pub const JOBS_KEY: &str = "LIBNODE_JOBS";
/// Header handed to bindgen.
pub const HEADER_KEY: &str = "LIBNODE_HEADER";

/// Default `make` parallelism.
pub const DEFAULT_JOBS: usize = 4;
/// Default interpreter for `configure.py`.
pub const DEFAULT_PYTHON: &str = "python3";
/// Default bindgen input, relative to the working directory.
pub const DEFAULT_HEADER: &str = "patch/node/src/node_embedding_api.h";

/// Fully resolved settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Node.js version; selects the `node-{version}` source directory.
    pub node_version: String,
    /// Extra configure flags, in order.
    pub config_flags: Vec<String>,
    /// Requested target architecture.
    pub architecture: Architecture,
    /// User suffix for the archive name.
    pub zip_suffix: String,
    /// Whether to build with small ICU.
    pub small_icu: bool,
    /// Interpreter for `configure.py`.
    pub python: String,
    /// `make` parallelism.
    pub jobs: usize,
    /// Header for bindgen, relative paths resolved against the working
    /// directory.
    pub header: Utf8PathBuf,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `lookup`, which returns the value for a key.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::MissingConfig`] when no Node.js version is
    /// given and [`BuilderError::InvalidConfig`] for unparseable values.
    ///
    /// # Examples
    ///
    /// ```
    /// use libnode_builder::config::Settings;
    /// use libnode_builder::target::Architecture;
    ///
    /// let settings = Settings::from_lookup(|key| match key {
    ///     "LIBNODE_NODE_VERSION" => Some("v20.0.0".to_owned()),
    ///     "LIBNODE_ARCH" => Some("arm64".to_owned()),
    ///     _ => None,
    /// })
    /// .expect("valid settings");
    /// assert_eq!(settings.architecture, Architecture::Arm64);
    /// assert_eq!(settings.source_dir_name(), "node-v20.0.0");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let node_version = get(NODE_VERSION_KEY).ok_or(BuilderError::MissingConfig {
            key: NODE_VERSION_KEY,
        })?;

        let architecture = match get(ARCH_KEY) {
            Some(value) => value.trim().parse()?,
            None => Architecture::X64,
        };

        let jobs = match get(JOBS_KEY) {
            Some(value) => parse_jobs(&value)?,
            None => DEFAULT_JOBS,
        };

        Ok(Self {
            node_version: node_version.trim().to_owned(),
            config_flags: split_flags(get(CONFIG_FLAGS_KEY).as_deref().unwrap_or_default()),
            architecture,
            zip_suffix: lookup(ZIP_SUFFIX_KEY).unwrap_or_default(),
            small_icu: lookup(SMALL_ICU_KEY).as_deref() == Some("1"),
            python: get(PYTHON_KEY).unwrap_or_else(|| DEFAULT_PYTHON.to_owned()),
            jobs,
            header: get(HEADER_KEY).map_or_else(|| Utf8PathBuf::from(DEFAULT_HEADER), Utf8PathBuf::from),
        })
    }

    /// Name of the extracted source directory, `node-{version}`.
    #[must_use]
    pub fn source_dir_name(&self) -> String {
        format!("node-{}", self.node_version)
    }

    /// Build the resolver input for `host_os`.
    #[must_use]
    pub fn target_request(&self, host_os: HostOs) -> TargetRequest {
        TargetRequest {
            architecture: self.architecture,
            host_os,
            user_flags: self.config_flags.clone(),
            zip_suffix: self.zip_suffix.clone(),
            small_icu: self.small_icu,
        }
    }
}

/// Split a flag string on whitespace, dropping empty pieces.
#[must_use]
pub fn split_flags(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_owned).collect()
}

fn parse_jobs(value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(BuilderError::InvalidConfig {
            key: JOBS_KEY,
            reason: "job count must be at least 1".to_owned(),
        }),
        Ok(jobs) => Ok(jobs),
        Err(e) => Err(BuilderError::InvalidConfig {
            key: JOBS_KEY,
            reason: e.to_string(),
        }),
    }
}
