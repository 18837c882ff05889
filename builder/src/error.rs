//! Error types for the libnode build pipeline.
//!
//! Every variant is fatal: the pipeline never recovers locally from a failed
//! stage, so an archive only exists when every earlier stage succeeded.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while building, assembling, or archiving libnode.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// The architecture and host OS combine into a triple outside the
    /// supported set.
    #[error("unsupported target: {triple}; expected one of: {expected}")]
    UnsupportedTarget {
        /// The rejected triple.
        triple: String,
        /// Comma-separated list of accepted triples.
        expected: String,
    },

    /// The builder is running on an operating system it has no branch for.
    #[error("unsupported host operating system: {os}")]
    UnsupportedHost {
        /// The host OS name as reported by the standard library.
        os: String,
    },

    /// A required configuration key was not provided.
    #[error("missing required setting {key}")]
    MissingConfig {
        /// The environment key that was expected.
        key: &'static str,
    },

    /// A configuration value could not be interpreted.
    #[error("invalid value for {key}: {reason}")]
    InvalidConfig {
        /// The environment key holding the bad value.
        key: &'static str,
        /// Description of the problem.
        reason: String,
    },

    /// An external tool exited with a non-zero status.
    #[error("{tool} failed ({status}): {output}")]
    ToolchainFailure {
        /// Program name of the failing tool.
        tool: String,
        /// Exit status description.
        status: String,
        /// Captured stderr, or stdout when stderr was empty.
        output: String,
    },

    /// An external tool could not be started at all.
    #[error("failed to run {tool}")]
    ToolSpawn {
        /// Program name of the tool.
        tool: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation failed while collecting or merging artifacts.
    #[error("assembly failed: could not {operation} {path}")]
    AssemblyFailure {
        /// What was being attempted.
        operation: &'static str,
        /// The path involved.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the zip archive or its checksum failed.
    #[error("archive {path} could not be written: {reason}")]
    ArchiveFailed {
        /// The archive path.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The run report could not be serialized.
    #[error("report serialization error")]
    Serialization(#[from] serde_json::Error),

    /// An I/O operation failed.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl BuilderError {
    /// Build an [`BuilderError::AssemblyFailure`] from an I/O error.
    #[must_use]
    pub fn assembly(
        operation: &'static str,
        path: impl Into<Utf8PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::AssemblyFailure {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using [`BuilderError`].
pub type Result<T> = std::result::Result<T, BuilderError>;
