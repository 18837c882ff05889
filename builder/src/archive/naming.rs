//! Archive naming policy.
//!
//! Names follow `libnode-{version}-{os}-{arch}{suffix}.zip`, built only from
//! the Node.js version and the resolved target, never from timestamps, so a
//! rebuild of the same target overwrites its predecessor.

use crate::target::{Architecture, HostOs, TargetDescriptor};
use std::fmt;

/// The fixed prefix for all archive names.
const ARCHIVE_PREFIX: &str = "libnode";

/// The fixed file extension for archives.
const ARCHIVE_EXTENSION: &str = ".zip";

/// A fully-qualified archive name.
///
/// # Examples
///
/// ```
/// use libnode_builder::archive::naming::ArchiveName;
/// use libnode_builder::target::{Architecture, HostOs, TargetRequest, resolve};
///
/// let descriptor = resolve(&TargetRequest::new(Architecture::Arm64, HostOs::Darwin))
///     .expect("supported target");
/// let name = ArchiveName::new("20.0.0", &descriptor);
/// assert_eq!(name.to_string(), "libnode-20.0.0-darwin-arm64.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    version: String,
    host_os: HostOs,
    architecture: Architecture,
    suffix: String,
}

impl ArchiveName {
    /// Name the archive for `descriptor` built from Node.js `version`.
    #[must_use]
    pub fn new(version: &str, descriptor: &TargetDescriptor) -> Self {
        Self {
            version: version.to_owned(),
            host_os: descriptor.host_os(),
            architecture: descriptor.architecture(),
            suffix: descriptor.zip_suffix().to_owned(),
        }
    }

    /// Return the filename as a string without consuming the value.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ARCHIVE_PREFIX}-{}-{}-{}{}{ARCHIVE_EXTENSION}",
            self.version,
            self.host_os.archive_token(),
            self.architecture.token(),
            self.suffix
        )
    }
}
