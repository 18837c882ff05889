//! Target resolution.
//!
//! Turns an architecture, host OS, and feature request into a validated
//! [`TargetDescriptor`]. Resolution is pure: it never reads the process
//! environment, so callers gather inputs (see [`crate::config`]) and tests
//! can enumerate every combination.
//!
//! # Sub-modules
//!
//! - [`platform`] - `Architecture` and `HostOs` enumerations, `Host` detection.
//! - [`triple`] - Target triple allow-list (`TargetTriple`).

pub mod platform;
pub mod triple;

pub use platform::{Architecture, Host, HostOs};
pub use triple::TargetTriple;

use crate::error::Result;
use serde::Serialize;

/// Flag that makes the Node.js build produce static libraries.
pub const STATIC_LINK_FLAG: &str = "--enable-static";

/// Flag selecting the reduced-footprint ICU data build.
pub const SMALL_ICU_FLAG: &str = "--with-intl=small-icu";

/// Archive-name suffix marking a small-ICU build.
pub const SMALL_ICU_SUFFIX: &str = "-small_icu";

/// Raw inputs for [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRequest {
    /// Requested target architecture.
    pub architecture: Architecture,
    /// Operating system the build runs on.
    pub host_os: HostOs,
    /// Extra configure flags, passed through verbatim and in order.
    pub user_flags: Vec<String>,
    /// User-provided suffix for the archive name.
    pub zip_suffix: String,
    /// Whether the reduced-footprint ICU build was requested.
    pub small_icu: bool,
}

impl TargetRequest {
    /// A request with no extra flags, no suffix, and full ICU.
    #[must_use]
    pub fn new(architecture: Architecture, host_os: HostOs) -> Self {
        Self {
            architecture,
            host_os,
            user_flags: Vec::new(),
            zip_suffix: String::new(),
            small_icu: false,
        }
    }
}

/// A validated build target.
///
/// # Examples
///
/// ```
/// use libnode_builder::target::{Architecture, HostOs, TargetRequest, resolve};
///
/// let descriptor = resolve(&TargetRequest::new(Architecture::Arm64, HostOs::Darwin))
///     .expect("supported target");
/// assert_eq!(descriptor.triple().as_str(), "aarch64-apple-darwin");
/// assert_eq!(descriptor.config_flags(), ["--enable-static"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    architecture: Architecture,
    host_os: HostOs,
    triple: TargetTriple,
    config_flags: Vec<String>,
    zip_suffix: String,
}

impl TargetDescriptor {
    /// The target architecture.
    #[must_use]
    pub const fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// The host (and target) operating system.
    #[must_use]
    pub const fn host_os(&self) -> HostOs {
        self.host_os
    }

    /// The validated target triple.
    #[must_use]
    pub const fn triple(&self) -> &TargetTriple {
        &self.triple
    }

    /// Configure flags, starting with [`STATIC_LINK_FLAG`].
    #[must_use]
    pub fn config_flags(&self) -> &[String] {
        &self.config_flags
    }

    /// Suffix appended to the archive name.
    #[must_use]
    pub fn zip_suffix(&self) -> &str {
        &self.zip_suffix
    }
}

/// Resolve and validate a build target.
///
/// # Errors
///
/// Returns [`crate::error::BuilderError::UnsupportedTarget`] naming the
/// rejected triple when the architecture/OS combination is not supported.
pub fn resolve(request: &TargetRequest) -> Result<TargetDescriptor> {
    let triple = TargetTriple::try_from(format!(
        "{}-{}",
        request.architecture.triple_component(),
        request.host_os.triple_suffix()
    ))?;

    let mut config_flags = Vec::with_capacity(request.user_flags.len() + 2);
    config_flags.push(STATIC_LINK_FLAG.to_owned());
    config_flags.extend(request.user_flags.iter().cloned());

    let mut zip_suffix = request.zip_suffix.clone();
    if request.small_icu {
        config_flags.push(SMALL_ICU_FLAG.to_owned());
        zip_suffix.push_str(SMALL_ICU_SUFFIX);
    }

    Ok(TargetDescriptor {
        architecture: request.architecture,
        host_os: request.host_os,
        triple,
        config_flags,
        zip_suffix,
    })
}
