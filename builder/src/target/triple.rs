//! Target triple validation.
//!
//! Only triples the Node.js source tree is known to build as a static
//! library are accepted. Any other triple is rejected at construction time.

use crate::error::{BuilderError, Result};
use serde::Serialize;
use std::fmt;

/// The supported target triples.
const SUPPORTED_TARGETS: &[&str] = &[
    "i686-pc-windows-msvc",
    "x86_64-pc-windows-msvc",
    "aarch64-pc-windows-msvc",
    "x86_64-apple-darwin",
    "aarch64-apple-darwin",
    "x86_64-unknown-linux-gnu",
    "aarch64-unknown-linux-gnu",
];

/// A validated target triple from the supported set.
///
/// # Examples
///
/// ```
/// use libnode_builder::target::TargetTriple;
///
/// let triple: TargetTriple = "aarch64-apple-darwin"
///     .try_into()
///     .expect("valid target triple");
/// assert_eq!(triple.as_str(), "aarch64-apple-darwin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetTriple(String);

impl TargetTriple {
    /// Return the triple as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the full list of supported target triples.
    #[must_use]
    pub fn supported() -> &'static [&'static str] {
        SUPPORTED_TARGETS
    }
}

impl TryFrom<&str> for TargetTriple {
    type Error = BuilderError;

    fn try_from(value: &str) -> Result<Self> {
        if SUPPORTED_TARGETS.contains(&value) {
            Ok(Self(value.to_owned()))
        } else {
            Err(BuilderError::UnsupportedTarget {
                triple: value.to_owned(),
                expected: SUPPORTED_TARGETS.join(", "),
            })
        }
    }
}

impl TryFrom<String> for TargetTriple {
    type Error = BuilderError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for TargetTriple {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
