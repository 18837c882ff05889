//! Architecture and host operating system enumerations.

use crate::error::{BuilderError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Target CPU architecture, named the way the Node.js build scripts name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// 64-bit x86.
    X64,
    /// 64-bit ARM.
    Arm64,
    /// 32-bit x86.
    X86,
}

impl Architecture {
    /// All supported architectures.
    pub const ALL: [Self; 3] = [Self::X64, Self::Arm64, Self::X86];

    /// The token used by `configure.py --dest-cpu`, `vcbuild.bat`, and the
    /// archive name.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
            Self::X86 => "x86",
        }
    }

    /// The architecture component of a target triple.
    #[must_use]
    pub const fn triple_component(self) -> &'static str {
        match self {
            Self::X64 => "x86_64",
            Self::Arm64 => "aarch64",
            Self::X86 => "i686",
        }
    }

    /// The name Apple's compiler drivers accept for `-arch`.
    #[must_use]
    pub const fn darwin_arch_flag(self) -> &'static str {
        match self {
            Self::X64 => "x86_64",
            Self::Arm64 => "arm64",
            Self::X86 => "i386",
        }
    }

    /// Detect the architecture this process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::UnsupportedHost`] on architectures with no
    /// Node.js build support.
    pub fn current() -> Result<Self> {
        Self::from_rust_arch(std::env::consts::ARCH)
    }

    /// Map a Rust `target_arch` name onto an architecture.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::UnsupportedHost`] for unknown names.
    pub fn from_rust_arch(arch: &str) -> Result<Self> {
        match arch {
            "x86_64" => Ok(Self::X64),
            "aarch64" => Ok(Self::Arm64),
            "x86" => Ok(Self::X86),
            other => Err(BuilderError::UnsupportedHost {
                os: format!("{} ({other})", std::env::consts::OS),
            }),
        }
    }
}

impl FromStr for Architecture {
    type Err = BuilderError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|arch| arch.token() == value)
            .ok_or_else(|| BuilderError::InvalidConfig {
                key: "LIBNODE_ARCH",
                reason: format!("\"{value}\" is not one of x64, arm64, x86"),
            })
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Operating system the build runs on. Builds are never cross-OS, so this is
/// also the target OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    /// Linux with the GNU toolchain.
    Linux,
    /// Windows with MSVC.
    Windows,
    /// macOS.
    Darwin,
}

impl HostOs {
    /// All supported host operating systems.
    pub const ALL: [Self; 3] = [Self::Linux, Self::Windows, Self::Darwin];

    /// The vendor/OS/ABI part of a target triple.
    #[must_use]
    pub const fn triple_suffix(self) -> &'static str {
        match self {
            Self::Linux => "unknown-linux-gnu",
            Self::Windows => "pc-windows-msvc",
            Self::Darwin => "apple-darwin",
        }
    }

    /// The platform token used in archive names.
    ///
    /// These are the platform names downstream consumers match when they
    /// pick an archive to download.
    #[must_use]
    pub const fn archive_token(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "win32",
            Self::Darwin => "darwin",
        }
    }

    /// File extension of static libraries on this platform, without the dot.
    #[must_use]
    pub const fn static_lib_extension(self) -> &'static str {
        match self {
            Self::Windows => "lib",
            Self::Linux | Self::Darwin => "a",
        }
    }

    /// Detect the operating system this process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::UnsupportedHost`] on any other OS.
    pub fn current() -> Result<Self> {
        Self::from_rust_os(std::env::consts::OS)
    }

    /// Map a Rust `target_os` name onto a host OS.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::UnsupportedHost`] for unknown names.
    pub fn from_rust_os(os: &str) -> Result<Self> {
        match os {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            "macos" => Ok(Self::Darwin),
            other => Err(BuilderError::UnsupportedHost {
                os: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.archive_token())
    }
}

/// The machine running the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Host {
    /// Operating system of the build machine.
    pub os: HostOs,
    /// Native architecture of the build machine.
    pub architecture: Architecture,
}

impl Host {
    /// Detect the running host.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::UnsupportedHost`] when either the OS or the
    /// architecture is unknown.
    pub fn current() -> Result<Self> {
        Ok(Self {
            os: HostOs::current()?,
            architecture: Architecture::current()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::x64("x64", Architecture::X64)]
    #[case::arm64("arm64", Architecture::Arm64)]
    #[case::x86("x86", Architecture::X86)]
    fn parses_architecture_tokens(#[case] token: &str, #[case] expected: Architecture) {
        let arch: Architecture = token.parse().expect("known token");
        assert_eq!(arch, expected);
        assert_eq!(arch.to_string(), token);
    }

    #[rstest]
    #[case::rust_name("x86_64")]
    #[case::upper("X64")]
    #[case::empty("")]
    fn rejects_unknown_architecture_tokens(#[case] token: &str) {
        let err = token.parse::<Architecture>().expect_err("unknown token");
        assert!(matches!(err, BuilderError::InvalidConfig { key: "LIBNODE_ARCH", .. }));
    }

    #[rstest]
    #[case::linux("linux", HostOs::Linux)]
    #[case::windows("windows", HostOs::Windows)]
    #[case::macos("macos", HostOs::Darwin)]
    fn maps_rust_os_names(#[case] name: &str, #[case] expected: HostOs) {
        assert_eq!(HostOs::from_rust_os(name).expect("known os"), expected);
    }

    #[test]
    fn rejects_other_operating_systems() {
        let err = HostOs::from_rust_os("freebsd").expect_err("unsupported os");
        assert!(err.to_string().contains("freebsd"));
    }

    #[test]
    fn windows_uses_lib_extension() {
        assert_eq!(HostOs::Windows.static_lib_extension(), "lib");
        assert_eq!(HostOs::Darwin.static_lib_extension(), "a");
    }
}
