//! Host platform identifiers.
//!
//! Release artifacts are published per operating system and CPU
//! architecture. A spec file may list several variants; the installer picks
//! the one matching [`Platform::current`].
//!
//! # Example
//!
//! ```
//! use binst_schema::Platform;
//!
//! match Platform::current() {
//!     Ok(host) => println!("Running on: {host}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The running host has no [`Platform`] equivalent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported host platform: {os}/{arch}")]
pub struct UnsupportedHost {
    /// `std::env::consts::OS` of the host
    pub os: String,
    /// `std::env::consts::ARCH` of the host
    pub arch: String,
}

/// CPU architecture of a release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit ARM (Apple Silicon, Graviton, ...)
    #[serde(alias = "aarch64")]
    Arm64,
    /// `x86_64` / amd64
    #[serde(alias = "amd64")]
    X86_64,
    /// Works on every architecture of its OS (fat binaries, scripts).
    Universal,
}

impl Arch {
    /// Architecture of the running host, if artifacts can exist for it.
    pub fn current() -> Option<Self> {
        Self::from_target(std::env::consts::ARCH)
    }

    /// Map a Rust `target_arch` name. `Universal` is never a host.
    pub fn from_target(arch: &str) -> Option<Self> {
        match arch {
            "aarch64" => Some(Self::Arm64),
            "x86_64" => Some(Self::X86_64),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::Universal => "universal",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "amd64" | "x64" => Ok(Self::X86_64),
            "universal" => Ok(Self::Universal),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

/// Operating system of a release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// macOS
    #[serde(alias = "darwin")]
    Macos,
    /// Linux
    Linux,
    /// Windows
    Windows,
}

impl Os {
    /// Operating system of the running host, if supported.
    pub fn current() -> Option<Self> {
        Self::from_target(std::env::consts::OS)
    }

    /// Map a Rust `target_os` name.
    pub fn from_target(os: &str) -> Option<Self> {
        match os {
            "macos" => Some(Self::Macos),
            "linux" => Some(Self::Linux),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            _ => Err(format!("Unknown operating system: {s}")),
        }
    }
}

/// An `(os, arch)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system
    pub os: Os,
    /// CPU architecture
    pub arch: Arch,
}

impl Platform {
    /// Build a platform from its parts.
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The running host.
    ///
    /// Hosts outside the known OS and architecture set are an error rather
    /// than a guess, so an artifact built for another CPU is never selected.
    pub fn current() -> Result<Self, UnsupportedHost> {
        Self::from_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Platform for Rust `target_os` / `target_arch` names.
    pub fn from_target(os: &str, arch: &str) -> Result<Self, UnsupportedHost> {
        match (Os::from_target(os), Arch::from_target(arch)) {
            (Some(os), Some(arch)) => Ok(Self::new(os, arch)),
            _ => Err(UnsupportedHost {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_naming_aliases() {
        assert_eq!("aarch64".parse::<Arch>(), Ok(Arch::Arm64));
        assert_eq!("AMD64".parse::<Arch>(), Ok(Arch::X86_64));
        assert_eq!("darwin".parse::<Os>(), Ok(Os::Macos));
        assert!("sparc".parse::<Arch>().is_err());
    }

    #[test]
    fn unknown_hosts_are_rejected() {
        assert_eq!(
            Platform::from_target("linux", "aarch64"),
            Ok(Platform::new(Os::Linux, Arch::Arm64))
        );
        assert_eq!(
            Platform::from_target("macos", "x86_64"),
            Ok(Platform::new(Os::Macos, Arch::X86_64))
        );

        let err = Platform::from_target("linux", "riscv64").unwrap_err();
        assert_eq!(err.arch, "riscv64");
        assert!(Platform::from_target("freebsd", "x86_64").is_err());
        assert!(Platform::from_target("linux", "x86").is_err());
    }

    #[test]
    fn display_joins_os_and_arch() {
        let p = Platform::new(Os::Macos, Arch::Arm64);
        assert_eq!(p.to_string(), "macos-arm64");
    }
}
