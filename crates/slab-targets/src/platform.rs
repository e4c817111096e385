//! Host platform model.
//!
//! Encodes the running OS and CPU architecture into the platform tag used
//! by wheel filenames, and pairs it with an interpreter tag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TargetError};

/// Operating system families that have a platform tag encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
}

impl OsFamily {
    /// Map an OS name (as reported by `std::env::consts::OS`) to a family.
    ///
    /// Both `macos` and `darwin` are accepted for Apple hosts.
    pub fn from_os_name(os: &str, arch: &str) -> Result<Self> {
        match os.to_ascii_lowercase().as_str() {
            "linux" => Ok(OsFamily::Linux),
            "macos" | "darwin" => Ok(OsFamily::MacOs),
            "windows" => Ok(OsFamily::Windows),
            _ => Err(TargetError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }
}

/// A platform tag such as `manylinux2014_x86_64` or `win_amd64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformTag(String);

impl PlatformTag {
    /// Wrap an explicit tag string (used for configuration overrides).
    pub fn new(tag: impl Into<String>) -> Self {
        PlatformTag(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An interpreter tag such as `cp311`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterpreterTag(String);

impl InterpreterTag {
    /// Default interpreter the loader targets when none is configured.
    pub const DEFAULT: &'static str = "cp311";

    /// Parse an interpreter tag.
    ///
    /// The tag must be an ASCII-alphabetic implementation prefix followed
    /// by at least one digit (`cp39`, `pp310`, `py3`).
    pub fn parse(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        let digits_at = tag
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| TargetError::InvalidInterpreter(tag.to_string()))?;
        let (implementation, version) = tag.split_at(digits_at);
        if implementation.is_empty()
            || !implementation.chars().all(|c| c.is_ascii_alphabetic())
            || !version.chars().all(|c| c.is_ascii_digit())
        {
            return Err(TargetError::InvalidInterpreter(tag.to_string()));
        }
        Ok(InterpreterTag(tag.to_ascii_lowercase()))
    }

    /// CPython tag for a `major.minor` runtime.
    pub fn cpython(major: u8, minor: u8) -> Self {
        InterpreterTag(format!("cp{major}{minor}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InterpreterTag {
    fn default() -> Self {
        InterpreterTag(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for InterpreterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The host an artifact must run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPlatform {
    /// Operating system family.
    pub os: OsFamily,
    /// Architecture as reported by the toolchain (e.g., "x86_64", "aarch64").
    pub arch: String,
}

impl HostPlatform {
    /// Detect the platform this process is running on.
    pub fn detect() -> Result<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build a platform from explicit OS and architecture names.
    ///
    /// Fails with [`TargetError::UnsupportedPlatform`] for any OS other
    /// than Linux, macOS, or Windows.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self> {
        let os = OsFamily::from_os_name(os, arch)?;
        Ok(HostPlatform {
            os,
            arch: arch.to_ascii_lowercase(),
        })
    }

    /// Encode this host as a wheel platform tag.
    ///
    /// Linux uses the `manylinux2014` policy, macOS the 10.15 baseline, and
    /// Windows the `win_` prefix. Architecture names follow the spelling the
    /// wheel ecosystem uses on each OS.
    pub fn platform_tag(&self) -> PlatformTag {
        let tag = match self.os {
            OsFamily::Linux => {
                let arch = match self.arch.as_str() {
                    "x86" => "i686",
                    other => other,
                };
                format!("manylinux2014_{arch}")
            }
            OsFamily::MacOs => {
                let arch = match self.arch.as_str() {
                    "aarch64" => "arm64",
                    other => other,
                };
                format!("macosx_10_15_{arch}")
            }
            OsFamily::Windows => match self.arch.as_str() {
                "x86_64" => "win_amd64".to_string(),
                "aarch64" => "win_arm64".to_string(),
                other => format!("win_{other}"),
            },
        };
        PlatformTag(tag)
    }
}

/// Platform and interpreter tags an artifact is matched against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTags {
    pub platform: PlatformTag,
    pub interpreter: InterpreterTag,
}

impl TargetTags {
    pub fn new(platform: PlatformTag, interpreter: InterpreterTag) -> Self {
        TargetTags {
            platform,
            interpreter,
        }
    }

    /// Tags for the running host and the given interpreter.
    pub fn for_host(interpreter: InterpreterTag) -> Result<Self> {
        let host = HostPlatform::detect()?;
        Ok(TargetTags::new(host.platform_tag(), interpreter))
    }
}

impl fmt::Display for TargetTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.interpreter, self.platform)
    }
}
