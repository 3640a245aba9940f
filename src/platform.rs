//! Platform detection for building download URLs.
//!
//! Upstream Kubernetes projects publish binaries named after Go's
//! `GOOS`/`GOARCH` pairs, so Rust's target names are mapped onto those:
//!
//! | Rust (`std::env::consts`) | Upstream |
//! |---------------------------|----------|
//! | `macos`                   | `darwin` |
//! | `x86_64`                  | `amd64`  |
//! | `aarch64`                 | `arm64`  |
//!
//! # Examples
//!
//! ```
//! use kdev::platform::Platform;
//!
//! let platform = Platform::current();
//! println!("{}/{}", platform.os, platform.arch);
//! // Output: "linux/amd64" on an x86_64 Linux box
//! ```

use std::fmt;

/// Operating system and CPU architecture in upstream naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub const fn new(os: &'static str, arch: &'static str) -> Self {
        Self { os, arch }
    }

    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust target names to upstream names; unknown names pass through.
    pub fn from_rust(os: &'static str, arch: &'static str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            // Rust names both byte orders `powerpc64`
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            "powerpc64" => "ppc64",
            other => other,
        };
        Self { os, arch }
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
