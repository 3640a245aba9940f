//! Data directory resolution and the on-disk cache layout.
//!
//! ```text
//! <data_dir>/kdev/<tool>/<version>/<tool>
//! ```
//!
//! `<data_dir>` follows the XDG base directory convention:
//! `$XDG_DATA_HOME` if set, `~/.local/share` if it already exists, and
//! `~/.kdev` otherwise. Nothing here creates directories.

use crate::error::{KdevError, Result};
use crate::fs::Filesystem;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "XDG_DATA_HOME";

/// Directory under the data dir that holds every cached tool.
const CACHE_DIR_NAME: &str = "kdev";

/// Resolve the data directory from the current environment.
pub fn resolve_data_dir(fs: &dyn Filesystem) -> Result<PathBuf> {
    resolve_data_dir_from(std::env::var_os(DATA_DIR_ENV), dirs::home_dir(), fs)
}

/// Resolve the data directory from explicit inputs.
pub fn resolve_data_dir_from(
    env_override: Option<OsString>,
    home: Option<PathBuf>,
    fs: &dyn Filesystem,
) -> Result<PathBuf> {
    if let Some(dir) = env_override.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let home = home.ok_or(KdevError::HomeDirNotFound)?;

    let local_share = home.join(".local").join("share");
    if fs.is_dir(&local_share) {
        return Ok(local_share);
    }

    Ok(home.join(".kdev"))
}

/// Paths of cached tools under a resolved data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: data_dir.into().join(CACHE_DIR_NAME),
        }
    }

    /// Resolve the data directory and build the layout on top of it.
    pub fn resolve(fs: &dyn Filesystem) -> Result<Self> {
        Ok(Self::new(resolve_data_dir(fs)?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<tool>`: one subdirectory per cached version.
    pub fn tool_dir(&self, tool: &str) -> PathBuf {
        self.root.join(tool)
    }

    pub fn version_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.tool_dir(tool).join(version)
    }

    pub fn binary_path(&self, tool: &str, version: &str) -> PathBuf {
        self.version_dir(tool, version).join(tool)
    }
}
