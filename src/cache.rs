//! Index of cached tool versions
//!
//! Each tool owns `<root>/<tool>/`, with one subdirectory per version holding
//! a single binary named after the tool. A version directory that does not
//! contain that binary (an interrupted first download, a stray folder) is not
//! an entry: it is ignored here and simply re-used by the next download.

use crate::error::{KdevError, Result};
use crate::fs::Filesystem;
use crate::paths::CacheLayout;
use semver::Version;
use std::cmp::Ordering;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// One cached `(tool, version)` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub version: String,
    pub path: PathBuf,
    pub size: u64,
}

pub struct VersionCache {
    fs: Arc<dyn Filesystem>,
    layout: CacheLayout,
}

impl VersionCache {
    pub fn new(fs: Arc<dyn Filesystem>, layout: CacheLayout) -> Self {
        Self { fs, layout }
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// All cached versions of `tool`, newest first.
    ///
    /// A missing tool directory is an empty cache. Entries whose binary
    /// vanishes between the existence check and the size lookup are skipped.
    pub fn list_cached(&self, tool: &str) -> Result<Vec<CacheEntry>> {
        let tool_dir = self.layout.tool_dir(tool);
        if !self.fs.is_dir(&tool_dir) {
            return Ok(Vec::new());
        }

        let children = self
            .fs
            .read_dir(&tool_dir)
            .map_err(|e| KdevError::io("read tool directory", &tool_dir, e))?;

        let mut entries = Vec::new();
        for child in children {
            if !child.is_dir {
                continue;
            }

            let binary = self.layout.binary_path(tool, &child.name);
            if !self.fs.is_file(&binary) {
                debug!(%tool, version = %child.name, "ignoring version directory without binary");
                continue;
            }

            let Ok(stat) = self.fs.metadata(&binary) else {
                continue;
            };
            entries.push(CacheEntry {
                version: child.name,
                path: binary,
                size: stat.len,
            });
        }

        entries.sort_by(|a, b| compare_versions(&b.version, &a.version));
        Ok(entries)
    }

    /// Every cached version except the newest one.
    pub fn superseded(&self, tool: &str) -> Result<Vec<CacheEntry>> {
        Ok(self.list_cached(tool)?.into_iter().skip(1).collect())
    }

    /// Delete one cached version. Absent versions are not an error.
    pub fn remove_version(&self, tool: &str, version: &str) -> Result<()> {
        let dir = self.layout.version_dir(tool, version);
        if is_absent(self.fs.as_ref(), &dir) {
            return Ok(());
        }
        debug!(%tool, %version, path = %dir.display(), "removing cached version");
        self.fs
            .remove_dir_all(&dir)
            .map_err(|e| KdevError::io("remove version directory", &dir, e))
    }

    /// Delete every cached version of `tool`. Absent tools are not an error.
    pub fn remove_all(&self, tool: &str) -> Result<()> {
        let dir = self.layout.tool_dir(tool);
        if is_absent(self.fs.as_ref(), &dir) {
            return Ok(());
        }
        debug!(%tool, path = %dir.display(), "removing tool cache");
        self.fs
            .remove_dir_all(&dir)
            .map_err(|e| KdevError::io("remove tool directory", &dir, e))
    }

    /// Delete temp files that killed downloads left in `tool`'s version
    /// directories, returning the bytes reclaimed.
    ///
    /// A live download in another process loses its temp file too, so this
    /// only runs on an explicit clean.
    pub fn remove_leftover_temp_files(&self, tool: &str) -> Result<u64> {
        let tool_dir = self.layout.tool_dir(tool);
        if !self.fs.is_dir(&tool_dir) {
            return Ok(0);
        }

        let versions = self
            .fs
            .read_dir(&tool_dir)
            .map_err(|e| KdevError::io("read tool directory", &tool_dir, e))?;

        let mut freed = 0;
        for version in versions.into_iter().filter(|child| child.is_dir) {
            let dir = self.layout.version_dir(tool, &version.name);
            let binary = self.layout.binary_path(tool, &version.name);
            let prefix = match binary.file_name() {
                Some(name) => format!("{}.", name.to_string_lossy()),
                None => continue,
            };

            let children = self
                .fs
                .read_dir(&dir)
                .map_err(|e| KdevError::io("read version directory", &dir, e))?;
            for child in children {
                if child.is_dir || !child.name.starts_with(&prefix) || !child.name.ends_with(".tmp") {
                    continue;
                }
                let path = dir.join(&child.name);
                let len = self.fs.metadata(&path).map(|stat| stat.len).unwrap_or(0);
                match self.fs.remove_file(&path) {
                    Ok(()) => freed += len,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(KdevError::io("remove temp file", &path, e)),
                }
                debug!(%tool, path = %path.display(), "removed leftover temp file");
            }
        }
        Ok(freed)
    }
}

fn is_absent(fs: &dyn Filesystem, path: &std::path::Path) -> bool {
    matches!(fs.metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
}

/// Order two version strings.
///
/// Semantic-version order when both parse (see [`parse_lenient`]), plain
/// string order when neither does. A tag that parses sorts above one that
/// does not, which keeps the order total for caches mixing `v1.2.3` with
/// `nightly`. Equal semantic versions with different spellings (`v1.2` and
/// `1.2.0`) are tie-broken by string order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Parse a release tag as a semantic version.
///
/// Accepts a leading `v` and pads a missing minor or patch with zero, so
/// `v1.31`, `1` and `v0.24.0-rc.1` all parse. Anything else is `None`.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let raw = raw.strip_prefix('v').unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }

    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split);
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => raw.to_string(),
    };
    Version::parse(&padded).ok()
}
