//! Single-binary extraction from tar.gz release archives.
//!
//! Some tools (cilium) ship their binary inside a `.tar.gz`. Only one entry
//! is wanted: the first whose base filename equals the tool name, wherever it
//! sits in the archive.
//!
//! ```text
//! cilium-linux-amd64.tar.gz
//!   cilium            <- extracted
//!   LICENSE           <- ignored
//! ```

use crate::error::{KdevError, Result};
use crate::fs::Filesystem;
use flate2::read::GzDecoder;
use std::io::{self, Write};
use std::path::Path;
use tar::Archive;
use tracing::debug;

/// True if `url` names a tar+gzip archive.
pub fn is_tar_gz(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.ends_with(".tar.gz") || path.ends_with(".tgz")
}

/// Stream the entry named `binary` out of `archive_path` into `dest`.
///
/// `dest` is written directly; the caller decides where that is and cleans
/// it up on failure.
pub fn extract_binary(
    fs: &dyn Filesystem,
    archive_path: &Path,
    dest: &Path,
    binary: &str,
) -> Result<()> {
    let file = fs
        .open(archive_path)
        .map_err(|e| KdevError::io("open archive", archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|e| KdevError::io("read archive", archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| KdevError::io("read archive", archive_path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .map_err(|e| KdevError::io("read archive", archive_path, e))?
            .file_name()
            .is_some_and(|name| name == binary);
        if !matches {
            continue;
        }

        debug!(archive = %archive_path.display(), %binary, "extracting binary from archive");
        let mut out = fs
            .create(dest)
            .map_err(|e| KdevError::io("create", dest, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| KdevError::io("extract binary to", dest, e))?;
        out.flush().map_err(|e| KdevError::io("write", dest, e))?;
        return Ok(());
    }

    Err(KdevError::BinaryNotInArchive {
        binary: binary.to_string(),
    })
}
