//! Checksum-verified binary downloads
//!
//! A download goes: expected checksum first, then the binary streamed into a
//! temp file next to the destination while it is hashed in the same pass.
//! Only a verified file is renamed onto the destination, so the final path
//! either holds a complete, checked binary or nothing at all.
//!
//! Temp names are unique per invocation (`<dest>.<pid>.<n>.tmp`), so two
//! processes fetching the same version never write the same file; whichever
//! rename lands last wins, and both wrote identical verified bytes.

use crate::error::{KdevError, Result};
use crate::extract::{extract_binary, is_tar_gz};
use crate::fs::Filesystem;
use crate::http::{HttpClient, fetch_checksum};
use crate::platform::Platform;
use crate::progress::{ProgressSink, ThresholdTracker};
use crate::tool::ToolDescriptor;
use reqwest::Response;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A sibling of `dest` that no other invocation will pick.
pub fn temp_path(dest: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = dest
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!("{name}.{}.{n}.tmp", std::process::id()))
}

/// Removes its file when dropped unless it was persisted.
///
/// Covers early returns and cancelled futures alike.
struct TempFile<'a> {
    fs: &'a dyn Filesystem,
    path: PathBuf,
    armed: bool,
}

impl<'a> TempFile<'a> {
    fn new(fs: &'a dyn Filesystem, dest: &Path) -> Self {
        Self {
            fs,
            path: temp_path(dest),
            armed: true,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Move the temp file onto `dest`; after this it is no longer cleaned up.
    fn persist(mut self, dest: &Path) -> Result<()> {
        self.fs
            .rename(&self.path, dest)
            .map_err(|e| KdevError::io("rename", &self.path, e))?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for TempFile<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.fs.remove_file(&self.path) {
                debug!(path = %self.path.display(), error = %e, "temp file not removed");
            }
        }
    }
}

/// Fetches tool binaries into the cache.
pub struct Downloader {
    http: HttpClient,
    fs: Arc<dyn Filesystem>,
    platform: Platform,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(http: HttpClient, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            http,
            fs,
            platform: Platform::current(),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_progress(mut self, progress: Option<Arc<dyn ProgressSink>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Download, verify and place `tool`'s `version` binary at `dest`.
    pub async fn download(&self, tool: &dyn ToolDescriptor, dest: &Path, version: &str) -> Result<()> {
        let url = tool.download_url(version, &self.platform);
        let checksum_url = tool.checksum_url(version, &self.platform);
        let fs = self.fs.as_ref();

        if let Some(parent) = dest.parent() {
            fs.create_dir_all(parent)
                .map_err(|e| KdevError::io("create directory", parent, e))?;
        }

        let expected = self
            .cancellable(fetch_checksum(&self.http, &checksum_url))
            .await?;
        debug!(tool = tool.name(), %version, %expected, "expected checksum");

        let response = self.cancellable(self.http.get(&url)).await?;

        let temp = TempFile::new(fs, dest);
        let actual = self.stream_to_file(response, temp.path(), tool.name(), &url).await?;

        if actual != expected {
            return Err(KdevError::ChecksumMismatch { expected, actual });
        }

        if is_tar_gz(&url) {
            let staged = TempFile::new(fs, dest);
            extract_binary(fs, temp.path(), staged.path(), tool.name())?;
            staged.persist(dest)?;
            // Archive is removed when `temp` drops
        } else {
            temp.persist(dest)?;
        }

        info!(tool = tool.name(), %version, path = %dest.display(), "binary installed");
        Ok(())
    }

    /// Copy the body into `path`, returning the lowercase hex SHA-256 of
    /// exactly the bytes written.
    async fn stream_to_file(
        &self,
        mut response: Response,
        path: &Path,
        name: &str,
        url: &str,
    ) -> Result<String> {
        let total = response.content_length().filter(|len| *len > 0);
        let reporter = self.progress.as_deref().zip(total);
        if let Some((sink, total)) = reporter {
            sink.download_started(name, total);
        }

        let mut out = self
            .fs
            .create(path)
            .map_err(|e| KdevError::io("create", path, e))?;
        let mut hasher = Sha256::new();
        let mut tracker = ThresholdTracker::new(total.unwrap_or(0));
        let mut last_reported = None;

        let copied = async {
            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(KdevError::Cancelled),
                    chunk = response.chunk() => chunk.map_err(|source| KdevError::Request {
                        url: url.to_string(),
                        source,
                    })?,
                };
                let Some(chunk) = chunk else {
                    break;
                };

                out.write_all(&chunk)
                    .map_err(|e| KdevError::io("write", path, e))?;
                hasher.update(&chunk);

                if let Some(percent) = tracker.advance(chunk.len() as u64) {
                    if let Some((sink, total)) = reporter {
                        sink.download_progress(tracker.current(), total);
                        last_reported = Some(percent);
                    }
                }
            }
            out.flush().map_err(|e| KdevError::io("write", path, e))?;
            Ok::<(), KdevError>(())
        }
        .await;

        if let Some((sink, total)) = reporter {
            if copied.is_ok() && last_reported != Some(100) {
                sink.download_progress(total, total);
            }
            sink.download_finished();
        }
        copied?;

        debug!(%url, bytes = tracker.current(), "download complete");
        Ok(format!("{:x}", hasher.finalize()))
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(KdevError::Cancelled),
            result = fut => result,
        }
    }
}
