//! Fixtures shared by the unit tests.

use crate::error::{KdevError, Result};
use crate::http::HttpClient;
use crate::platform::Platform;
use crate::progress::ProgressSink;
use crate::tool::ToolDescriptor;
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A tool served from a local mock server: `<base>/<version>/demo-<os>-<arch>`.
pub struct Demo {
    pub base: String,
    pub version: Option<String>,
    pub archive: bool,
}

impl Demo {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            version: Some("v2.0.0".to_string()),
            archive: false,
        }
    }

    pub fn archived(mut self) -> Self {
        self.archive = true;
        self
    }

    /// Version resolution fails.
    pub fn unresolvable(mut self) -> Self {
        self.version = None;
        self
    }
}

#[async_trait]
impl ToolDescriptor for Demo {
    fn name(&self) -> &str {
        "demo"
    }

    fn about(&self) -> &str {
        "test tool"
    }

    async fn resolve_version(&self, _http: &HttpClient) -> Result<String> {
        self.version.clone().ok_or_else(|| KdevError::InvalidResponse {
            url: format!("{}/latest", self.base),
            reason: "no release".to_string(),
        })
    }

    fn download_url(&self, version: &str, platform: &Platform) -> String {
        let ext = if self.archive { ".tar.gz" } else { "" };
        format!(
            "{}/{version}/demo-{}-{}{ext}",
            self.base, platform.os, platform.arch
        )
    }

    fn checksum_url(&self, version: &str, platform: &Platform) -> String {
        format!("{}.sha256sum", self.download_url(version, platform))
    }
}

/// Records every progress call as a line of text.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
    cancel_on_progress: Option<CancellationToken>,
    fail_messages: bool,
}

impl Recorder {
    /// Cancels `token` on the first progress update.
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancel_on_progress: Some(token),
            ..Self::default()
        }
    }

    /// Every status line write fails.
    pub fn failing() -> Self {
        Self {
            fail_messages: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressSink for Recorder {
    fn message(&self, msg: &str) -> io::Result<()> {
        if self.fail_messages {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        self.push(format!("message {msg}"));
        Ok(())
    }

    fn download_started(&self, name: &str, total: u64) {
        self.push(format!("started {name} {total}"));
    }

    fn download_progress(&self, downloaded: u64, total: u64) {
        self.push(format!("progress {downloaded}/{total}"));
        if let Some(cancel) = &self.cancel_on_progress {
            cancel.cancel();
        }
    }

    fn download_finished(&self) {
        self.push("finished".to_string());
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// A gzipped tarball holding one regular file.
pub fn tar_gz(name: &str, data: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o755);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append_data(&mut header, name, data).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

/// A bare HTTP server that answers `*.sha256sum` with the digest of `body`
/// at once and any other path with `body`, `chunk` bytes at a time, sleeping
/// `interval` before each piece. Returns the base URL.
pub async fn trickle_server(body: Vec<u8>, chunk: usize, interval: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = Arc::clone(&body);
            tokio::spawn(async move {
                let mut request = vec![0u8; 4096];
                let n = socket.read(&mut request).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&request[..n]).to_string();
                let target = request.split_whitespace().nth(1).unwrap_or("/");

                let head = |len: usize| {
                    format!("HTTP/1.1 200 OK\r\ncontent-length: {len}\r\nconnection: close\r\n\r\n")
                };
                if target.ends_with(".sha256sum") {
                    let digest = sha256_hex(&body);
                    let _ = socket.write_all(head(digest.len()).as_bytes()).await;
                    let _ = socket.write_all(digest.as_bytes()).await;
                    return;
                }

                if socket.write_all(head(body.len()).as_bytes()).await.is_err() {
                    return;
                }
                for piece in body.chunks(chunk) {
                    tokio::time::sleep(interval).await;
                    if socket.write_all(piece).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                }
            });
        }
    });

    format!("http://{addr}")
}
