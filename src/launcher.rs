//! Resolve, fetch, mark executable, exec
//!
//! ```text
//! resolve version -> cached? --no--> download -> chmod 0755 -> exec
//!                        \--yes-----------------^
//! ```
//!
//! The executable bit is applied on every launch, cache hit or not: a cache
//! copied between machines or restored from an archive may have lost it.

use crate::cache::VersionCache;
use crate::download::Downloader;
use crate::error::{KdevError, Result};
use crate::fs::Filesystem;
use crate::http::HttpClient;
use crate::paths::CacheLayout;
use crate::platform::Platform;
use crate::progress::ProgressSink;
use crate::tool::ToolDescriptor;
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const EXECUTABLE_MODE: u32 = 0o755;

/// Everything needed to replace the process: the binary and its full argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedExec {
    pub binary: PathBuf,
    /// `argv[0]` is the tool name; the rest is forwarded untouched.
    pub argv: Vec<OsString>,
}

/// Outcome of making sure a version is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub version: String,
    pub path: PathBuf,
    pub downloaded: bool,
}

pub struct Launcher {
    fs: Arc<dyn Filesystem>,
    layout: CacheLayout,
    http: HttpClient,
    platform: Platform,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: CancellationToken,
}

impl Launcher {
    pub fn new(fs: Arc<dyn Filesystem>, layout: CacheLayout, http: HttpClient) -> Self {
        Self {
            fs,
            layout,
            http,
            platform: Platform::current(),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// The version index over the same cache this launcher fills.
    pub fn cache(&self) -> VersionCache {
        VersionCache::new(Arc::clone(&self.fs), self.layout.clone())
    }

    /// Ask upstream which version of `tool` to use.
    pub async fn resolve_version(&self, tool: &dyn ToolDescriptor) -> Result<String> {
        let resolved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(KdevError::Cancelled),
            result = tool.resolve_version(&self.http) => result,
        };
        let version = resolved.map_err(|e| match e {
            KdevError::Cancelled => e,
            other => KdevError::ResolveVersion {
                tool: tool.name().to_string(),
                source: Box::new(other),
            },
        })?;
        debug!(tool = tool.name(), %version, "resolved version");
        Ok(version)
    }

    /// Make sure `version` of `tool` is cached and executable.
    pub async fn ensure(&self, tool: &dyn ToolDescriptor, version: &str) -> Result<Acquired> {
        let name = tool.name();
        let path = self.layout.binary_path(name, version);

        let downloaded = if self.fs.is_file(&path) {
            debug!(tool = name, %version, path = %path.display(), "cache hit");
            false
        } else {
            self.message(&format!("Downloading {name} {version}..."))?;
            self.downloader()
                .download(tool, &path, version)
                .await
                .map_err(|e| match e {
                    KdevError::Cancelled => e,
                    other => KdevError::Download {
                        tool: name.to_string(),
                        version: version.to_string(),
                        source: Box::new(other),
                    },
                })?;
            self.message(&format!("{name} {version} downloaded successfully"))?;
            true
        };

        self.fs
            .set_mode(&path, EXECUTABLE_MODE)
            .map_err(|e| KdevError::io("chmod", &path, e))?;

        Ok(Acquired {
            version: version.to_string(),
            path,
            downloaded,
        })
    }

    /// Resolve the latest version and make sure it is cached.
    pub async fn ensure_latest(&self, tool: &dyn ToolDescriptor) -> Result<Acquired> {
        let version = self.resolve_version(tool).await?;
        self.ensure(tool, &version).await
    }

    /// Everything up to, but not including, the exec.
    pub async fn prepare(&self, tool: &dyn ToolDescriptor, args: Vec<OsString>) -> Result<PreparedExec> {
        let acquired = self.ensure_latest(tool).await?;

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(OsString::from(tool.name()));
        argv.extend(args);

        Ok(PreparedExec {
            binary: acquired.path,
            argv,
        })
    }

    /// Run `tool` with `args`. Only returns on failure.
    pub async fn launch(&self, tool: &dyn ToolDescriptor, args: Vec<OsString>) -> Result<Infallible> {
        let prepared = self.prepare(tool, args).await?;
        exec(prepared)
    }

    fn downloader(&self) -> Downloader {
        Downloader::new(self.http.clone(), Arc::clone(&self.fs))
            .with_platform(self.platform)
            .with_progress(self.progress.clone())
            .with_cancellation(self.cancel.clone())
    }

    fn message(&self, msg: &str) -> Result<()> {
        match &self.progress {
            Some(progress) => progress.message(msg).map_err(KdevError::Progress),
            None => Ok(()),
        }
    }
}

/// Replace the current process with the prepared binary.
///
/// The environment is inherited unchanged.
#[cfg(unix)]
pub fn exec(prepared: PreparedExec) -> Result<Infallible> {
    use std::os::unix::process::CommandExt;

    let mut argv = prepared.argv.into_iter();
    let mut command = Command::new(&prepared.binary);
    if let Some(argv0) = argv.next() {
        command.arg0(argv0);
    }
    command.args(argv);

    debug!(binary = %prepared.binary.display(), "exec");
    // exec only returns on failure
    let err = command.exec();
    Err(KdevError::io("exec", prepared.binary, err))
}

/// Run the prepared binary as a child and exit with its status.
#[cfg(not(unix))]
pub fn exec(prepared: PreparedExec) -> Result<Infallible> {
    let status = Command::new(&prepared.binary)
        .args(prepared.argv.iter().skip(1))
        .status()
        .map_err(|e| KdevError::io("run", &prepared.binary, e))?;
    std::process::exit(status.code().unwrap_or(1));
}
