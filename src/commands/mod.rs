//! Command implementations behind the `kdev` CLI.

mod run;
mod tools;

pub use run::run;
pub use tools::{clean, info, update};

use crate::config::Settings;
use crate::fs::OsFs;
use crate::http::HttpClient;
use crate::launcher::Launcher;
use crate::paths::CacheLayout;
use crate::progress::ProgressSink;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A launcher over the real filesystem, configured from the environment.
pub fn build_launcher(
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
) -> Result<Launcher> {
    let settings = Settings::from_env().context("Failed to load settings")?;
    let http = HttpClient::new(settings).context("Failed to create HTTP client")?;
    let layout = CacheLayout::resolve(&OsFs).context("Failed to locate data directory")?;

    Ok(Launcher::new(Arc::new(OsFs), layout, http)
        .with_progress(progress)
        .with_cancellation(cancel))
}
