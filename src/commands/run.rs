use crate::launcher::Launcher;
use crate::registry::Registry;
use anyhow::{Context, Result};
use std::ffi::OsString;

/// Fetch `tool` if needed and replace this process with it.
pub async fn run(launcher: &Launcher, registry: &Registry, tool: &str, args: Vec<OsString>) -> Result<()> {
    let descriptor = registry
        .get(tool)
        .with_context(|| format!("Tool {tool} is not registered"))?;

    match launcher.launch(descriptor.as_ref(), args).await? {}
}
