//! `kdev tools info|clean|update`

use crate::cache::VersionCache;
use crate::launcher::Launcher;
use crate::registry::Registry;
use crate::ui::format_bytes;
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;

/// Show every cached version of the selected tools (all when `names` is
/// empty), newest first.
pub fn info(
    registry: &Registry,
    cache: &VersionCache,
    names: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let tools = registry.resolve_names(names)?;
    let mut total = 0u64;

    for tool in &tools {
        let name = tool.name();
        let entries = cache
            .list_cached(name)
            .with_context(|| format!("Failed to list cached versions of {name}"))?;

        if entries.is_empty() {
            writeln!(out, "{} {}", name.bold(), "(not cached)".dimmed())?;
            continue;
        }

        writeln!(out, "{}", name.bold())?;
        for (i, entry) in entries.iter().enumerate() {
            total += entry.size;
            let version = format!("{:<12}", entry.version);
            let version = if i == 0 {
                version.green().bold().to_string()
            } else {
                version
            };
            writeln!(
                out,
                "  {} {:>10}  {}",
                version,
                format_bytes(entry.size),
                entry.path.display().to_string().dimmed()
            )?;
        }
    }

    if tools.len() > 1 {
        writeln!(out)?;
        writeln!(out, "{}: {}", "cache size".bold(), format_bytes(total))?;
    }
    Ok(())
}

/// Remove cached versions: everything, or with `old_only` all but the newest.
/// Temp files left by killed downloads go either way.
pub fn clean(
    registry: &Registry,
    cache: &VersionCache,
    names: &[String],
    old_only: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let tools = registry.resolve_names(names)?;
    let mut freed = 0u64;

    for tool in &tools {
        let name = tool.name();
        let swept = cache
            .remove_leftover_temp_files(name)
            .with_context(|| format!("Failed to remove partial downloads of {name}"))?;
        if swept > 0 {
            writeln!(out, "  {} {} partial downloads", "✓".green(), name)?;
            freed += swept;
        }

        let entries = if old_only {
            cache.superseded(name)
        } else {
            cache.list_cached(name)
        }
        .with_context(|| format!("Failed to list cached versions of {name}"))?;

        for entry in &entries {
            if old_only {
                cache
                    .remove_version(name, &entry.version)
                    .with_context(|| format!("Failed to remove {name} {}", entry.version))?;
            }
            writeln!(out, "  {} {} {}", "✓".green(), name, entry.version)?;
            freed += entry.size;
        }

        if !old_only {
            // Also drops version directories that never finished downloading
            cache
                .remove_all(name)
                .with_context(|| format!("Failed to remove cached {name}"))?;
        }
    }

    if freed > 0 {
        writeln!(out, "Reclaimed {}", format_bytes(freed).bold())?;
    } else {
        writeln!(out, "Nothing to clean")?;
    }
    Ok(())
}

/// Make sure the latest version of each selected tool is cached.
pub async fn update(
    launcher: &Launcher,
    registry: &Registry,
    names: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    for tool in registry.resolve_names(names)? {
        let acquired = launcher
            .ensure_latest(tool.as_ref())
            .await
            .with_context(|| format!("Failed to update {}", tool.name()))?;

        if !acquired.downloaded {
            writeln!(
                out,
                "{} {} {}",
                tool.name().bold(),
                acquired.version,
                "already cached".dimmed()
            )?;
        }
    }
    Ok(())
}
