//! Terminal output helpers: color policy and byte formatting.
//!
//! Color follows the NO_COLOR standard (https://no-color.org/) and the
//! CLICOLOR conventions:
//! - `NO_COLOR`: if set (to any value), disable colors
//! - `CLICOLOR_FORCE`: if set to non-zero, force colors even when not a TTY
//! - `CLICOLOR`: if set to 0, disable colors

use colored::control;
use std::io::IsTerminal;

/// Decide whether colored output is wanted.
///
/// `lookup` reads an environment variable; `is_tty` says whether stdout is a
/// terminal.
pub fn colors_enabled(lookup: impl Fn(&str) -> Option<String>, is_tty: bool) -> bool {
    // NO_COLOR takes precedence over everything
    if lookup("NO_COLOR").is_some() {
        return false;
    }
    if lookup("CLICOLOR_FORCE").is_some_and(|v| v != "0") {
        return true;
    }
    if lookup("CLICOLOR").is_some_and(|v| v == "0") {
        return false;
    }
    is_tty
}

/// Apply the color policy for the whole process. Call early in `main`.
pub fn init_colors() {
    let enabled = colors_enabled(|key| std::env::var(key).ok(), std::io::stdout().is_terminal());
    control::set_override(enabled);
}

/// Human-readable size in binary units: `512 B`, `1.5 KiB`, `20.0 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < UNITS.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}", bytes as f64 / div as f64, UNITS[exp])
}
