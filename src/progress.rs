//! Progress reporting and terminal integration
//!
//! The launcher prints a status line before and after a download, and the
//! downloader reports byte progress while streaming. Both go through a
//! [`ProgressSink`]. Status lines are load-bearing (a failed write aborts the
//! launch); byte progress is best effort.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::Mutex;

/// Percent granularity of download progress updates.
pub const PROGRESS_STEP: u8 = 5;

/// Receiver for human-readable progress.
pub trait ProgressSink: Send + Sync {
    /// Write one status line.
    fn message(&self, msg: &str) -> io::Result<()>;

    /// A download with a known size is about to stream.
    fn download_started(&self, _name: &str, _total: u64) {}

    /// `downloaded` bytes out of `total` have arrived.
    fn download_progress(&self, downloaded: u64, total: u64);

    /// The stream is complete.
    fn download_finished(&self) {}
}

/// Decides which byte counts are worth reporting.
///
/// Emits once per [`PROGRESS_STEP`] percent bucket, on the first read, and
/// never twice for the same bucket.
#[derive(Debug, Clone)]
pub struct ThresholdTracker {
    total: u64,
    current: u64,
    last_bucket: Option<u8>,
}

impl ThresholdTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            current: 0,
            last_bucket: None,
        }
    }

    /// Record `n` more bytes; returns the percent to report, if any.
    pub fn advance(&mut self, n: u64) -> Option<u8> {
        self.current = self.current.saturating_add(n);
        if self.total == 0 {
            return None;
        }

        let percent = self.percent();
        let bucket = percent - percent % PROGRESS_STEP;
        match self.last_bucket {
            Some(last) if bucket <= last => None,
            _ => {
                self.last_bucket = Some(bucket);
                Some(percent)
            }
        }
    }

    /// Current progress, capped at 100.
    pub fn percent(&self) -> u8 {
        percent_of(self.current, self.total)
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Integer percentage of `done` over `total`, capped at 100.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (u128::from(done.min(total)) * 100 / u128::from(total)) as u8
}

/// Progress state for OSC 9;4 terminal indicators
#[derive(Debug, Clone, Copy)]
enum TerminalState {
    Off = 0,
    Normal = 1,
}

/// Set the terminal's native progress indicator (OSC 9;4).
///
/// Understood by Ghostty, WezTerm, Windows Terminal and ConEmu; other
/// terminals ignore the sequence.
fn set_terminal_progress(progress: u8, state: TerminalState) {
    let progress = progress.min(100);
    let mut stderr = io::stderr();
    let _ = write!(stderr, "\x1b]9;4;{};{}\x1b\\", state as u8, progress);
    let _ = stderr.flush();
}

/// Interactive progress: a byte bar on stderr plus the terminal indicator.
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        let mut guard = self.bar.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard);
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn message(&self, msg: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{msg}")?;
        stdout.flush()
    }

    fn download_started(&self, name: &str, total: u64) {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.green/blue}] {percent:>3}% ({bytes} / {total_bytes})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(format!("⬇ {name}"));
        self.with_bar(|slot| *slot = Some(bar));
    }

    fn download_progress(&self, downloaded: u64, total: u64) {
        self.with_bar(|slot| {
            if let Some(bar) = slot {
                bar.set_position(downloaded);
            }
        });
        if total > 0 {
            set_terminal_progress(percent_of(downloaded, total), TerminalState::Normal);
        }
    }

    fn download_finished(&self) {
        self.with_bar(|slot| {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        });
        set_terminal_progress(0, TerminalState::Off);
    }
}

/// Plain line-oriented progress for pipes, logs and tests.
pub struct WriterProgress<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl<W: Write + Send> ProgressSink for WriterProgress<W> {
    fn message(&self, msg: &str) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        writeln!(out, "{msg}")?;
        out.flush()
    }

    fn download_progress(&self, downloaded: u64, total: u64) {
        let percent = percent_of(downloaded, total);
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        let _ = writeln!(
            out,
            "{percent:>3}% ({} / {})",
            crate::ui::format_bytes(downloaded),
            crate::ui::format_bytes(total)
        );
    }
}
