//! Library interface for kdev
//!
//! kdev fetches Kubernetes tool binaries on first use, verifies them against
//! upstream checksums, caches one copy per version and then replaces itself
//! with the tool.

pub mod cache;
pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod fs;
pub mod http;
pub mod launcher;
pub mod paths;
pub mod platform;
pub mod progress;
pub mod registry;
pub mod tool;
pub mod tools;
pub mod ui;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use cache::{CacheEntry, VersionCache, compare_versions};
pub use error::{KdevError, Result};
pub use launcher::{Acquired, Launcher, PreparedExec};
pub use registry::Registry;
pub use tool::ToolDescriptor;
