//! The per-tool strategy interface.
//!
//! A tool is an external, independently versioned executable. kdev knows
//! three things about each one: how to ask upstream for the version to use,
//! where the binary for a `(version, platform)` lives, and where its checksum
//! document lives. Everything else (caching, verification, exec) is shared.

use crate::error::Result;
use crate::http::HttpClient;
use crate::platform::Platform;
use async_trait::async_trait;

#[async_trait]
pub trait ToolDescriptor: Send + Sync {
    /// Identifier, and the filename of the cached binary.
    fn name(&self) -> &str;

    /// One-line description for help output.
    fn about(&self) -> &str;

    /// Ask upstream for the version to use (usually the latest stable).
    async fn resolve_version(&self, http: &HttpClient) -> Result<String>;

    fn download_url(&self, version: &str, platform: &Platform) -> String;

    fn checksum_url(&self, version: &str, platform: &Platform) -> String;
}

impl std::fmt::Debug for dyn ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name())
            .finish()
    }
}
