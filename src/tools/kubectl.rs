use super::resolve_plain_text;
use crate::error::Result;
use crate::http::HttpClient;
use crate::platform::Platform;
use crate::tool::ToolDescriptor;
use async_trait::async_trait;

const RELEASE_BASE: &str = "https://dl.k8s.io/release";

/// kubectl, from the Kubernetes release bucket.
#[derive(Debug, Clone)]
pub struct Kubectl {
    release_base: String,
}

impl Kubectl {
    pub fn new() -> Self {
        Self::with_release_base(RELEASE_BASE)
    }

    /// Point at a different release bucket (mirrors, tests).
    pub fn with_release_base(base: impl Into<String>) -> Self {
        Self {
            release_base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolDescriptor for Kubectl {
    fn name(&self) -> &str {
        "kubectl"
    }

    fn about(&self) -> &str {
        "Execute kubectl (auto-downloads if needed)"
    }

    async fn resolve_version(&self, http: &HttpClient) -> Result<String> {
        resolve_plain_text(http, &format!("{}/stable.txt", self.release_base)).await
    }

    fn download_url(&self, version: &str, platform: &Platform) -> String {
        let exe = if platform.is_windows() { ".exe" } else { "" };
        format!(
            "{}/{}/bin/{}/{}/kubectl{}",
            self.release_base, version, platform.os, platform.arch, exe
        )
    }

    fn checksum_url(&self, version: &str, platform: &Platform) -> String {
        format!("{}.sha256", self.download_url(version, platform))
    }
}
