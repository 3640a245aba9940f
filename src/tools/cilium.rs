use super::resolve_github_tag;
use crate::error::Result;
use crate::http::HttpClient;
use crate::platform::Platform;
use crate::tool::ToolDescriptor;
use async_trait::async_trait;

const LATEST_RELEASE: &str = "https://api.github.com/repos/cilium/cilium-cli/releases/latest";
const DOWNLOAD_BASE: &str = "https://github.com/cilium/cilium-cli/releases/download";

/// The Cilium CLI. Released as a tar.gz holding a single `cilium` binary.
#[derive(Debug, Clone)]
pub struct Cilium {
    latest_release_url: String,
    download_base: String,
}

impl Cilium {
    pub fn new() -> Self {
        Self::with_endpoints(LATEST_RELEASE, DOWNLOAD_BASE)
    }

    pub fn with_endpoints(latest_release_url: impl Into<String>, download_base: impl Into<String>) -> Self {
        Self {
            latest_release_url: latest_release_url.into(),
            download_base: download_base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for Cilium {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolDescriptor for Cilium {
    fn name(&self) -> &str {
        "cilium"
    }

    fn about(&self) -> &str {
        "Execute cilium CLI (auto-downloads if needed)"
    }

    async fn resolve_version(&self, http: &HttpClient) -> Result<String> {
        resolve_github_tag(http, &self.latest_release_url).await
    }

    fn download_url(&self, version: &str, platform: &Platform) -> String {
        format!(
            "{}/{}/cilium-{}-{}.tar.gz",
            self.download_base, version, platform.os, platform.arch
        )
    }

    fn checksum_url(&self, version: &str, platform: &Platform) -> String {
        format!("{}.sha256sum", self.download_url(version, platform))
    }
}
