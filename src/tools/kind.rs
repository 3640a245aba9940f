use super::resolve_github_tag;
use crate::error::Result;
use crate::http::HttpClient;
use crate::platform::Platform;
use crate::tool::ToolDescriptor;
use async_trait::async_trait;

const LATEST_RELEASE: &str = "https://api.github.com/repos/kubernetes-sigs/kind/releases/latest";
const DOWNLOAD_BASE: &str = "https://github.com/kubernetes-sigs/kind/releases/download";

/// kind (Kubernetes in Docker), from GitHub releases.
#[derive(Debug, Clone)]
pub struct Kind {
    latest_release_url: String,
    download_base: String,
}

impl Kind {
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

impl Default for Kind {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolDescriptor for Kind {
    fn name(&self) -> &str {
        "kind"
    }

    fn about(&self) -> &str {
        "Execute kind (auto-downloads if needed)"
    }

    async fn resolve_version(&self, http: &HttpClient) -> Result<String> {
        resolve_github_tag(http, &self.latest_release_url).await
    }

    fn download_url(&self, version: &str, platform: &Platform) -> String {
        format!(
            "{}/{}/kind-{}-{}",
            self.download_base, version, platform.os, platform.arch
        )
    }

    fn checksum_url(&self, version: &str, platform: &Platform) -> String {
        format!("{}.sha256sum", self.download_url(version, platform))
    }
}
