//! Built-in tool integrations.
//!
//! - **cilium**: Cilium CLI, shipped as a tar.gz from GitHub releases
//! - **kind**: Kubernetes in Docker, raw binaries from GitHub releases
//! - **kubectl**: Kubernetes CLI from dl.k8s.io
//!
//! Two version-resolution styles are shared between them: a plain-text
//! "stable" marker file, and the `tag_name` of a GitHub "latest release".

mod cilium;
mod kind;
mod kubectl;

pub use cilium::Cilium;
pub use kind::Kind;
pub use kubectl::Kubectl;

use crate::error::{KdevError, Result};
use crate::http::HttpClient;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Token for api.github.com, to avoid anonymous rate limits.
fn github_token() -> Option<String> {
    std::env::var("GITHUB_TOKEN")
        .or_else(|_| std::env::var("GH_TOKEN"))
        .ok()
        .filter(|token| !token.is_empty())
}

/// Read a version from a plain-text endpoint such as `stable.txt`.
pub async fn resolve_plain_text(http: &HttpClient, url: &str) -> Result<String> {
    let version = http.get_text(url).await?.trim().to_string();
    if version.is_empty() {
        return Err(KdevError::InvalidResponse {
            url: url.to_string(),
            reason: "empty version".to_string(),
        });
    }
    Ok(version)
}

/// Read `tag_name` from a GitHub "latest release" endpoint.
pub async fn resolve_github_tag(http: &HttpClient, url: &str) -> Result<String> {
    let token = github_token();
    let release: Release = http.get_json(url, token.as_deref()).await?;
    if release.tag_name.is_empty() {
        return Err(KdevError::InvalidResponse {
            url: url.to_string(),
            reason: "release has no tag_name".to_string(),
        });
    }
    Ok(release.tag_name)
}
