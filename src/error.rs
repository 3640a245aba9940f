use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KdevError {
    #[error("could not determine home directory")]
    HomeDirNotFound,

    #[error("failed to resolve {tool} version: {source}")]
    ResolveVersion {
        tool: String,
        #[source]
        source: Box<KdevError>,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status code: {status} ({url})")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("binary {binary} not found in archive")]
    BinaryNotInArchive { binary: String },

    #[error("failed to write progress: {0}")]
    Progress(#[source] std::io::Error),

    #[error("failed to download {tool} {version}: {source}")]
    Download {
        tool: String,
        version: String,
        #[source]
        source: Box<KdevError>,
    },

    #[error("unknown tool: {name}{}", .suggestion.as_ref().map(|s| format!(" (did you mean {s}?)")).unwrap_or_default())]
    UnknownTool {
        name: String,
        suggestion: Option<String>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl KdevError {
    /// Wrap an I/O error with the operation that failed and the path it touched.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// True for integrity failures, which must never be downgraded.
    pub fn is_checksum_mismatch(&self) -> bool {
        match self {
            Self::ChecksumMismatch { .. } => true,
            Self::Download { source, .. } | Self::ResolveVersion { source, .. } => {
                source.is_checksum_mismatch()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, KdevError>;
