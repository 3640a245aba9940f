//! Environment-driven settings.
//!
//! kdev has no config file. The few knobs it has come from the environment:
//!
//! - `KDEV_HTTP_RETRIES`: retries after the first attempt (default 3)
//! - `KDEV_HTTP_TIMEOUT`: seconds a connection may stall before
//!   it is abandoned (default 300)
//!
//! The cache location is resolved separately, see [`crate::paths`].

use crate::error::{KdevError, Result};
use std::time::Duration;

pub const RETRIES_ENV: &str = "KDEV_HTTP_RETRIES";
pub const TIMEOUT_ENV: &str = "KDEV_HTTP_TIMEOUT";

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_WAIT_MIN: Duration = Duration::from_secs(1);
const DEFAULT_RETRY_WAIT_MAX: Duration = Duration::from_secs(10);
// Stall limit, not a cap on the whole transfer
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Transport settings for [`crate::http::HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub retries: u32,
    pub retry_wait_min: Duration,
    pub retry_wait_max: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retry_wait_min: DEFAULT_RETRY_WAIT_MIN,
            retry_wait_max: DEFAULT_RETRY_WAIT_MAX,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("kdev/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Settings {
    /// Defaults overlaid with whatever the environment sets.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(raw) = lookup(RETRIES_ENV) {
            settings.retries = parse_number(RETRIES_ENV, &raw)?;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = parse_number(TIMEOUT_ENV, &raw)?;
            if secs == 0 {
                return Err(KdevError::Config(format!("{TIMEOUT_ENV} must be positive")));
            }
            settings.timeout = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    /// No retries and no waiting; what tests want.
    pub fn without_retries() -> Self {
        Self {
            retries: 0,
            retry_wait_min: Duration::ZERO,
            retry_wait_max: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| KdevError::Config(format!("{key} must be a number, got {raw:?}")))
}
