//! HTTP transport with retry/backoff, and the checksum fetcher built on it.
//!
//! The client is constructed explicitly and passed to whatever needs the
//! network, so tests can point it at a local fake server. Connection
//! failures, timeouts, `429` and `5xx` responses are retried with
//! exponential backoff; every other non-`200` status fails immediately.
//!
//! The configured timeout bounds connecting and each read, never a whole
//! transfer: a slow binary download keeps going as long as bytes arrive.
//! Small documents (versions, checksums) also get it as a total limit.

use crate::config::Settings;
use crate::error::{KdevError, Result};
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Retrying HTTP client shared by version resolution, checksum fetching and
/// binary downloads.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    settings: Settings,
}

impl HttpClient {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.timeout)
            .read_timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|source| KdevError::Request {
                url: String::new(),
                source,
            })?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// GET `url`, returning the response only if the status is `200 OK`.
    ///
    /// The body may be streamed for as long as it keeps arriving.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(url, None, None).await
    }

    /// GET and return the whole body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url, None, Some(self.settings.timeout)).await?;
        response.text().await.map_err(|source| KdevError::Request {
            url: url.to_string(),
            source,
        })
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, token: Option<&str>) -> Result<T> {
        let response = self.send(url, token, Some(self.settings.timeout)).await?;
        let body = response.bytes().await.map_err(|source| KdevError::Request {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|e| KdevError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn send(&self, url: &str, token: Option<&str>, total: Option<Duration>) -> Result<Response> {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.settings.retry_wait_min)
            .with_max_interval(self.settings.retry_wait_max)
            .with_max_elapsed_time(None)
            .build();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(%url, attempt, "GET");

            let mut request = self.client.get(url);
            if let Some(total) = total {
                request = request.timeout(total);
            }
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let outcome = request.send().await;

            let retryable = match &outcome {
                Ok(response) => is_retryable_status(response.status()),
                Err(err) => err.is_connect() || err.is_timeout(),
            };

            if !retryable || attempt > self.settings.retries {
                return match outcome {
                    Ok(response) if response.status() == StatusCode::OK => Ok(response),
                    Ok(response) => Err(KdevError::UnexpectedStatus {
                        url: url.to_string(),
                        status: response.status().as_u16(),
                    }),
                    Err(source) => Err(KdevError::Request {
                        url: url.to_string(),
                        source,
                    }),
                };
            }

            let wait = backoff
                .next_backoff()
                .unwrap_or(self.settings.retry_wait_max);
            match &outcome {
                Ok(response) => warn!(%url, status = response.status().as_u16(), retry_in_ms = wait.as_millis() as u64, "request failed, retrying"),
                Err(err) => warn!(%url, error = %err, retry_in_ms = wait.as_millis() as u64, "request failed, retrying"),
            }
            tokio::time::sleep(wait).await;
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Fetch an expected checksum document.
///
/// The body is trimmed and its first whitespace-delimited token returned, so
/// both a bare digest and `sha256sum` output (`<hex>  <file>`) work. An empty
/// body yields an empty string; the caller's comparison fails on its own.
pub async fn fetch_checksum(http: &HttpClient, url: &str) -> Result<String> {
    let body = http.get_text(url).await?;
    Ok(parse_checksum(&body))
}

fn parse_checksum(body: &str) -> String {
    body.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}
