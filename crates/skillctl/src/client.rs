//! HTTP client for the skilld daemon.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use skill_core::bundle::BundleError;
use skill_core::{CollectionStats, FrontmatterMap, SkillListing};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running at {addr}\n  → start with: skilld\n  → or set SKILLD_ADDR if using a different address")]
    ConnectionFailed { addr: String },

    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}\n  → set GITHUB_TOKEN for the daemon to raise the limit")]
    RateLimited(String),

    #[error("{message}")]
    ValidationFailed {
        message: String,
        missing: Vec<String>,
    },

    #[error("invalid bundle: {0}")]
    Bundle(#[from] BundleError),

    #[error("refusing to write outside destination: {0}")]
    UnsafePath(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("daemon not ready after {timeout_ms}ms at {addr}\n  → ensure skilld is running")]
    DaemonNotReady { addr: String, timeout_ms: u64 },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            let addr = e
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            ClientError::ConnectionFailed { addr }
        } else {
            ClientError::HttpError {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            }
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::IoError(e.to_string())
    }
}

/// Request payload for POST /api/v1/skills/fetch-github.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub github_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_path: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub validate_only: bool,
}

/// Skills offered by a multi-skill repository.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub multiple_skills: bool,
    pub skills: Vec<SkillListing>,
    pub github_url: String,
}

/// A resolved bundle.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub content: String,
    pub github_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub digest: String,
    pub files: CollectionStats,
}

/// A successful validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validated {
    pub validated: bool,
    pub github_url: String,
    pub branch: String,
    pub message: String,
    #[serde(default)]
    pub meta: FrontmatterMap,
}

/// Response from the fetch endpoint; the shape depends on the request.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Fetched {
    Listing(Listing),
    Bundle(Bundle),
    Validated(Validated),
}

/// Error response from API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub missing_fields: Vec<String>,
}

/// Default total timeout for daemon readiness probe.
const DEFAULT_READY_TIMEOUT_MS: u64 = 5000;

/// Initial backoff delay for readiness probe.
const INITIAL_BACKOFF_MS: u64 = 200;

/// HTTP client for skilld.
#[derive(Debug)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Returns the daemon address (for error messages).
    pub fn addr(&self) -> &str {
        &self.base_url
    }

    /// Check if daemon is healthy by probing /health endpoint.
    pub async fn check_health(&self) -> Result<bool, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    /// Wait for daemon to become ready with exponential backoff.
    ///
    /// Retries for 5s total, starting at 200ms and doubling.
    pub async fn wait_for_ready(&self) -> Result<(), ClientError> {
        self.wait_for_ready_with_timeout(DEFAULT_READY_TIMEOUT_MS)
            .await
    }

    /// Wait for daemon to become ready with custom timeout.
    pub async fn wait_for_ready_with_timeout(&self, timeout_ms: u64) -> Result<(), ClientError> {
        let start = std::time::Instant::now();
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match self.check_health().await {
                Ok(true) => return Ok(()),
                Ok(false) | Err(_) => {
                    let elapsed = start.elapsed().as_millis() as u64;
                    if elapsed >= timeout_ms {
                        return Err(ClientError::DaemonNotReady {
                            addr: self.base_url.clone(),
                            timeout_ms,
                        });
                    }

                    eprintln!(
                        "waiting for daemon at {} (retrying in {}ms)",
                        self.base_url, backoff_ms
                    );

                    let remaining = timeout_ms.saturating_sub(elapsed);
                    let sleep_ms = backoff_ms.min(remaining);
                    tokio::time::sleep(std::time::Duration::from_millis(sleep_ms)).await;

                    backoff_ms = backoff_ms.saturating_mul(2);
                }
            }
        }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Handle error response from API.
    async fn handle_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response.json::<ErrorResponse>().await.ok();
        classify_error(status, body)
    }

    /// POST /api/v1/skills/fetch-github
    pub async fn fetch(&self, req: &FetchRequest) -> Result<Fetched, ClientError> {
        let url = format!("{}/api/v1/skills/fetch-github", self.base_url);
        let response = self
            .http
            .post(&url)
            .headers(Self::headers())
            .json(req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Resolve a reference to a listing or a bundle.
    pub async fn resolve(
        &self,
        reference: &str,
        skill_path: Option<String>,
    ) -> Result<Fetched, ClientError> {
        self.fetch(&FetchRequest {
            github_url: reference.to_string(),
            skill_path,
            validate_only: false,
        })
        .await
    }

    /// Check a repository's root manifest without fetching anything else.
    pub async fn validate(&self, reference: &str) -> Result<Validated, ClientError> {
        let fetched = self
            .fetch(&FetchRequest {
                github_url: reference.to_string(),
                skill_path: None,
                validate_only: true,
            })
            .await?;
        match fetched {
            Fetched::Validated(v) => Ok(v),
            other => Err(ClientError::InvalidResponse(format!(
                "expected a validation result, got {other:?}"
            ))),
        }
    }
}

/// Map an error status and its body to a client error.
fn classify_error(status: u16, body: Option<ErrorResponse>) -> ClientError {
    let (message, missing) = match body {
        Some(b) => (b.error, b.missing_fields),
        None => ("unknown error".to_string(), Vec::new()),
    };

    match status {
        400 if !missing.is_empty() => ClientError::ValidationFailed { message, missing },
        404 => ClientError::NotFound(message),
        429 => ClientError::RateLimited(message),
        _ => ClientError::HttpError { status, message },
    }
}
