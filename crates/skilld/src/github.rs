//! GitHub access for the resolver.
//!
//! `RepoHost` is the seam between resolution logic and the network: the
//! resolver only ever talks to a host through it. `GitHubClient` is the
//! production implementation over the REST API and raw content host.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use skill_core::{DirEntry, RepositoryIdentity, ResolverConfig, TreeEntry};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited,

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl HostError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            403 | 429 => Self::RateLimited,
            other => Self::Status(other),
        }
    }
}

impl From<reqwest::Error> for HostError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            HostError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            HostError::from_status(status.as_u16())
        } else {
            HostError::Transport(e.to_string())
        }
    }
}

/// Repository metadata (`GET /repos/{owner}/{repo}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepoMetadata {
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Recursive tree listing (`GET /repos/{owner}/{repo}/git/trees/{ref}`).
#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

/// Read-only access to a source-control host.
///
/// Each call is independent and either resolves or fails on its own; the
/// resolver decides which failures are fatal.
pub trait RepoHost: Send + Sync {
    /// Repository metadata, including the declared default branch.
    fn repo_metadata(
        &self,
        id: &RepositoryIdentity,
    ) -> impl Future<Output = Result<RepoMetadata, HostError>> + Send;

    /// Succeeds if the repository root can be listed on `branch`.
    fn probe_branch(
        &self,
        id: &RepositoryIdentity,
        branch: &str,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Every path in the repository at `branch`, in one call.
    fn tree(
        &self,
        id: &RepositoryIdentity,
        branch: &str,
    ) -> impl Future<Output = Result<Vec<TreeEntry>, HostError>> + Send;

    /// One level of a directory. An empty `dir` lists the repository root.
    fn list_dir(
        &self,
        id: &RepositoryIdentity,
        branch: &str,
        dir: &str,
    ) -> impl Future<Output = Result<Vec<DirEntry>, HostError>> + Send;

    /// Raw content of a file.
    fn raw_file(
        &self,
        id: &RepositoryIdentity,
        branch: &str,
        path: &str,
    ) -> impl Future<Output = Result<String, HostError>> + Send;
}

/// Append `/`-separated segments to a base URL, percent-encoding each one.
fn endpoint<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, HostError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| HostError::Transport(format!("base URL cannot take a path: {base}")))?
        .pop_if_empty()
        .extend(segments.into_iter().filter(|s| !s.is_empty()));
    Ok(url)
}

/// GitHub REST + raw content client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: Url,
    raw_base: Url,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &ResolverConfig, token: Option<String>) -> Result<Self, HostError> {
        let parse = |base: &str| {
            Url::parse(base).map_err(|e| HostError::Transport(format!("invalid base URL {base}: {e}")))
        };

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()?;

        Ok(Self {
            http,
            api_base: parse(&config.github_api_base)?,
            raw_base: parse(&config.github_raw_base)?,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Headers for REST API calls. The token is never sent to the raw host.
    fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("token {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    fn repo_url(&self, id: &RepositoryIdentity, rest: &[&str]) -> Result<Url, HostError> {
        let segments = ["repos", id.owner.as_str(), id.repo.as_str()];
        endpoint(&self.api_base, segments.into_iter().chain(rest.iter().copied()))
    }

    async fn get(&self, url: Url, api: bool) -> Result<reqwest::Response, HostError> {
        let mut request = self.http.get(url.clone());
        if api {
            request = request.headers(self.api_headers());
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        debug!(url = %url, status = status.as_u16(), "host returned error status");
        Err(HostError::from_status(status.as_u16()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HostError> {
        let response = self.get(url, true).await?;
        response.json::<T>().await.map_err(|e| HostError::Decode(e.to_string()))
    }
}

impl RepoHost for GitHubClient {
    async fn repo_metadata(&self, id: &RepositoryIdentity) -> Result<RepoMetadata, HostError> {
        let url = self.repo_url(id, &[])?;
        self.get_json(url).await
    }

    async fn probe_branch(&self, id: &RepositoryIdentity, branch: &str) -> Result<(), HostError> {
        let mut url = self.repo_url(id, &["contents"])?;
        url.query_pairs_mut().append_pair("ref", branch);
        self.get(url, true).await.map(|_| ())
    }

    async fn tree(&self, id: &RepositoryIdentity, branch: &str) -> Result<Vec<TreeEntry>, HostError> {
        let mut url = self.repo_url(id, &["git", "trees", branch])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let body: TreeResponse = self.get_json(url).await?;
        if body.truncated {
            warn!(repo = %id, branch, entries = body.tree.len(), "tree listing truncated by host");
        }
        Ok(body.tree)
    }

    async fn list_dir(
        &self,
        id: &RepositoryIdentity,
        branch: &str,
        dir: &str,
    ) -> Result<Vec<DirEntry>, HostError> {
        let mut rest = vec!["contents"];
        rest.extend(dir.split('/'));
        let mut url = self.repo_url(id, &rest)?;
        url.query_pairs_mut().append_pair("ref", branch);
        self.get_json(url).await
    }

    async fn raw_file(
        &self,
        id: &RepositoryIdentity,
        branch: &str,
        path: &str,
    ) -> Result<String, HostError> {
        let segments = [id.owner.as_str(), id.repo.as_str(), branch];
        let url = endpoint(&self.raw_base, segments.into_iter().chain(path.split('/')))?;
        let response = self.get(url, false).await?;
        Ok(response.text().await?)
    }
}
