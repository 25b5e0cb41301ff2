//! Default branch resolution.
//!
//! Strategies are tried in order. Each one either settles the branch, is
//! skipped, or fails the whole resolution.

use skill_core::{RepositoryIdentity, ResolveError, ResolverConfig};
use tracing::{debug, info};

use crate::github::{HostError, RepoHost};

/// Branch used when metadata omits `default_branch`.
const FALLBACK_BRANCH: &str = "main";

/// Outcome of one step in a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Resolved(T),
    Skip,
    Fatal(ResolveError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchStrategy {
    /// Ask the host for the repository's declared default branch.
    Metadata,
    /// Check that the repository root is listable on a named branch.
    Probe(String),
}

impl BranchStrategy {
    /// Metadata first, then each configured probe branch.
    pub fn chain(config: &ResolverConfig) -> Vec<Self> {
        std::iter::once(Self::Metadata)
            .chain(config.probe_branches.iter().cloned().map(Self::Probe))
            .collect()
    }

    async fn attempt<H: RepoHost>(&self, host: &H, id: &RepositoryIdentity) -> Attempt<String> {
        match self {
            Self::Metadata => match host.repo_metadata(id).await {
                Ok(meta) => Attempt::Resolved(
                    meta.default_branch
                        .filter(|b| !b.is_empty())
                        .unwrap_or_else(|| FALLBACK_BRANCH.to_string()),
                ),
                Err(HostError::NotFound) => Attempt::Fatal(ResolveError::RepositoryNotFound),
                Err(HostError::RateLimited) => Attempt::Fatal(ResolveError::RateLimited),
                Err(e) => {
                    debug!(repo = %id, error = %e, "repository metadata unavailable");
                    Attempt::Skip
                }
            },
            Self::Probe(branch) => match host.probe_branch(id, branch).await {
                Ok(()) => Attempt::Resolved(branch.clone()),
                Err(e) => {
                    debug!(repo = %id, branch = %branch, error = %e, "branch probe failed");
                    Attempt::Skip
                }
            },
        }
    }
}

/// Determine the branch to read from.
pub async fn resolve_branch<H: RepoHost>(
    host: &H,
    id: &RepositoryIdentity,
    config: &ResolverConfig,
) -> Result<String, ResolveError> {
    for strategy in BranchStrategy::chain(config) {
        match strategy.attempt(host, id).await {
            Attempt::Resolved(branch) => {
                info!(repo = %id, branch = %branch, ?strategy, "resolved branch");
                return Ok(branch);
            }
            Attempt::Skip => {}
            Attempt::Fatal(e) => return Err(e),
        }
    }
    Err(ResolveError::RepositoryInaccessible)
}
