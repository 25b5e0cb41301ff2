//! Validation-only check: is there a well-formed manifest at the root?

use skill_core::frontmatter::{missing_required_fields, parse_frontmatter};
use skill_core::{FrontmatterMap, RepositoryIdentity, ResolveError, ResolverConfig};
use tracing::debug;

use crate::github::RepoHost;

/// A manifest that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub identity: RepositoryIdentity,
    pub branch: String,
    pub meta: FrontmatterMap,
}

/// Probe each configured branch for the primary manifest and check its
/// required frontmatter fields.
///
/// Makes one raw request per probed branch and nothing else.
pub async fn validate_manifest<H: RepoHost>(
    host: &H,
    identity: RepositoryIdentity,
    config: &ResolverConfig,
) -> Result<Validation, ResolveError> {
    let manifest = config.primary_manifest();

    let mut found = None;
    for branch in &config.probe_branches {
        match host.raw_file(&identity, branch, manifest).await {
            Ok(content) => {
                found = Some((branch.clone(), content));
                break;
            }
            Err(e) => debug!(repo = %identity, branch = %branch, error = %e, "manifest probe failed"),
        }
    }

    let Some((branch, content)) = found else {
        return Err(ResolveError::ManifestNotFound(format!(
            "{manifest} not found in the root of the repository. This is required for the add-skill standard."
        )));
    };

    let meta = parse_frontmatter(&content);
    let missing = missing_required_fields(&meta);
    if !missing.is_empty() {
        return Err(ResolveError::MissingRequiredFields { missing, meta });
    }

    Ok(Validation {
        identity,
        branch,
        meta,
    })
}
