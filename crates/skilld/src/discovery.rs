//! Repository-wide discovery when no skill path was given.

use skill_core::classify::{find_collections, find_root_manifest};
use skill_core::{RepositoryIdentity, ResolveError, SkillFile};
use tracing::{debug, info, warn};

use crate::github::RepoHost;
use crate::resolver::{Resolution, Resolver};

impl<H: RepoHost> Resolver<H> {
    /// Decide what a repository offers.
    ///
    /// A root manifest makes the whole repository one skill. Without one,
    /// collection directories are listed. If the tree listing is unavailable
    /// or shows neither, the root manifest is fetched directly.
    pub async fn discover(
        &self,
        identity: RepositoryIdentity,
        branch: String,
    ) -> Result<Resolution, ResolveError> {
        let config = self.config();
        let tree = match self.host().tree(&identity, &branch).await {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!(repo = %identity, branch = %branch, error = %e, "tree listing failed, using fallback");
                None
            }
        };

        if let Some(name) = tree.as_deref().and_then(|entries| find_root_manifest(entries, config)) {
            match self.host().raw_file(&identity, &branch, name).await {
                Ok(content) => {
                    let manifest = SkillFile::new(name, content);
                    return self
                        .collect_skill(identity, branch, "", manifest, tree)
                        .await
                        .map(Resolution::Bundle);
                }
                Err(e) => debug!(repo = %identity, manifest = name, error = %e, "root manifest not fetched"),
            }
        }

        let skills = tree
            .as_deref()
            .map(|entries| find_collections(entries, config))
            .unwrap_or_default();
        if !skills.is_empty() {
            info!(repo = %identity, count = skills.len(), "found skill collection");
            return Ok(Resolution::Listing { identity, skills });
        }

        if let Some(manifest) = self.fetch_manifest(&identity, &branch, "").await {
            return self
                .collect_skill(identity, branch, "", manifest, tree)
                .await
                .map(Resolution::Bundle);
        }

        Err(ResolveError::ManifestNotFound(format!(
            "No {} found in repository",
            config.primary_manifest()
        )))
    }
}
