//! Resolution entry point.
//!
//! A `Resolver` turns one request into either a listing of the skills a
//! repository offers, a bundle of one skill's files, or a validation result.
//! It holds no per-request state and can be shared across handlers.

use skill_core::bundle::{bundle_digest, serialize_bundle};
use skill_core::classify::{join_path, merge_candidates, skill_candidates};
use skill_core::reference::parse_reference;
use skill_core::{
    CollectionStats, RepositoryIdentity, ResolveError, ResolverConfig, SkillFile, SkillListing,
    TreeEntry, MERGE_ALL,
};
use tracing::{debug, info};

use crate::branch::{resolve_branch, Attempt};
use crate::collector::{fetch_candidates, FileSet};
use crate::github::RepoHost;
use crate::validate::{validate_manifest, Validation};
use crate::walker::walk_skill;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    pub reference: String,
    pub skill_path: Option<String>,
    pub validate_only: bool,
}

impl ResolveRequest {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }

    pub fn skill(mut self, path: impl Into<String>) -> Self {
        self.skill_path = Some(path.into());
        self
    }

    pub fn merge_all(self) -> Self {
        self.skill(MERGE_ALL)
    }

    pub fn validate_only(mut self) -> Self {
        self.validate_only = true;
        self
    }
}

/// One skill's files, manifest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBundle {
    pub identity: RepositoryIdentity,
    pub branch: String,
    pub files: Vec<SkillFile>,
    pub stats: CollectionStats,
}

impl ResolvedBundle {
    fn from_set(identity: RepositoryIdentity, branch: String, set: FileSet) -> Self {
        let stats = set.stats();
        Self {
            identity,
            branch,
            files: set.into_files(),
            stats,
        }
    }

    /// The serialized bundle document.
    pub fn content(&self) -> String {
        serialize_bundle(&self.files)
    }

    /// Serialized document together with its digest.
    pub fn render(&self) -> (String, String) {
        let content = self.content();
        let digest = bundle_digest(&content);
        (content, digest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Listing {
        identity: RepositoryIdentity,
        skills: Vec<SkillListing>,
    },
    Bundle(ResolvedBundle),
    Validated(Validation),
}

/// Where a skill's supporting files come from, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    /// Filter one recursive tree listing.
    Tree,
    /// List directories one level at a time.
    Walk,
}

impl FileSource {
    pub const CHAIN: [Self; 2] = [Self::Tree, Self::Walk];
}

#[derive(Debug)]
pub struct Resolver<H> {
    host: H,
    config: ResolverConfig,
}

impl<H: RepoHost> Resolver<H> {
    pub fn new(host: H, config: ResolverConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        let reference = request.reference.trim();
        if reference.is_empty() {
            return Err(ResolveError::MissingUrl);
        }
        let identity = parse_reference(reference)?;

        if request.validate_only {
            return validate_manifest(&self.host, identity, &self.config)
                .await
                .map(Resolution::Validated);
        }

        let branch = resolve_branch(&self.host, &identity, &self.config).await?;

        let skill_path = request
            .skill_path
            .as_deref()
            .map(|p| p.trim().trim_matches('/'))
            .filter(|p| !p.is_empty());

        match skill_path {
            None => self.discover(identity, branch).await,
            Some(MERGE_ALL) => self.merge_all(identity, branch).await.map(Resolution::Bundle),
            Some(path) => self
                .resolve_skill(identity, branch, path)
                .await
                .map(Resolution::Bundle),
        }
    }

    /// First manifest found under `base`, in configured preference order.
    pub(crate) async fn fetch_manifest(
        &self,
        identity: &RepositoryIdentity,
        branch: &str,
        base: &str,
    ) -> Option<SkillFile> {
        for name in &self.config.manifest_names {
            let path = join_path(base, name);
            match self.host.raw_file(identity, branch, &path).await {
                Ok(content) => return Some(SkillFile::new(name.as_str(), content)),
                Err(e) => debug!(repo = %identity, path = %path, error = %e, "manifest not fetched"),
            }
        }
        None
    }

    async fn resolve_skill(
        &self,
        identity: RepositoryIdentity,
        branch: String,
        path: &str,
    ) -> Result<ResolvedBundle, ResolveError> {
        let Some(manifest) = self.fetch_manifest(&identity, &branch, path).await else {
            return Err(ResolveError::ManifestNotFound(format!(
                "{} not found in {path}",
                self.config.manifest_names.join(" or ")
            )));
        };
        self.collect_skill(identity, branch, path, manifest, None).await
    }

    /// Gather a skill's supporting files behind its manifest.
    ///
    /// A tree listing the caller already holds is used instead of fetching
    /// a new one. Sources are tried in order until one produces a listing.
    pub(crate) async fn collect_skill(
        &self,
        identity: RepositoryIdentity,
        branch: String,
        base: &str,
        manifest: SkillFile,
        mut tree: Option<Vec<TreeEntry>>,
    ) -> Result<ResolvedBundle, ResolveError> {
        let manifest_name = manifest.filename.clone();
        let mut set = FileSet::with_manifest(manifest);

        for source in FileSource::CHAIN {
            let attempt = match source {
                FileSource::Tree => {
                    self.collect_from_tree(&identity, &branch, base, &manifest_name, tree.take(), &mut set)
                        .await
                }
                FileSource::Walk => {
                    walk_skill(&self.host, &identity, &branch, base, &self.config, &mut set).await;
                    Attempt::Resolved(())
                }
            };

            match attempt {
                Attempt::Resolved(()) => {
                    debug!(repo = %identity, ?source, "collected supporting files");
                    break;
                }
                Attempt::Skip => {}
                Attempt::Fatal(e) => return Err(e),
            }
        }

        let bundle = ResolvedBundle::from_set(identity, branch, set);
        info!(
            repo = %bundle.identity,
            branch = %bundle.branch,
            base,
            attempted = bundle.stats.attempted,
            collected = bundle.stats.collected,
            "resolved skill"
        );
        Ok(bundle)
    }

    async fn collect_from_tree(
        &self,
        identity: &RepositoryIdentity,
        branch: &str,
        base: &str,
        manifest_name: &str,
        prefetched: Option<Vec<TreeEntry>>,
        set: &mut FileSet,
    ) -> Attempt<()> {
        let entries = match prefetched {
            Some(entries) => entries,
            None => match self.host.tree(identity, branch).await {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(repo = %identity, branch, error = %e, "tree listing unavailable");
                    return Attempt::Skip;
                }
            },
        };
        let candidates = skill_candidates(&entries, base, manifest_name, &self.config);
        fetch_candidates(
            &self.host,
            identity,
            branch,
            candidates,
            self.config.max_skill_files,
            set,
        )
        .await;
        Attempt::Resolved(())
    }

    /// Every file of every skill in the collection directory as one bundle.
    async fn merge_all(
        &self,
        identity: RepositoryIdentity,
        branch: String,
    ) -> Result<ResolvedBundle, ResolveError> {
        let entries = self.host.tree(&identity, &branch).await.map_err(|e| {
            debug!(repo = %identity, branch = %branch, error = %e, "tree listing unavailable");
            ResolveError::TreeUnavailable
        })?;

        let candidates = merge_candidates(&entries, &self.config);
        if candidates.is_empty() {
            return Err(ResolveError::NoCollectionFiles);
        }

        let mut set = FileSet::new();
        fetch_candidates(
            &self.host,
            &identity,
            &branch,
            candidates,
            self.config.max_merged_files,
            &mut set,
        )
        .await;
        if set.is_empty() {
            return Err(ResolveError::AllFetchesFailed);
        }

        let bundle = ResolvedBundle::from_set(identity, branch, set);
        info!(
            repo = %bundle.identity,
            attempted = bundle.stats.attempted,
            collected = bundle.stats.collected,
            "merged collection"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::HostError;
    use crate::testing::FakeHost;
    use skill_core::bundle::parse_bundle;

    const MANIFEST: &str = "---\nname: demo\ndescription: A demo skill\n---\n# Demo\n";

    fn resolver(host: FakeHost) -> Resolver<FakeHost> {
        Resolver::new(host, ResolverConfig::default())
    }

    fn bundle(resolution: Resolution) -> ResolvedBundle {
        match resolution {
            Resolution::Bundle(b) => b,
            other => panic!("expected bundle, got {other:?}"),
        }
    }

    fn names(bundle: &ResolvedBundle) -> Vec<&str> {
        bundle.files.iter().map(|f| f.filename.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_reference_is_missing_url() {
        let r = resolver(FakeHost::new());
        let err = r.resolve(&ResolveRequest::new("  ")).await.unwrap_err();
        assert_eq!(err, ResolveError::MissingUrl);
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn malformed_reference_makes_no_calls() {
        let r = resolver(FakeHost::new());
        let err = r.resolve(&ResolveRequest::new("not a repo")).await.unwrap_err();
        assert_eq!(err, ResolveError::MalformedReference);
        assert!(r.host().calls().is_empty());
    }

    #[tokio::test]
    async fn validate_only_short_circuits() {
        let host = FakeHost::new().file("SKILL.md", MANIFEST);
        let r = resolver(host);
        let resolution = r
            .resolve(&ResolveRequest::new("https://github.com/octocat/Hello-World").validate_only().merge_all())
            .await
            .unwrap();
        match resolution {
            Resolution::Validated(v) => {
                assert_eq!(v.identity.owner, "octocat");
                assert_eq!(v.identity.repo, "Hello-World");
            }
            other => panic!("expected validation, got {other:?}"),
        }
        assert_eq!(r.host().count("metadata"), 0);
        assert_eq!(r.host().count("tree"), 0);
    }

    #[tokio::test]
    async fn skills_directory_yields_listing() {
        let host = FakeHost::new()
            .file("skills/alpha/SKILL.md", MANIFEST)
            .file("skills/beta/SKILL.md", MANIFEST)
            .file("skills/beta/scripts/run.sh", "echo")
            .file("README.txt", "hi");
        let r = resolver(host);
        let resolution = r.resolve(&ResolveRequest::new("o/r")).await.unwrap();
        match resolution {
            Resolution::Listing { skills, .. } => {
                let got: Vec<(&str, &str, &str)> = skills
                    .iter()
                    .map(|s| (s.name.as_str(), s.path.as_str(), s.category.as_str()))
                    .collect();
                assert_eq!(
                    got,
                    vec![
                        ("alpha", "skills/alpha", "skills"),
                        ("beta", "skills/beta", "skills"),
                    ]
                );
            }
            other => panic!("expected listing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn root_manifest_wins_over_collections() {
        let host = FakeHost::new()
            .file("SKILL.md", MANIFEST)
            .file("guide.md", "guide")
            .file("logo.png", "png")
            .file(".github/workflows/ci.yml", "ci")
            .file("skills/alpha/SKILL.md", MANIFEST);
        let r = resolver(host);
        let b = bundle(r.resolve(&ResolveRequest::new("o/r")).await.unwrap());

        assert_eq!(names(&b), vec!["SKILL.md", "guide.md"]);
        assert_eq!(b.files[0].content, MANIFEST);
        assert_eq!(b.branch, "main");
        assert_eq!(b.stats, CollectionStats { attempted: 1, collected: 1 });
        assert_eq!(r.host().count("tree"), 1);
    }

    #[tokio::test]
    async fn failed_root_manifest_fetch_continues_to_collections() {
        let host = FakeHost::new()
            .file("SKILL.md", MANIFEST)
            .failing_file("SKILL.md")
            .file("rules/rust/SKILL.md", MANIFEST);
        let r = resolver(host);
        let resolution = r.resolve(&ResolveRequest::new("o/r")).await.unwrap();
        assert!(matches!(
            resolution,
            Resolution::Listing { ref skills, .. } if skills.len() == 1 && skills[0].category == "rules"
        ));
    }

    #[tokio::test]
    async fn tree_failure_falls_back_to_raw_manifest_and_walk() {
        let host = FakeHost::new()
            .file("README.md", "# readme")
            .file("docs/usage.md", "usage")
            .tree_error(HostError::Status(500));
        let r = resolver(host);
        let b = bundle(r.resolve(&ResolveRequest::new("o/r")).await.unwrap());

        assert_eq!(names(&b), vec!["README.md", "docs/usage.md"]);
        assert!(r.host().count("list") >= 2);
    }

    #[tokio::test]
    async fn nothing_found_is_manifest_not_found() {
        let host = FakeHost::new().file("src/main.rs", "fn main() {}");
        let r = resolver(host);
        let err = r.resolve(&ResolveRequest::new("o/r")).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::ManifestNotFound("No SKILL.md found in repository".to_string())
        );
    }

    #[tokio::test]
    async fn specific_skill_collects_relative_files() {
        let host = FakeHost::new()
            .file("skills/pdf/SKILL.md", MANIFEST)
            .file("skills/pdf/reference.md", "ref")
            .file("skills/pdf/scripts/extract.py", "py")
            .file("skills/pdf/sample.pdf", "%PDF")
            .file("skills/other/SKILL.md", MANIFEST);
        let r = resolver(host);
        let b = bundle(
            r.resolve(&ResolveRequest::new("o/r").skill("/skills/pdf/"))
                .await
                .unwrap(),
        );
        assert_eq!(
            names(&b),
            vec!["SKILL.md", "reference.md", "scripts/extract.py"]
        );
    }

    #[tokio::test]
    async fn specific_skill_walks_when_tree_fails() {
        let host = FakeHost::new()
            .file("skills/pdf/SKILL.md", MANIFEST)
            .file("skills/pdf/scripts/extract.py", "py")
            .tree_error(HostError::Transport("timeout".to_string()));
        let r = resolver(host);
        let b = bundle(
            r.resolve(&ResolveRequest::new("o/r").skill("skills/pdf"))
                .await
                .unwrap(),
        );
        assert_eq!(names(&b), vec!["SKILL.md", "scripts/extract.py"]);
    }

    #[tokio::test]
    async fn specific_skill_prefers_skill_md_over_readme() {
        let host = FakeHost::new()
            .file("tools/x/README.md", "readme")
            .file("tools/x/SKILL.md", MANIFEST);
        let r = resolver(host);
        let b = bundle(
            r.resolve(&ResolveRequest::new("o/r").skill("tools/x"))
                .await
                .unwrap(),
        );
        assert_eq!(names(&b), vec!["SKILL.md", "README.md"]);
    }

    #[tokio::test]
    async fn specific_skill_without_manifest_names_path() {
        let host = FakeHost::new().file("skills/pdf/notes.md", "x");
        let r = resolver(host);
        let err = r
            .resolve(&ResolveRequest::new("o/r").skill("skills/pdf"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::ManifestNotFound(
                "SKILL.md or README.md not found in skills/pdf".to_string()
            )
        );
    }

    #[tokio::test]
    async fn merge_all_strips_prefix_and_drops_binaries() {
        let host = FakeHost::new()
            .file("skills/alpha/SKILL.md", MANIFEST)
            .file("skills/beta/SKILL.md", MANIFEST)
            .file("skills/beta/diagram.png", "png")
            .file("README.md", "top");
        let r = resolver(host);
        let b = bundle(r.resolve(&ResolveRequest::new("o/r").merge_all()).await.unwrap());

        assert_eq!(names(&b), vec!["alpha/SKILL.md", "beta/SKILL.md"]);
        let parsed = parse_bundle(&b.content()).unwrap();
        assert_eq!(parsed, b.files);
    }

    #[tokio::test]
    async fn merge_all_errors() {
        let r = resolver(
            FakeHost::new()
                .file("skills/a/SKILL.md", MANIFEST)
                .tree_error(HostError::Status(500)),
        );
        let err = r.resolve(&ResolveRequest::new("o/r").merge_all()).await.unwrap_err();
        assert_eq!(err, ResolveError::TreeUnavailable);
        assert_eq!(err.status_code(), 404);

        let r = resolver(FakeHost::new().file("README.md", "x"));
        let err = r.resolve(&ResolveRequest::new("o/r").merge_all()).await.unwrap_err();
        assert_eq!(err, ResolveError::NoCollectionFiles);

        let r = resolver(
            FakeHost::new()
                .file("skills/a/SKILL.md", MANIFEST)
                .failing_file("skills/a/SKILL.md"),
        );
        let err = r.resolve(&ResolveRequest::new("o/r").merge_all()).await.unwrap_err();
        assert_eq!(err, ResolveError::AllFetchesFailed);
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn merge_all_respects_volume_bound() {
        let mut host = FakeHost::new();
        for i in 0..130 {
            host = host.file(&format!("skills/s{i:03}/SKILL.md"), "x");
        }
        let r = resolver(host);
        let b = bundle(r.resolve(&ResolveRequest::new("o/r").merge_all()).await.unwrap());
        assert_eq!(b.files.len(), 100);
        assert_eq!(r.host().count("raw"), 100);
    }

    #[tokio::test]
    async fn single_skill_respects_volume_bound() {
        let mut host = FakeHost::new().file("SKILL.md", MANIFEST);
        for i in 0..70 {
            host = host.file(&format!("docs/{i:02}.md"), "x");
        }
        let r = resolver(host);
        let b = bundle(r.resolve(&ResolveRequest::new("o/r")).await.unwrap());
        assert_eq!(b.stats.attempted, 50);
        assert_eq!(b.files.len(), 51);
    }

    #[tokio::test]
    async fn rate_limited_metadata_is_429() {
        let host = FakeHost::new()
            .metadata(Err(HostError::RateLimited))
            .file("SKILL.md", MANIFEST);
        let r = resolver(host);
        let err = r.resolve(&ResolveRequest::new("o/r")).await.unwrap_err();
        assert_eq!(err.status_code(), 429);
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let build = || {
            FakeHost::new()
                .file("SKILL.md", MANIFEST)
                .file("a.md", "a")
                .file("b/c.md", "c")
        };
        let first = bundle(resolver(build()).resolve(&ResolveRequest::new("o/r")).await.unwrap());
        let second = bundle(resolver(build()).resolve(&ResolveRequest::new("o/r")).await.unwrap());
        assert_eq!(first.render(), second.render());
    }
}
