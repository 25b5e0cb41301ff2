//! Concurrent file collection.

use std::collections::HashSet;

use futures_util::future::join_all;
use skill_core::{CandidateFile, CollectionStats, RepositoryIdentity, SkillFile};
use tracing::debug;

use crate::github::RepoHost;

/// Files collected so far for one bundle, in output order.
///
/// The first file inserted under a name wins; later duplicates are ignored.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<SkillFile>,
    seen: HashSet<String>,
    attempted: usize,
    collected: usize,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a set with the already-fetched manifest in first position.
    pub fn with_manifest(manifest: SkillFile) -> Self {
        let mut set = Self::new();
        set.insert(manifest);
        set
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.seen.contains(filename)
    }

    /// Returns false if a file with the same name was already collected.
    pub fn insert(&mut self, file: SkillFile) -> bool {
        if !self.seen.insert(file.filename.clone()) {
            return false;
        }
        self.files.push(file);
        true
    }

    /// Fetch attempts made through this set, excluding the manifest.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Counts cover fetched files only; a manifest passed to
    /// `with_manifest` is in neither number.
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            attempted: self.attempted,
            collected: self.collected,
        }
    }

    pub fn into_files(self) -> Vec<SkillFile> {
        self.files
    }
}

/// Fetch up to `limit` candidates concurrently into `set`.
///
/// Candidates whose name is already in the set are skipped before the limit
/// is applied. A failed fetch omits that file and is otherwise silent.
pub async fn fetch_candidates<H: RepoHost>(
    host: &H,
    id: &RepositoryIdentity,
    branch: &str,
    candidates: Vec<CandidateFile>,
    limit: usize,
    set: &mut FileSet,
) {
    let batch: Vec<CandidateFile> = candidates
        .into_iter()
        .filter(|c| !c.is_binary && !set.contains(&c.relative))
        .take(limit)
        .collect();
    if batch.is_empty() {
        return;
    }
    set.attempted += batch.len();

    let results = join_all(batch.into_iter().map(|candidate| async move {
        let result = host.raw_file(id, branch, &candidate.path).await;
        (candidate, result)
    }))
    .await;

    for (candidate, result) in results {
        match result {
            Ok(content) => {
                if set.insert(SkillFile::new(candidate.relative, content)) {
                    set.collected += 1;
                }
            }
            Err(e) => {
                debug!(repo = %id, path = %candidate.path, error = %e, "skipping file");
            }
        }
    }
}
