//! In-memory `RepoHost` for unit tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use skill_core::{DirEntry, DirEntryKind, RepositoryIdentity, TreeEntry};

use crate::github::{HostError, RepoHost, RepoMetadata};

/// A repository held in memory. Files are keyed by `(branch, path)`;
/// directories are implied by file paths.
#[derive(Debug)]
pub struct FakeHost {
    metadata: Result<Option<String>, HostError>,
    branches: HashSet<String>,
    files: BTreeMap<(String, String), String>,
    failing_files: HashSet<String>,
    tree_error: Option<HostError>,
    list_error: Option<HostError>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            metadata: Ok(Some("main".to_string())),
            branches: HashSet::new(),
            files: BTreeMap::new(),
            failing_files: HashSet::new(),
            tree_error: None,
            list_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn metadata(mut self, result: Result<Option<String>, HostError>) -> Self {
        self.metadata = result;
        self
    }

    pub fn default_branch(self, branch: &str) -> Self {
        self.metadata(Ok(Some(branch.to_string())))
    }

    /// Make `branch` answer probes even without files.
    pub fn branch(mut self, branch: &str) -> Self {
        self.branches.insert(branch.to_string());
        self
    }

    pub fn file(self, path: &str, content: &str) -> Self {
        self.file_on("main", path, content)
    }

    pub fn file_on(mut self, branch: &str, path: &str, content: &str) -> Self {
        self.files
            .insert((branch.to_string(), path.to_string()), content.to_string());
        self
    }

    /// Raw fetches of `path` fail with a server error.
    pub fn failing_file(mut self, path: &str) -> Self {
        self.failing_files.insert(path.to_string());
        self
    }

    pub fn tree_error(mut self, error: HostError) -> Self {
        self.tree_error = Some(error);
        self
    }

    pub fn list_error(mut self, error: HostError) -> Self {
        self.list_error = Some(error);
        self
    }

    /// Every call made so far, as `op:argument` strings.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn paths_on<'a>(&'a self, branch: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.files
            .keys()
            .filter(move |(b, _)| b == branch)
            .map(|(_, p)| p.as_str())
    }

    fn has_branch(&self, branch: &str) -> bool {
        self.branches.contains(branch) || self.paths_on(branch).next().is_some()
    }
}

impl RepoHost for FakeHost {
    async fn repo_metadata(&self, _id: &RepositoryIdentity) -> Result<RepoMetadata, HostError> {
        self.record("metadata:".to_string());
        self.metadata.clone().map(|default_branch| RepoMetadata { default_branch })
    }

    async fn probe_branch(&self, _id: &RepositoryIdentity, branch: &str) -> Result<(), HostError> {
        self.record(format!("probe:{branch}"));
        if self.has_branch(branch) {
            Ok(())
        } else {
            Err(HostError::NotFound)
        }
    }

    async fn tree(&self, _id: &RepositoryIdentity, branch: &str) -> Result<Vec<TreeEntry>, HostError> {
        self.record(format!("tree:{branch}"));
        if let Some(e) = &self.tree_error {
            return Err(e.clone());
        }
        if !self.has_branch(branch) {
            return Err(HostError::NotFound);
        }

        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for path in self.paths_on(branch) {
            let mut prefix = String::new();
            let parts: Vec<&str> = path.split('/').collect();
            for part in &parts[..parts.len() - 1] {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(part);
                if dirs.insert(prefix.clone()) {
                    entries.push(TreeEntry::tree(prefix.clone()));
                }
            }
            entries.push(TreeEntry::blob(path));
        }
        Ok(entries)
    }

    async fn list_dir(
        &self,
        _id: &RepositoryIdentity,
        branch: &str,
        dir: &str,
    ) -> Result<Vec<DirEntry>, HostError> {
        self.record(format!("list:{dir}"));
        if let Some(e) = &self.list_error {
            return Err(e.clone());
        }

        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for path in self.paths_on(branch) {
            let Some(rest) = skill_core::classify::relative_to_base(path, dir) else {
                continue;
            };
            let (name, kind) = match rest.split_once('/') {
                Some((child, _)) => (child, DirEntryKind::Dir),
                None => (rest, DirEntryKind::File),
            };
            if seen.insert(name.to_string()) {
                entries.push(DirEntry {
                    name: name.to_string(),
                    path: skill_core::classify::join_path(dir, name),
                    kind,
                });
            }
        }

        if entries.is_empty() {
            Err(HostError::NotFound)
        } else {
            Ok(entries)
        }
    }

    async fn raw_file(
        &self,
        _id: &RepositoryIdentity,
        branch: &str,
        path: &str,
    ) -> Result<String, HostError> {
        self.record(format!("raw:{path}"));
        if self.failing_files.contains(path) {
            return Err(HostError::Status(500));
        }
        self.files
            .get(&(branch.to_string(), path.to_string()))
            .cloned()
            .ok_or(HostError::NotFound)
    }
}
