//! Core types for the skill resolver.
//!
//! Everything here is created fresh per request and dropped once the
//! response has been produced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Skill path that requests every skill in the collection directory merged
/// into one bundle.
pub const MERGE_ALL: &str = "__ALL__";

/// Parsed frontmatter key/value pairs of a manifest.
///
/// A `BTreeMap` keeps serialized output stable across runs.
pub type FrontmatterMap = BTreeMap<String, String>;

/// Owner and repository name of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub repo: String,
}

impl RepositoryIdentity {
    /// Canonical browser URL for the repository.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Kind of a row in a recursive tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    /// Submodule commits and anything else the host may return.
    #[serde(other)]
    Other,
}

/// One row of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: TreeEntryKind::Blob,
        }
    }

    pub fn tree(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: TreeEntryKind::Tree,
        }
    }

    pub fn is_blob(&self) -> bool {
        self.kind == TreeEntryKind::Blob
    }

    pub fn is_tree(&self) -> bool {
        self.kind == TreeEntryKind::Tree
    }
}

/// Kind of a row in a one-level directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirEntryKind {
    File,
    Dir,
    /// Symlinks and submodules are never followed.
    #[serde(other)]
    Other,
}

/// One row of a directory contents listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: DirEntryKind,
}

/// A repository file that survived classification and will be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Repository-relative path used for fetching.
    pub path: String,
    /// Bundle-relative filename the content is stored under.
    pub relative: String,
    pub is_binary: bool,
}

/// A fetched file ready for bundling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillFile {
    pub filename: String,
    pub content: String,
}

impl SkillFile {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// One skill offered by a multi-skill repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillListing {
    pub name: String,
    pub path: String,
    pub category: String,
}

/// Attempted vs. collected file counts for one resolution.
///
/// Individual fetch failures are dropped silently; the gap between the two
/// numbers is the only trace they leave in the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub attempted: usize,
    pub collected: usize,
}

impl CollectionStats {
    pub fn dropped(&self) -> usize {
        self.attempted.saturating_sub(self.collected)
    }
}
