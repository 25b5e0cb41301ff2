//! Resolution error taxonomy.
//!
//! Every fatal failure carries a short message that is safe to show to the
//! caller. Individual file fetch failures are not errors; they are absorbed
//! by the collector and only show up in `CollectionStats`.

use crate::types::FrontmatterMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("GitHub URL is required")]
    MissingUrl,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid GitHub URL format. Use: github.com/owner/repo or owner/repo")]
    MalformedReference,

    #[error("Repository not found. Please check the repository name and make sure it's public.")]
    RepositoryNotFound,

    #[error("Repository not found or inaccessible. Please ensure the repository is public.")]
    RepositoryInaccessible,

    #[error("GitHub API rate limit exceeded. Please try again later or add a GITHUB_TOKEN.")]
    RateLimited,

    #[error("{0}")]
    ManifestNotFound(String),

    #[error(
        "SKILL.md found, but is missing required frontmatter fields: {}",
        .missing.join(", ")
    )]
    MissingRequiredFields {
        missing: Vec<String>,
        meta: FrontmatterMap,
    },

    #[error("Failed to fetch repository tree")]
    TreeUnavailable,

    #[error("No files found in skills/ directory")]
    NoCollectionFiles,

    #[error("Failed to fetch skill files")]
    AllFetchesFailed,

    #[error("Failed to fetch skill from GitHub")]
    Unexpected(String),
}

impl ResolveError {
    /// HTTP status code the error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingUrl
            | Self::InvalidBody(_)
            | Self::MalformedReference
            | Self::MissingRequiredFields { .. } => 400,
            Self::RepositoryNotFound
            | Self::RepositoryInaccessible
            | Self::ManifestNotFound(_)
            | Self::TreeUnavailable
            | Self::NoCollectionFiles => 404,
            Self::RateLimited => 429,
            Self::AllFetchesFailed | Self::Unexpected(_) => 500,
        }
    }
}
