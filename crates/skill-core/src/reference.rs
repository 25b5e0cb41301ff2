//! Repository reference parsing.
//!
//! Accepts `https://github.com/owner/repo`, the same with a trailing `.git`,
//! and the bare `owner/repo` shorthand.

use crate::error::ResolveError;
use crate::types::RepositoryIdentity;

const HOST_MARKER: &str = "github.com/";

/// Parse a user-supplied repository reference.
///
/// Forms are tried in order and the first match wins, so a string holding
/// the host marker without two segments after it may still match as
/// shorthand (`github.com/octocat` is owner `github.com`). Anything after the
/// repository segment of a URL (`/tree/main/...`, query strings) is ignored.
pub fn parse_reference(input: &str) -> Result<RepositoryIdentity, ResolveError> {
    let input = input.trim();

    let (owner, repo) = parse_host_form(input)
        .or_else(|| parse_shorthand(input))
        .ok_or(ResolveError::MalformedReference)?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    if owner.is_empty() || repo.is_empty() {
        return Err(ResolveError::MalformedReference);
    }

    Ok(RepositoryIdentity {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// `<anything>github.com/<owner>/<repo>[/...]`
fn parse_host_form(input: &str) -> Option<(&str, &str)> {
    let start = input.find(HOST_MARKER)? + HOST_MARKER.len();
    let rest = &input[start..];
    let (owner, rest) = rest.split_once('/')?;
    let repo = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner, repo))
}

/// `<owner>/<repo>` with nothing else.
fn parse_shorthand(input: &str) -> Option<(&str, &str)> {
    let (owner, repo) = input.split_once('/')?;
    if repo.contains('/') || owner.chars().any(char::is_whitespace) {
        return None;
    }
    Some((owner, repo))
}
