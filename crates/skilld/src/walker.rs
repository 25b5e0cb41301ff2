//! Directory-by-directory fallback for when the recursive tree listing is
//! unavailable.

use futures_util::future::BoxFuture;
use skill_core::classify::{is_binary_path, relative_to_base};
use skill_core::{CandidateFile, DirEntryKind, RepositoryIdentity, ResolverConfig};
use tracing::debug;

use crate::collector::{fetch_candidates, FileSet};
use crate::github::RepoHost;

#[derive(Debug)]
struct WalkContext<'a, H> {
    host: &'a H,
    id: &'a RepositoryIdentity,
    branch: &'a str,
    config: &'a ResolverConfig,
    base: &'a str,
}

/// Collect the files under `base` into `set`, one listing call per directory.
///
/// Descent stops at `max_walk_depth` and collection at `max_skill_files`
/// attempts. A directory whose listing fails is skipped.
pub async fn walk_skill<H: RepoHost>(
    host: &H,
    id: &RepositoryIdentity,
    branch: &str,
    base: &str,
    config: &ResolverConfig,
    set: &mut FileSet,
) {
    let ctx = WalkContext {
        host,
        id,
        branch,
        config,
        base,
    };
    walk_dir(&ctx, base.to_string(), 0, set).await;
}

fn walk_dir<'a, H: RepoHost>(
    ctx: &'a WalkContext<'_, H>,
    dir: String,
    depth: usize,
    set: &'a mut FileSet,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let entries = match ctx.host.list_dir(ctx.id, ctx.branch, &dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(repo = %ctx.id, dir = %dir, error = %e, "skipping unlisted directory");
                return;
            }
        };

        let at_repo_root = ctx.base.is_empty() && depth == 0;
        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        for entry in entries {
            match entry.kind {
                DirEntryKind::File => {
                    let Some(relative) = relative_to_base(&entry.path, ctx.base) else {
                        continue;
                    };
                    files.push(CandidateFile {
                        relative: relative.to_string(),
                        is_binary: is_binary_path(&entry.path, ctx.config),
                        path: entry.path,
                    });
                }
                DirEntryKind::Dir => {
                    if at_repo_root && ctx.config.excluded_root_dirs.contains(&entry.name) {
                        continue;
                    }
                    subdirs.push(entry.path);
                }
                DirEntryKind::Other => {}
            }
        }

        let remaining = ctx.config.max_skill_files.saturating_sub(set.attempted());
        fetch_candidates(ctx.host, ctx.id, ctx.branch, files, remaining, set).await;

        if depth >= ctx.config.max_walk_depth {
            if !subdirs.is_empty() {
                debug!(repo = %ctx.id, dir = %dir, depth, "walk depth limit reached");
            }
            return;
        }

        for subdir in subdirs {
            if set.attempted() >= ctx.config.max_skill_files {
                break;
            }
            walk_dir(ctx, subdir, depth + 1, &mut *set).await;
        }
    })
}
