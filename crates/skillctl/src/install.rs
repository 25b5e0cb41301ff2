//! Unpack a resolved bundle onto disk.

use std::path::{Component, Path, PathBuf};

use skill_core::bundle::{bundle_digest, parse_bundle};

use crate::client::ClientError;

/// Bundle-relative filename as a path under `dest`.
///
/// Only plain components are allowed; absolute paths, `..` and `.` are
/// rejected.
fn target_path(dest: &Path, filename: &str) -> Result<PathBuf, ClientError> {
    let relative = Path::new(filename);
    let safe = !filename.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(ClientError::UnsafePath(filename.to_string()));
    }
    Ok(dest.join(relative))
}

/// Verify `content` against `digest` and write each file under `dest`.
///
/// Every path is checked before anything is written. Returns the written
/// paths in bundle order.
pub fn install_bundle(
    content: &str,
    digest: &str,
    dest: &Path,
) -> Result<Vec<PathBuf>, ClientError> {
    let actual = bundle_digest(content);
    if actual != digest {
        return Err(ClientError::InvalidResponse(format!(
            "bundle digest mismatch: expected {digest}, got {actual}"
        )));
    }

    let files = parse_bundle(content)?;
    let targets = files
        .iter()
        .map(|f| target_path(dest, &f.filename))
        .collect::<Result<Vec<_>, _>>()?;

    for (file, target) in files.iter().zip(&targets) {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, &file.content)?;
    }

    Ok(targets)
}
