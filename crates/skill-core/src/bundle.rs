//! Bundle serialization.
//!
//! A bundle is a flat text document holding every file of a skill:
//!
//! ```text
//! === FILE: SKILL.md (42 bytes) ===
//! <exactly 42 bytes of content>
//! === END FILE ===
//! ```
//!
//! The byte count makes each boundary unambiguous even when a file itself
//! contains header-like lines, so `parse_bundle` can always split a bundle
//! back into its files.

use crate::types::SkillFile;
use sha2::{Digest, Sha256};
use thiserror::Error;

const HEADER_PREFIX: &str = "=== FILE: ";
const HEADER_SUFFIX: &str = " bytes) ===";
const FOOTER: &str = "=== END FILE ===";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    #[error("malformed file header at byte {offset}")]
    MalformedHeader { offset: usize },
    #[error("file {filename} is truncated: expected {expected} bytes")]
    Truncated { filename: String, expected: usize },
    #[error("file {filename} is not valid UTF-8")]
    InvalidUtf8 { filename: String },
    #[error("missing end marker after {filename}")]
    MissingFooter { filename: String },
}

/// Serialize files, in order, into one bundle document.
///
/// Pure and deterministic: the same sequence always yields the same bytes.
pub fn serialize_bundle(files: &[SkillFile]) -> String {
    let capacity = files
        .iter()
        .map(|f| f.filename.len() + f.content.len() + 64)
        .sum();
    let mut out = String::with_capacity(capacity);

    for file in files {
        out.push_str(HEADER_PREFIX);
        out.push_str(&file.filename);
        out.push_str(" (");
        out.push_str(&file.content.len().to_string());
        out.push_str(HEADER_SUFFIX);
        out.push('\n');
        out.push_str(&file.content);
        out.push('\n');
        out.push_str(FOOTER);
        out.push('\n');
    }

    out
}

/// Hex SHA-256 of a serialized bundle.
pub fn bundle_digest(bundle: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bundle.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split a header line into filename and declared byte length.
fn parse_header(line: &str) -> Option<(&str, usize)> {
    let inner = line
        .strip_prefix(HEADER_PREFIX)?
        .strip_suffix(HEADER_SUFFIX)?;
    let (filename, len) = inner.rsplit_once(" (")?;
    if filename.is_empty() {
        return None;
    }
    Some((filename, len.parse().ok()?))
}

/// Inverse of [`serialize_bundle`].
pub fn parse_bundle(bundle: &str) -> Result<Vec<SkillFile>, BundleError> {
    let bytes = bundle.as_bytes();
    let mut files = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let line_end = bundle[pos..]
            .find('\n')
            .map(|i| pos + i)
            .ok_or(BundleError::MalformedHeader { offset: pos })?;
        let (filename, len) = parse_header(&bundle[pos..line_end])
            .ok_or(BundleError::MalformedHeader { offset: pos })?;

        let start = line_end + 1;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| BundleError::Truncated {
                filename: filename.to_string(),
                expected: len,
            })?;
        let content = std::str::from_utf8(&bytes[start..end]).map_err(|_| {
            BundleError::InvalidUtf8 {
                filename: filename.to_string(),
            }
        })?;

        let rest = &bundle[end..];
        let after = rest
            .strip_prefix('\n')
            .and_then(|r| r.strip_prefix(FOOTER))
            .and_then(|r| r.strip_prefix('\n'))
            .ok_or_else(|| BundleError::MissingFooter {
                filename: filename.to_string(),
            })?;

        files.push(SkillFile::new(filename, content));
        pos = bytes.len() - after.len();
    }

    Ok(files)
}
