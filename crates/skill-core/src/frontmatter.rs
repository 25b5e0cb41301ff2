//! Frontmatter extraction for manifest files.
//!
//! The block is read as YAML and its top-level scalar values become strings.
//! Nested mappings and lists are not carried. A block that is not valid YAML
//! (for example `description: a: b`) is read line by line as flat
//! `key: value` pairs instead.

use serde_yaml::{Mapping, Value};

use crate::types::FrontmatterMap;

/// Fields every manifest must carry, in the order they are reported.
pub const REQUIRED_FIELDS: &[&str] = &["name", "description"];

/// Return the raw frontmatter block of `content`, if any.
///
/// The manifest must open with a `---` line; the block runs up to the next
/// line starting with `---` and must not be empty.
fn frontmatter_block(content: &str) -> Option<&str> {
    let after_open = content.strip_prefix("---")?;
    let body = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))?;

    // The block holds at least one character before the closing delimiter.
    let first = body.chars().next()?.len_utf8();
    let close = body[first..].find("\n---")? + first;
    let block = &body[..close];
    Some(block.strip_suffix('\r').unwrap_or(block))
}

/// Parse the frontmatter of a manifest into a key/value map.
///
/// A manifest without frontmatter yields an empty map. Values are trimmed and
/// a null value becomes the empty string.
pub fn parse_frontmatter(content: &str) -> FrontmatterMap {
    let Some(block) = frontmatter_block(content) else {
        return FrontmatterMap::new();
    };

    match serde_yaml::from_str::<Mapping>(block) {
        Ok(mapping) => from_mapping(mapping),
        Err(_) => scan_lines(block),
    }
}

fn from_mapping(mapping: Mapping) -> FrontmatterMap {
    let mut meta = FrontmatterMap::new();
    for (key, value) in mapping {
        let Some(key) = scalar_string(key) else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        if let Some(value) = scalar_string(value) {
            meta.insert(key.to_string(), value.trim().to_string());
        }
    }
    meta
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s),
        Value::Tagged(tagged) => scalar_string(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Flat `key: value` reading of a block that is not valid YAML.
///
/// Lines without a colon or with an empty key are skipped; a repeated key
/// keeps its last value.
fn scan_lines(block: &str) -> FrontmatterMap {
    let mut meta = FrontmatterMap::new();
    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        meta.insert(key.to_string(), value.trim().to_string());
    }

    meta
}

/// Required fields that are absent or empty in `meta`.
pub fn missing_required_fields(meta: &FrontmatterMap) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| meta.get(**field).map_or(true, String::is_empty))
        .map(|field| (*field).to_string())
        .collect()
}
