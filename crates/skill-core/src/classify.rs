//! Tree classification: manifest detection, collection discovery and
//! candidate file selection.
//!
//! These are pure functions over a tree listing. Fetching lives in `skilld`.

use crate::config::ResolverConfig;
use crate::types::{CandidateFile, SkillListing, TreeEntry};
use std::collections::HashSet;

/// True if `path` ends with a blocklisted extension (case-insensitive).
pub fn is_binary_path(path: &str, config: &ResolverConfig) -> bool {
    let lower = path.to_lowercase();
    config
        .binary_extensions
        .iter()
        .any(|ext| lower.ends_with(ext.as_str()))
}

/// True if `path` lives under one of the excluded root directories.
pub fn is_excluded_root_path(path: &str, config: &ResolverConfig) -> bool {
    config.excluded_root_dirs.iter().any(|dir| {
        path.strip_prefix(dir.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Path of `path` relative to `base`, or `None` if it lies outside it.
///
/// An empty base is the repository root and contains everything.
pub fn relative_to_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base.is_empty() {
        return Some(path);
    }
    path.strip_prefix(base)?.strip_prefix('/')
}

/// Join a base directory and a child name.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

/// Manifest filename present at the repository root, in preference order.
pub fn find_root_manifest<'a>(entries: &[TreeEntry], config: &'a ResolverConfig) -> Option<&'a str> {
    config
        .manifest_names
        .iter()
        .find(|name| entries.iter().any(|e| e.is_blob() && e.path == **name))
        .map(String::as_str)
}

/// Distinct immediate child directories of `root`, in first-seen order.
fn child_dirs<'a>(entries: &'a [TreeEntry], root: &str) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|e| e.is_tree())
        .filter_map(|e| relative_to_base(&e.path, root))
        .filter_map(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .collect()
}

fn listings(entries: &[TreeEntry], root: &str) -> Vec<SkillListing> {
    child_dirs(entries, root)
        .into_iter()
        .map(|name| SkillListing {
            name: name.to_string(),
            path: join_path(root, name),
            category: root.to_string(),
        })
        .collect()
}

/// Skill offerings of a repository without a root manifest.
///
/// The skills collection wins outright when it has any child directories;
/// otherwise every other collection root is probed and the results merged.
pub fn find_collections(entries: &[TreeEntry], config: &ResolverConfig) -> Vec<SkillListing> {
    let skills = listings(entries, &config.skills_collection_dir);
    if !skills.is_empty() {
        return skills;
    }

    config
        .collection_dirs
        .iter()
        .flat_map(|root| listings(entries, root))
        .collect()
}

/// Candidate supporting files for a skill rooted at `base`.
///
/// `manifest` is the manifest filename already fetched for that skill; it is
/// excluded here for non-root skills and deduplicated later for root skills.
pub fn skill_candidates(
    entries: &[TreeEntry],
    base: &str,
    manifest: &str,
    config: &ResolverConfig,
) -> Vec<CandidateFile> {
    entries
        .iter()
        .filter(|e| e.is_blob())
        .filter_map(|e| {
            let relative = relative_to_base(&e.path, base)?;
            if base.is_empty() {
                if is_excluded_root_path(&e.path, config) {
                    return None;
                }
            } else if relative == manifest {
                return None;
            }
            Some(CandidateFile {
                path: e.path.clone(),
                relative: relative.to_string(),
                is_binary: is_binary_path(&e.path, config),
            })
        })
        .filter(|c| !c.is_binary)
        .collect()
}

/// Candidate files for merge-all mode: every non-binary blob under the
/// skills collection, named relative to it.
pub fn merge_candidates(entries: &[TreeEntry], config: &ResolverConfig) -> Vec<CandidateFile> {
    skill_candidates(entries, &config.skills_collection_dir, "", config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolverConfig {
        ResolverConfig::default()
    }

    fn relatives(candidates: &[CandidateFile]) -> Vec<&str> {
        candidates.iter().map(|c| c.relative.as_str()).collect()
    }

    #[test]
    fn binary_detection_is_case_insensitive() {
        let config = config();
        assert!(is_binary_path("assets/logo.PNG", &config));
        assert!(is_binary_path("fonts/a.woff2", &config));
        assert!(is_binary_path("release.tar.gz", &config));
        assert!(!is_binary_path("notes.md", &config));
        assert!(!is_binary_path("pngs.txt", &config));
    }

    #[test]
    fn excluded_root_requires_directory_boundary() {
        let config = config();
        assert!(is_excluded_root_path(".github/workflows/ci.yml", &config));
        assert!(is_excluded_root_path("skills/alpha/SKILL.md", &config));
        assert!(!is_excluded_root_path("skills.md", &config));
        assert!(!is_excluded_root_path("builder/notes.md", &config));
        assert!(!is_excluded_root_path("docs/build/x.md", &config));
    }

    #[test]
    fn relative_to_base_respects_boundaries() {
        assert_eq!(relative_to_base("a/b.md", ""), Some("a/b.md"));
        assert_eq!(relative_to_base("skills/pdf/x.md", "skills/pdf"), Some("x.md"));
        assert_eq!(relative_to_base("skills/pdfx/x.md", "skills/pdf"), None);
        assert_eq!(relative_to_base("skills/pdf", "skills/pdf"), None);
    }

    #[test]
    fn root_manifest_prefers_skill_md() {
        let config = config();
        let entries = vec![TreeEntry::blob("README.md"), TreeEntry::blob("SKILL.md")];
        assert_eq!(find_root_manifest(&entries, &config), Some("SKILL.md"));

        let entries = vec![TreeEntry::blob("README.md"), TreeEntry::blob("src/SKILL.md")];
        assert_eq!(find_root_manifest(&entries, &config), Some("README.md"));

        let entries = vec![TreeEntry::tree("SKILL.md")];
        assert_eq!(find_root_manifest(&entries, &config), None);
    }

    #[test]
    fn skills_collection_lists_immediate_children() {
        let config = config();
        let entries = vec![
            TreeEntry::tree("skills"),
            TreeEntry::tree("skills/alpha"),
            TreeEntry::tree("skills/alpha/scripts"),
            TreeEntry::blob("skills/alpha/SKILL.md"),
            TreeEntry::tree("skills/beta"),
            TreeEntry::tree("rules/ignored"),
        ];
        let found = find_collections(&entries, &config);
        assert_eq!(
            found,
            vec![
                SkillListing {
                    name: "alpha".to_string(),
                    path: "skills/alpha".to_string(),
                    category: "skills".to_string(),
                },
                SkillListing {
                    name: "beta".to_string(),
                    path: "skills/beta".to_string(),
                    category: "skills".to_string(),
                },
            ]
        );
    }

    #[test]
    fn other_collections_are_merged_with_category() {
        let config = config();
        let entries = vec![
            TreeEntry::tree("rules"),
            TreeEntry::tree("rules/rust"),
            TreeEntry::tree("workflows/release"),
            TreeEntry::tree("workflows/release/steps"),
            TreeEntry::blob("references/only-a-file.md"),
        ];
        let found = find_collections(&entries, &config);
        let pairs: Vec<(&str, &str)> = found
            .iter()
            .map(|s| (s.path.as_str(), s.category.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("rules/rust", "rules"), ("workflows/release", "workflows")]
        );
    }

    #[test]
    fn no_collections_when_nothing_matches() {
        let config = config();
        let entries = vec![TreeEntry::tree("src"), TreeEntry::blob("src/main.rs")];
        assert!(find_collections(&entries, &config).is_empty());
    }

    #[test]
    fn root_candidates_skip_excluded_dirs_and_binaries() {
        let config = config();
        let entries = vec![
            TreeEntry::blob("SKILL.md"),
            TreeEntry::blob("guide.md"),
            TreeEntry::blob("logo.png"),
            TreeEntry::blob(".github/workflows/ci.yml"),
            TreeEntry::blob("node_modules/x/index.js"),
            TreeEntry::blob("skills/alpha/SKILL.md"),
            TreeEntry::tree("scripts"),
            TreeEntry::blob("scripts/run.sh"),
        ];
        let candidates = skill_candidates(&entries, "", "SKILL.md", &config);
        assert_eq!(
            relatives(&candidates),
            vec!["SKILL.md", "guide.md", "scripts/run.sh"]
        );
    }

    #[test]
    fn nested_candidates_are_relative_and_skip_manifest() {
        let config = config();
        let entries = vec![
            TreeEntry::blob("skills/pdf/SKILL.md"),
            TreeEntry::blob("skills/pdf/reference.md"),
            TreeEntry::blob("skills/pdf/scripts/extract.py"),
            TreeEntry::blob("skills/pdf/sample.pdf"),
            TreeEntry::blob("skills/pdfx/other.md"),
            TreeEntry::blob("README.md"),
        ];
        let candidates = skill_candidates(&entries, "skills/pdf", "SKILL.md", &config);
        assert_eq!(
            relatives(&candidates),
            vec!["reference.md", "scripts/extract.py"]
        );
        assert_eq!(candidates[1].path, "skills/pdf/scripts/extract.py");
        assert!(candidates.iter().all(|c| !c.is_binary));
    }

    #[test]
    fn merge_candidates_strip_collection_prefix() {
        let config = config();
        let entries = vec![
            TreeEntry::tree("skills/alpha"),
            TreeEntry::blob("skills/alpha/SKILL.md"),
            TreeEntry::blob("skills/beta/SKILL.md"),
            TreeEntry::blob("skills/beta/diagram.png"),
            TreeEntry::blob("README.md"),
        ];
        let candidates = merge_candidates(&entries, &config);
        assert_eq!(
            relatives(&candidates),
            vec!["alpha/SKILL.md", "beta/SKILL.md"]
        );
    }

    #[test]
    fn candidates_never_include_blocklisted_paths() {
        let config = config();
        let entries: Vec<TreeEntry> = config
            .binary_extensions
            .iter()
            .map(|ext| TreeEntry::blob(format!("skills/x/file{}", ext.to_uppercase())))
            .chain(std::iter::once(TreeEntry::blob("skills/x/keep.md")))
            .collect();
        for candidates in [
            skill_candidates(&entries, "skills/x", "SKILL.md", &config),
            merge_candidates(&entries, &config),
        ] {
            assert_eq!(candidates.len(), 1);
            assert!(candidates.iter().all(|c| !is_binary_path(&c.path, &config)));
        }
    }
}
