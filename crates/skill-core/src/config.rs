//! Configuration for the skill resolver.
//!
//! Plain `key=value` file format; list values are space-separated.
//! Precedence: CLI flags > `--config` file > `~/.config/skilld/config` > defaults.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid config line: {0}")]
    InvalidLine(String),
    #[error("invalid integer value for {key}: {value}")]
    InvalidInt { key: String, value: String },
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Resolver settings and classification tables.
///
/// The list fields are the named tables consulted during classification;
/// extending them changes behavior without touching control flow.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    // Hosts
    pub github_api_base: String,
    pub github_raw_base: String,
    pub user_agent: String,

    /// Per-call timeout for every outbound request.
    pub request_timeout_sec: u64,

    // Volume bounds
    /// Maximum supporting files fetched for one skill.
    pub max_skill_files: usize,
    /// Maximum files fetched in merge-all mode.
    pub max_merged_files: usize,
    /// Maximum directory depth the fallback walker descends.
    pub max_walk_depth: usize,

    // Branch probing
    /// Branches probed, in order, when repository metadata is unavailable.
    pub probe_branches: Vec<String>,

    // Classification tables
    /// Lowercase file suffixes treated as binary and never fetched.
    pub binary_extensions: Vec<String>,
    /// Root-level directories skipped when the skill is the whole repository.
    pub excluded_root_dirs: Vec<String>,
    /// Directory whose children are individual skills.
    pub skills_collection_dir: String,
    /// Other collection roots probed when no skills directory exists.
    pub collection_dirs: Vec<String>,
    /// Manifest filenames in order of preference.
    pub manifest_names: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            github_api_base: "https://api.github.com".to_string(),
            github_raw_base: "https://raw.githubusercontent.com".to_string(),
            user_agent: "skilld".to_string(),
            request_timeout_sec: 15,
            max_skill_files: 50,
            max_merged_files: 100,
            max_walk_depth: 8,
            probe_branches: strings(&["main", "master"]),
            binary_extensions: strings(&[
                ".zip", ".jar", ".tar", ".gz", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico",
                ".pdf", ".exe", ".bin", ".woff", ".woff2", ".ttf", ".eot",
            ]),
            excluded_root_dirs: strings(&[
                ".github",
                "packages",
                "node_modules",
                "dist",
                "build",
                "skills",
            ]),
            skills_collection_dir: "skills".to_string(),
            collection_dirs: strings(&["rules", "workflows", "scripts", "references"]),
            manifest_names: strings(&["SKILL.md", "README.md"]),
        }
    }
}

impl ResolverConfig {
    /// Load config from a file, merging with defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.load_file(path)?;
        Ok(config)
    }

    /// Load and merge values from a config file.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.parse_content(&content)
    }

    /// Parse config content (key=value format).
    pub fn parse_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine(line.to_string()));
            };

            let key = key.trim();
            let value = Self::unquote(value.trim());

            self.apply_value(key, &value)?;
        }
        self.check()
    }

    /// The primary manifest filename (`SKILL.md` by default).
    pub fn primary_manifest(&self) -> &str {
        self.manifest_names
            .first()
            .map_or("SKILL.md", String::as_str)
    }

    /// Remove surrounding quotes from a value.
    fn unquote(value: &str) -> String {
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            return value[1..value.len() - 1].to_string();
        }
        value.to_string()
    }

    fn apply_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "github_api_base" => self.github_api_base = value.trim_end_matches('/').to_string(),
            "github_raw_base" => self.github_raw_base = value.trim_end_matches('/').to_string(),
            "user_agent" => self.user_agent = value.to_string(),
            "request_timeout_sec" => self.request_timeout_sec = Self::parse_int(key, value)?,
            "max_skill_files" => self.max_skill_files = Self::parse_int(key, value)?,
            "max_merged_files" => self.max_merged_files = Self::parse_int(key, value)?,
            "max_walk_depth" => self.max_walk_depth = Self::parse_int(key, value)?,
            "probe_branches" => self.probe_branches = Self::parse_list(value),
            "binary_extensions" => {
                self.binary_extensions = Self::parse_list(value)
                    .into_iter()
                    .map(|ext| {
                        let ext = ext.to_lowercase();
                        if ext.starts_with('.') {
                            ext
                        } else {
                            format!(".{ext}")
                        }
                    })
                    .collect();
            }
            "excluded_root_dirs" => {
                self.excluded_root_dirs = Self::parse_list(value)
                    .into_iter()
                    .map(|dir| dir.trim_end_matches('/').to_string())
                    .collect();
            }
            "skills_collection_dir" => {
                self.skills_collection_dir = value.trim_matches('/').to_string();
            }
            "collection_dirs" => {
                self.collection_dirs = Self::parse_list(value)
                    .into_iter()
                    .map(|dir| dir.trim_matches('/').to_string())
                    .collect();
            }
            "manifest_names" => self.manifest_names = Self::parse_list(value),
            _ => {
                // Warn but don't fail for unknown keys.
                eprintln!("Warning: unknown config key: {key}");
            }
        }
        Ok(())
    }

    fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
        value.parse().map_err(|_| ConfigError::InvalidInt {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Space-separated list.
    fn parse_list(value: &str) -> Vec<String> {
        value.split_whitespace().map(String::from).collect()
    }

    /// Reject combinations the resolver cannot work with.
    fn check(&self) -> Result<(), ConfigError> {
        if self.manifest_names.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "manifest_names".to_string(),
                reason: "at least one manifest name is required".to_string(),
            });
        }
        if self.skills_collection_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "skills_collection_dir".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_sec == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_sec".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
