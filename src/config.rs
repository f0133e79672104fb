use std::path::PathBuf;

use crate::diff::DiffAlgorithm;
use crate::evictor::RetentionMode;
use crate::history::HistoryOrder;
use crate::merge::MergePolicyKind;

pub const DEFAULT_RETENTION_WINDOW: usize = 20;
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoLocation {
    Local(PathBuf),
    Remote(String),
}

impl RepoLocation {
    pub fn parse(location: &str) -> Self {
        let looks_remote = location.contains("://")
            || (location.starts_with("git@") && location.contains(':'));
        if looks_remote {
            RepoLocation::Remote(location.to_string())
        } else {
            RepoLocation::Local(PathBuf::from(location))
        }
    }
}

impl Default for RepoLocation {
    fn default() -> Self {
        RepoLocation::Local(PathBuf::from("."))
    }
}

/// Restricts processing to one file, or to everything below a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter(String);

impl PathFilter {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim_start_matches("./").trim_end_matches('/');
        Self(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.0.is_empty() {
            return true;
        }
        match path.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    JsonArray,
    JsonLines,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::JsonArray => "json",
            OutputFormat::JsonLines => "jsonl",
        }
    }
}

/// Everything a run needs, built once and passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChurnConfig {
    pub repository: RepoLocation,
    pub head: Option<String>,
    pub path_filter: Option<PathFilter>,
    pub stop_at: Option<String>,
    pub retention_window: usize,
    pub retention: RetentionMode,
    pub merge_policy: MergePolicyKind,
    pub diff_algorithm: DiffAlgorithm,
    pub order: HistoryOrder,
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            repository: RepoLocation::default(),
            head: None,
            path_filter: None,
            stop_at: None,
            retention_window: DEFAULT_RETENTION_WINDOW,
            retention: RetentionMode::default(),
            merge_policy: MergePolicyKind::default(),
            diff_algorithm: DiffAlgorithm::default(),
            order: HistoryOrder::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_format: OutputFormat::default(),
        }
    }
}

impl ChurnConfig {
    /// True when `commit_id` is the configured stop commit. Abbreviated
    /// hashes of at least four characters are accepted.
    pub fn is_stop_commit(&self, commit_id: &str) -> bool {
        match self.stop_at.as_deref() {
            Some(stop) if stop.len() >= 4 => commit_id.starts_with(&stop.to_ascii_lowercase()),
            Some(stop) => commit_id == stop,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_locations_are_recognized() {
        assert_eq!(
            RepoLocation::parse("https://github.com/a/b"),
            RepoLocation::Remote("https://github.com/a/b".into())
        );
        assert_eq!(
            RepoLocation::parse("git@github.com:a/b.git"),
            RepoLocation::Remote("git@github.com:a/b.git".into())
        );
        assert_eq!(
            RepoLocation::parse("../repo"),
            RepoLocation::Local(PathBuf::from("../repo"))
        );
    }

    #[test]
    fn path_filter_matches_files_and_directories() {
        let file = PathFilter::new("src/lib.rs");
        assert!(file.matches("src/lib.rs"));
        assert!(!file.matches("src/lib.rs.bak"));

        let dir = PathFilter::new("./src/");
        assert!(dir.matches("src/lib.rs"));
        assert!(dir.matches("src/a/b.rs"));
        assert!(!dir.matches("srcs/lib.rs"));
        assert!(!dir.matches("README.md"));
    }

    #[test]
    fn stop_commit_accepts_prefixes() {
        let config = ChurnConfig {
            stop_at: Some("ABCD12".into()),
            ..Default::default()
        };
        assert!(config.is_stop_commit("abcd1234ffff"));
        assert!(!config.is_stop_commit("abce1234ffff"));

        let short = ChurnConfig {
            stop_at: Some("ab".into()),
            ..Default::default()
        };
        assert!(!short.is_stop_commit("abcd"));
        assert!(!ChurnConfig::default().is_stop_commit("abcd"));
    }
}
