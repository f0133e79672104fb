use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type RevisionIndex = usize;

// 1-indexed, in the parent snapshot
pub type LineNumber = u32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Two authors are the same person when their emails match.
    pub fn same_identity(&self, other: &Author) -> bool {
        self.email == other.email
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitTime {
    pub seconds: i64,
    /// Seconds east of UTC.
    pub offset: i32,
}

impl CommitTime {
    pub fn new(seconds: i64, offset: i32) -> Self {
        Self { seconds, offset }
    }

    // Falls back to UTC when the recorded offset is out of range.
    pub fn to_date_string(&self) -> String {
        let Some(utc) = DateTime::from_timestamp(self.seconds, 0) else {
            return self.seconds.to_string();
        };
        let offset = FixedOffset::east_opt(self.offset)
            .unwrap_or_else(|| utc.fixed_offset().timezone());
        utc.with_timezone(&offset)
            .format("%Y-%m-%d %H:%M:%S %z")
            .to_string()
    }
}

/// A commit as seen by the churn analysis. Ids are lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub author: Author,
    pub time: CommitTime,
    pub message: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FileSnapshot {
    pub path: String,
    pub content: Arc<str>,
}

impl FileSnapshot {
    pub fn new(path: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Counts `\n`-terminated lines plus a trailing unterminated one.
pub fn count_lines(text: &str) -> usize {
    text.split_inclusive('\n').count()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChurnFile {
    pub file_name: String,
    pub self_churn: Vec<LineNumber>,
    pub interactive_churn: BTreeMap<String, Vec<LineNumber>>,
}

impl ChurnFile {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.self_churn.is_empty() && self.interactive_churn.is_empty()
    }

    pub fn churned_lines(&self) -> usize {
        self.self_churn.len() + self.interactive_churn.values().map(Vec::len).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnRecord {
    #[serde(rename = "CommitID")]
    pub commit_id: String,
    #[serde(rename = "CommitAuthor")]
    pub commit_author: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "CommitMessage")]
    pub commit_message: String,
    #[serde(rename = "ChurnFiles")]
    pub churn_files: Vec<ChurnFile>,
}

impl ChurnRecord {
    pub fn new(commit: &CommitInfo, churn_files: Vec<ChurnFile>) -> Self {
        Self {
            commit_id: commit.id.clone(),
            commit_author: commit.author.email.clone(),
            date: commit.time.to_date_string(),
            commit_message: commit.message.clone(),
            churn_files,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameSummary {
    pub path: Option<String>,
    pub head: String,
    pub records: Vec<ChurnRecord>,
}
