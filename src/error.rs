use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("repository access failed while trying to {operation}: {source}")]
    RepositoryAccess {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to read {path} at commit {commit}: {source}")]
    ContentRead {
        path: String,
        commit: String,
        #[source]
        source: BoxError,
    },

    #[error("diff of {path} is inconsistent with its snapshots: {reason}")]
    Diff { path: String, reason: String },

    #[error(
        "revision {requested} was evicted from the history window before revision {current} could diff {path} against it"
    )]
    HistoryWindowExceeded {
        path: String,
        current: usize,
        requested: usize,
    },

    #[error("revision {requested} has not been processed yet (needed by revision {current})")]
    UnprocessedParent { current: usize, requested: usize },

    #[error(
        "commit {commit} is ordered before all of its parents by author time; rerun with --order topological"
    )]
    ParentOrdering { commit: String },

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ChurnError {
    pub fn repository(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ChurnError::RepositoryAccess {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn content(
        path: impl Into<String>,
        commit: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        ChurnError::ContentRead {
            path: path.into(),
            commit: commit.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChurnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_error_names_the_operation() {
        let err = ChurnError::repository("resolve HEAD", "reference not found");
        assert_eq!(
            err.to_string(),
            "repository access failed while trying to resolve HEAD: reference not found"
        );
    }

    #[test]
    fn window_error_mentions_both_revisions() {
        let err = ChurnError::HistoryWindowExceeded {
            path: "src/lib.rs".into(),
            current: 30,
            requested: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("revision 4"));
        assert!(msg.contains("revision 30"));
        assert!(msg.contains("src/lib.rs"));
    }
}
