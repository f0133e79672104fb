use crate::config::PathFilter;
use crate::error::Result;
use crate::model::{CommitInfo, FileSnapshot};

/// Read access to a commit history. Implemented over gix for real
/// repositories and in memory for tests.
pub trait HistorySource {
    /// Resolves `rev` (HEAD when `None`) to a commit.
    fn resolve_head(&self, rev: Option<&str>) -> Result<CommitInfo>;

    fn parents_of(&self, commit: &CommitInfo) -> Result<Vec<CommitInfo>>;

    /// Every text file in `commit`'s tree accepted by `filter`, sorted by path.
    fn files_of(
        &mut self,
        commit: &CommitInfo,
        filter: Option<&PathFilter>,
    ) -> Result<Vec<FileSnapshot>>;
}
