use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ChurnError, Result};
use crate::model::{RevisionIndex, count_lines};

/// One file at one revision: its text and, for every line, the revision
/// that last touched it. `origins.len()` always equals the text's line count.
#[derive(Debug, Clone)]
pub struct FileRevision {
    content: Arc<str>,
    origins: Arc<[RevisionIndex]>,
}

impl FileRevision {
    pub fn introduced(content: Arc<str>, revision: RevisionIndex) -> Self {
        let origins = vec![revision; count_lines(&content)].into();
        Self { content, origins }
    }

    pub fn with_origins(content: Arc<str>, origins: Vec<RevisionIndex>) -> Self {
        debug_assert_eq!(
            origins.len(),
            count_lines(&content),
            "origin table does not match line count"
        );
        Self {
            content,
            origins: origins.into(),
        }
    }

    /// Same text as `self`: the origin table is shared, not copied.
    pub fn unchanged(&self, content: Arc<str>) -> Self {
        Self {
            content,
            origins: Arc::clone(&self.origins),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn origins(&self) -> &[RevisionIndex] {
        &self.origins
    }

    pub fn has_same_content(&self, content: &Arc<str>) -> bool {
        Arc::ptr_eq(&self.content, content) || *self.content == **content
    }
}

/// Line provenance for the revisions still inside the retention window,
/// keyed by revision, then by path.
#[derive(Debug, Default)]
pub struct LineProvenanceGraph {
    revisions: HashMap<RevisionIndex, HashMap<String, FileRevision>>,
    // Revisions are begun in increasing order, so anything below this that
    // is no longer in `revisions` has been evicted.
    next_revision: RevisionIndex,
}

impl LineProvenanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `revision` as processed, even if it ends up holding no files.
    pub fn begin_revision(&mut self, revision: RevisionIndex) {
        self.revisions.entry(revision).or_default();
        self.next_revision = self.next_revision.max(revision + 1);
    }

    pub fn record(&mut self, revision: RevisionIndex, path: String, file: FileRevision) {
        self.revisions
            .entry(revision)
            .or_default()
            .insert(path, file);
    }

    /// The state of `path` at `requested`, for use as the diff base of
    /// `current`. `Ok(None)` means the file did not exist at `requested`.
    pub fn base(
        &self,
        current: RevisionIndex,
        requested: RevisionIndex,
        path: &str,
    ) -> Result<Option<&FileRevision>> {
        match self.revisions.get(&requested) {
            Some(files) => Ok(files.get(path)),
            None if self.is_evicted(requested) => Err(ChurnError::HistoryWindowExceeded {
                path: path.to_string(),
                current,
                requested,
            }),
            None => Err(ChurnError::UnprocessedParent { current, requested }),
        }
    }

    /// Returns how many files were released.
    pub fn evict(&mut self, revision: RevisionIndex) -> usize {
        self.revisions
            .remove(&revision)
            .map(|files| files.len())
            .unwrap_or(0)
    }

    pub fn is_evicted(&self, revision: RevisionIndex) -> bool {
        revision < self.next_revision && !self.revisions.contains_key(&revision)
    }

    pub fn retained_revisions(&self) -> usize {
        self.revisions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn introduced_file_attributes_every_line() {
        let file = FileRevision::introduced("a\nb\nc".into(), 7);
        assert_eq!(file.origins(), &[7, 7, 7]);
        let empty = FileRevision::introduced("".into(), 7);
        assert!(empty.origins().is_empty());
    }

    #[test]
    fn unchanged_file_shares_origins() {
        let file = FileRevision::with_origins("a\nb\n".into(), vec![0, 1]);
        let next = file.unchanged("a\nb\n".into());
        assert!(Arc::ptr_eq(&file.origins, &next.origins));
        assert!(file.has_same_content(&Arc::from("a\nb\n")));
        assert!(!file.has_same_content(&Arc::from("a\n")));
    }

    #[test]
    fn base_distinguishes_absent_evicted_and_unprocessed() {
        let mut graph = LineProvenanceGraph::new();
        graph.begin_revision(0);
        graph.record(0, "f".into(), FileRevision::introduced("x\n".into(), 0));

        assert!(graph.base(1, 0, "f").unwrap().is_some());
        assert!(graph.base(1, 0, "missing").unwrap().is_none());
        assert!(matches!(
            graph.base(1, 3, "f"),
            Err(ChurnError::UnprocessedParent {
                current: 1,
                requested: 3
            })
        ));

        assert_eq!(graph.evict(0), 1);
        assert!(graph.is_evicted(0));
        assert_eq!(graph.retained_revisions(), 0);
        assert!(matches!(
            graph.base(21, 0, "f"),
            Err(ChurnError::HistoryWindowExceeded { requested: 0, .. })
        ));
    }

    #[test]
    fn empty_revision_still_counts_as_processed() {
        let mut graph = LineProvenanceGraph::new();
        graph.begin_revision(2);
        assert!(graph.base(3, 2, "f").unwrap().is_none());
        assert!(!graph.is_evicted(2));
    }

    #[test]
    fn eviction_is_derived_from_processed_revisions() {
        let mut graph = LineProvenanceGraph::new();
        for i in 0..1000 {
            graph.begin_revision(i);
            graph.record(i, "f".into(), FileRevision::introduced("x\n".into(), i));
            if i >= 20 {
                graph.evict(i - 20);
            }
        }
        assert_eq!(graph.retained_revisions(), 20);
        assert!(graph.is_evicted(0));
        assert!(graph.is_evicted(979));
        assert!(!graph.is_evicted(980));
        assert!(!graph.is_evicted(1000));
        assert!(matches!(
            graph.base(1000, 1000, "f"),
            Err(ChurnError::UnprocessedParent { .. })
        ));
    }
}
