use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::PathFilter;
use crate::error::{ChurnError, Result};
use crate::model::{Author, CommitInfo, CommitTime, FileSnapshot};
use crate::source::HistorySource;

/// A commit history held entirely in memory. Each commit stores its full
/// tree as a path -> content map. The most recently added commit is HEAD
/// unless `set_head` says otherwise.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    commits: HashMap<String, CommitInfo>,
    trees: HashMap<String, BTreeMap<String, Arc<str>>>,
    head: Option<String>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_commit<P, C>(
        &mut self,
        commit: CommitInfo,
        files: impl IntoIterator<Item = (P, C)>,
    ) -> &mut Self
    where
        P: Into<String>,
        C: Into<Arc<str>>,
    {
        let tree = files
            .into_iter()
            .map(|(path, content)| (path.into(), content.into()))
            .collect();
        self.head = Some(commit.id.clone());
        self.trees.insert(commit.id.clone(), tree);
        self.commits.insert(commit.id.clone(), commit);
        self
    }

    /// Shorthand for tests and examples: a commit authored at `seconds` UTC.
    pub fn commit<'a>(
        &mut self,
        id: &str,
        email: &str,
        seconds: i64,
        parents: &[&str],
        files: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> &mut Self {
        let name = email.split('@').next().unwrap_or(email);
        let info = CommitInfo {
            id: id.to_string(),
            author: Author::new(name, email),
            time: CommitTime::new(seconds, 0),
            message: format!("commit {id}"),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        };
        self.add_commit(info, files)
    }

    pub fn set_message(&mut self, id: &str, message: &str) -> &mut Self {
        if let Some(commit) = self.commits.get_mut(id) {
            commit.message = message.to_string();
        }
        self
    }

    pub fn set_head(&mut self, id: &str) -> &mut Self {
        self.head = Some(id.to_string());
        self
    }

    fn find(&self, id: &str) -> Result<CommitInfo> {
        self.commits
            .get(id)
            .cloned()
            .ok_or_else(|| ChurnError::repository(format!("find commit {id}"), "no such commit"))
    }
}

impl HistorySource for MemoryRepository {
    fn resolve_head(&self, rev: Option<&str>) -> Result<CommitInfo> {
        match rev.or(self.head.as_deref()) {
            Some(id) => self.find(id),
            None => Err(ChurnError::repository("resolve HEAD", "repository is empty")),
        }
    }

    fn parents_of(&self, commit: &CommitInfo) -> Result<Vec<CommitInfo>> {
        commit.parents.iter().map(|id| self.find(id)).collect()
    }

    fn files_of(
        &mut self,
        commit: &CommitInfo,
        filter: Option<&PathFilter>,
    ) -> Result<Vec<FileSnapshot>> {
        let tree = self.trees.get(&commit.id).ok_or_else(|| {
            ChurnError::repository(format!("read tree of {}", commit.id), "no such commit")
        })?;
        Ok(tree
            .iter()
            .filter(|(path, _)| filter.is_none_or(|f| f.matches(path)))
            .map(|(path, content)| FileSnapshot::new(path.clone(), content.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_defaults_to_last_added_commit() {
        let mut repo = MemoryRepository::new();
        repo.commit("a", "x@example.com", 1, &[], [("f", "1\n")])
            .commit("b", "x@example.com", 2, &["a"], [("f", "2\n")]);
        assert_eq!(repo.resolve_head(None).unwrap().id, "b");
        assert_eq!(repo.resolve_head(Some("a")).unwrap().id, "a");
        repo.set_head("a");
        assert_eq!(repo.resolve_head(None).unwrap().id, "a");
    }

    #[test]
    fn files_are_sorted_and_filtered() {
        let mut repo = MemoryRepository::new();
        repo.commit(
            "a",
            "x@example.com",
            1,
            &[],
            [("src/b.rs", "b"), ("README", "r"), ("src/a.rs", "a")],
        );
        let head = repo.resolve_head(None).unwrap();
        let all: Vec<_> = repo
            .files_of(&head, None)
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(all, vec!["README", "src/a.rs", "src/b.rs"]);

        let filter = PathFilter::new("src");
        let filtered = repo.files_of(&head, Some(&filter)).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn missing_parent_is_a_repository_error() {
        let mut repo = MemoryRepository::new();
        repo.commit("b", "x@example.com", 2, &["ghost"], [("f", "2\n")]);
        let head = repo.resolve_head(None).unwrap();
        let err = repo.parents_of(&head).unwrap_err();
        assert!(matches!(err, ChurnError::RepositoryAccess { .. }));
    }
}
