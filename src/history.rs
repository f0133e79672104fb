use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::info;

use crate::error::Result;
use crate::model::{CommitInfo, RevisionIndex};
use crate::source::HistorySource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryOrder {
    /// Ascending author time. Commits sharing a timestamp keep parent-first order.
    #[default]
    AuthorTime,
    /// Parents always precede children; ties broken by author time.
    Topological,
}

/// Collects every commit reachable from `head` and orders it oldest first.
///
/// The walk uses an explicit stack and a visited set, and emits each commit
/// only after all of its parents.
pub fn linearize<S>(source: &S, head: &CommitInfo, order: HistoryOrder) -> Result<Vec<CommitInfo>>
where
    S: HistorySource + ?Sized,
{
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<(CommitInfo, bool)> = vec![(head.clone(), false)];
    let mut parents_first = Vec::new();

    while let Some((commit, expanded)) = stack.pop() {
        if expanded {
            parents_first.push(commit);
            continue;
        }
        if !visited.insert(commit.id.clone()) {
            continue;
        }
        let parents = source.parents_of(&commit)?;
        stack.push((commit, true));
        // Reversed so the first parent is walked first.
        for parent in parents.into_iter().rev() {
            if !visited.contains(&parent.id) {
                stack.push((parent, false));
            }
        }
    }
    info!(commits = parents_first.len(), head = %head.id, "linearized history");

    Ok(match order {
        HistoryOrder::AuthorTime => {
            parents_first.sort_by_key(|c| c.time.seconds);
            parents_first
        }
        HistoryOrder::Topological => topological_by_time(parents_first),
    })
}

// Kahn's algorithm; among ready commits the oldest goes first.
fn topological_by_time(commits: Vec<CommitInfo>) -> Vec<CommitInfo> {
    let position: HashMap<&str, usize> = commits
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();
    let mut pending_parents = vec![0usize; commits.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); commits.len()];
    for (i, commit) in commits.iter().enumerate() {
        let mut seen = HashSet::new();
        for parent in &commit.parents {
            if let Some(&p) = position.get(parent.as_str()) {
                if seen.insert(p) {
                    pending_parents[i] += 1;
                    children[p].push(i);
                }
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<(i64, usize)>> = pending_parents
        .iter()
        .enumerate()
        .filter(|(_, pending)| **pending == 0)
        .map(|(i, _)| Reverse((commits[i].time.seconds, i)))
        .collect();
    let mut order = Vec::with_capacity(commits.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        order.push(i);
        for &child in &children[i] {
            pending_parents[child] -= 1;
            if pending_parents[child] == 0 {
                ready.push(Reverse((commits[child].time.seconds, child)));
            }
        }
    }

    let mut slots: Vec<Option<CommitInfo>> = commits.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

pub fn index_map(commits: &[CommitInfo]) -> HashMap<String, RevisionIndex> {
    commits
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChurnError;
    use crate::memory::MemoryRepository;

    fn ids(commits: &[CommitInfo]) -> Vec<&str> {
        commits.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn diamond_is_deduplicated_and_sorted() {
        let mut repo = MemoryRepository::new();
        repo.commit("a", "x@e", 10, &[], [("f", "1")])
            .commit("c", "x@e", 30, &["a"], [("f", "3")])
            .commit("b", "x@e", 20, &["a"], [("f", "2")])
            .commit("m", "x@e", 40, &["b", "c"], [("f", "4")]);
        let head = repo.resolve_head(None).unwrap();
        let commits = linearize(&repo, &head, HistoryOrder::AuthorTime).unwrap();
        assert_eq!(ids(&commits), vec!["a", "b", "c", "m"]);

        let index = index_map(&commits);
        assert_eq!(index["m"], 3);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn equal_timestamps_keep_parents_first() {
        let mut repo = MemoryRepository::new();
        repo.commit("a", "x@e", 5, &[], [("f", "1")])
            .commit("b", "x@e", 5, &["a"], [("f", "2")])
            .commit("c", "x@e", 5, &["b"], [("f", "3")]);
        let head = repo.resolve_head(None).unwrap();
        let commits = linearize(&repo, &head, HistoryOrder::AuthorTime).unwrap();
        assert_eq!(ids(&commits), vec!["a", "b", "c"]);
    }

    #[test]
    fn topological_order_fixes_backdated_commits() {
        let mut repo = MemoryRepository::new();
        repo.commit("a", "x@e", 10, &[], [("f", "1")])
            .commit("b", "x@e", 50, &["a"], [("f", "2")])
            // rebased commit keeps an older author date than its parent
            .commit("c", "x@e", 30, &["b"], [("f", "3")]);
        let head = repo.resolve_head(None).unwrap();

        let by_time = linearize(&repo, &head, HistoryOrder::AuthorTime).unwrap();
        assert_eq!(ids(&by_time), vec!["a", "c", "b"]);

        let topo = linearize(&repo, &head, HistoryOrder::Topological).unwrap();
        assert_eq!(ids(&topo), vec!["a", "b", "c"]);
    }

    #[test]
    fn long_history_does_not_recurse() {
        let mut repo = MemoryRepository::new();
        let ids: Vec<String> = (0..20_000).map(|i| format!("c{i}")).collect();
        for (i, id) in ids.iter().enumerate() {
            let parents: Vec<&str> = if i == 0 { vec![] } else { vec![ids[i - 1].as_str()] };
            repo.commit(id, "x@e", i as i64, &parents, std::iter::empty());
        }
        let head = repo.resolve_head(None).unwrap();
        let commits = linearize(&repo, &head, HistoryOrder::AuthorTime).unwrap();
        assert_eq!(commits.len(), 20_000);
        assert_eq!(commits[0].id, "c0");
    }

    #[test]
    fn parent_lookup_failure_propagates() {
        let mut repo = MemoryRepository::new();
        repo.commit("b", "x@e", 2, &["missing"], [("f", "2")]);
        let head = repo.resolve_head(None).unwrap();
        let err = linearize(&repo, &head, HistoryOrder::AuthorTime).unwrap_err();
        assert!(matches!(err, ChurnError::RepositoryAccess { .. }));
    }
}
