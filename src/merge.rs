use std::collections::HashMap;

use tracing::debug;

use crate::error::{ChurnError, Result};
use crate::model::{CommitInfo, RevisionIndex};

pub const PULL_REQUEST_MARKER: &str = "Merge pull request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffBase {
    pub revision: RevisionIndex,
    /// The commit has more than one parent. Lines it inserts relative to the
    /// base are credited to the base commit instead of the merge.
    pub merge: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ParentCandidate<'a> {
    pub revision: RevisionIndex,
    pub message: &'a str,
}

/// Chooses which parent of a merge commit to diff against.
pub trait MergeParentPolicy: Send + Sync {
    /// `candidates` is non-empty and in the commit's parent order.
    fn select(&self, candidates: &[ParentCandidate<'_>]) -> RevisionIndex;
}

/// Smallest revision index among parents whose message lacks the marker,
/// falling back to the smallest marked parent.
#[derive(Debug, Clone)]
pub struct NearestUnmarked {
    marker: String,
}

impl NearestUnmarked {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for NearestUnmarked {
    fn default() -> Self {
        Self::new(PULL_REQUEST_MARKER)
    }
}

impl MergeParentPolicy for NearestUnmarked {
    fn select(&self, candidates: &[ParentCandidate<'_>]) -> RevisionIndex {
        let unmarked = candidates
            .iter()
            .filter(|c| !c.message.contains(self.marker.as_str()))
            .map(|c| c.revision)
            .min();
        unmarked
            .or_else(|| candidates.iter().map(|c| c.revision).min())
            .unwrap_or_default()
    }
}

/// Starts from the first parent and moves to every later parent whose
/// message lacks the marker, so the last unmarked parent wins regardless of
/// its index.
#[derive(Debug, Clone)]
pub struct LastUnmarked {
    marker: String,
}

impl LastUnmarked {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for LastUnmarked {
    fn default() -> Self {
        Self::new(PULL_REQUEST_MARKER)
    }
}

impl MergeParentPolicy for LastUnmarked {
    fn select(&self, candidates: &[ParentCandidate<'_>]) -> RevisionIndex {
        candidates
            .iter()
            .skip(1)
            .rev()
            .find(|c| !c.message.contains(self.marker.as_str()))
            .or(candidates.first())
            .map(|c| c.revision)
            .unwrap_or_default()
    }
}

/// Always the first listed parent, git's mainline convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstParent;

impl MergeParentPolicy for FirstParent {
    fn select(&self, candidates: &[ParentCandidate<'_>]) -> RevisionIndex {
        candidates.first().map(|c| c.revision).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicyKind {
    #[default]
    NearestUnmarked,
    LastUnmarked,
    FirstParent,
}

impl MergePolicyKind {
    pub fn build(&self) -> Box<dyn MergeParentPolicy> {
        match self {
            MergePolicyKind::NearestUnmarked => Box::new(NearestUnmarked::default()),
            MergePolicyKind::LastUnmarked => Box::new(LastUnmarked::default()),
            MergePolicyKind::FirstParent => Box::new(FirstParent),
        }
    }
}

/// Resolves the diff base of every commit up front, so retention can be
/// sized from the lookbacks that will actually happen. Root commits get
/// `None`.
pub fn plan_diff_bases(
    commits: &[CommitInfo],
    index: &HashMap<String, RevisionIndex>,
    policy: &dyn MergeParentPolicy,
) -> Result<Vec<Option<DiffBase>>> {
    let mut plan = Vec::with_capacity(commits.len());
    for (current, commit) in commits.iter().enumerate() {
        if commit.parents.is_empty() {
            plan.push(None);
            continue;
        }
        let mut candidates = Vec::with_capacity(commit.parents.len());
        for parent in &commit.parents {
            let revision = *index.get(parent).ok_or_else(|| {
                ChurnError::repository(
                    format!("locate parent {parent} of {}", commit.id),
                    "parent is missing from the linearized history",
                )
            })?;
            // Parents sorted after their child cannot serve as a base yet.
            if revision < current {
                candidates.push(ParentCandidate {
                    revision,
                    message: &commits[revision].message,
                });
            }
        }
        if candidates.is_empty() {
            return Err(ChurnError::ParentOrdering {
                commit: commit.id.clone(),
            });
        }
        let merge = commit.parents.len() > 1;
        let revision = if merge {
            policy.select(&candidates)
        } else {
            candidates[0].revision
        };
        if merge {
            debug!(commit = %commit.id, current, base = revision, "resolved merge base");
        }
        plan.push(Some(DiffBase { revision, merge }));
    }
    Ok(plan)
}
