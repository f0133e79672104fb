use std::collections::BTreeMap;

use tracing::debug;

use crate::merge::DiffBase;
use crate::model::RevisionIndex;
use crate::provenance::LineProvenanceGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionMode {
    /// Keep a revision past the window while a later commit still diffs
    /// against it.
    #[default]
    Adaptive,
    /// Evict strictly `window` revisions later; a diff against an evicted
    /// revision fails with `HistoryWindowExceeded`.
    Fixed,
}

/// Frees provenance data for revisions that no pending commit needs.
#[derive(Debug)]
pub struct HistoryWindowEvictor {
    window: usize,
    mode: RetentionMode,
    last_use: Vec<RevisionIndex>,
    // retire_at -> revisions retiring then
    schedule: BTreeMap<RevisionIndex, Vec<RevisionIndex>>,
}

impl HistoryWindowEvictor {
    pub fn new(window: usize, mode: RetentionMode, plan: &[Option<DiffBase>]) -> Self {
        let mut last_use: Vec<RevisionIndex> = (0..plan.len()).collect();
        for (current, base) in plan.iter().enumerate() {
            if let Some(base) = base {
                last_use[base.revision] = last_use[base.revision].max(current);
            }
        }
        Self {
            window: window.max(1),
            mode,
            last_use,
            schedule: BTreeMap::new(),
        }
    }

    /// The revision after whose processing `revision` may be dropped.
    pub fn retire_at(&self, revision: RevisionIndex) -> RevisionIndex {
        let by_window = revision + self.window;
        match self.mode {
            RetentionMode::Fixed => by_window,
            RetentionMode::Adaptive => {
                let needed_until = self.last_use.get(revision).copied().unwrap_or(revision);
                by_window.max(needed_until)
            }
        }
    }

    /// Call once `current` has been fully recorded in `graph`. Returns the
    /// revisions evicted.
    pub fn after_revision(
        &mut self,
        current: RevisionIndex,
        graph: &mut LineProvenanceGraph,
    ) -> Vec<RevisionIndex> {
        let retire_at = self.retire_at(current);
        self.schedule.entry(retire_at).or_default().push(current);

        let mut evicted = Vec::new();
        while let Some(entry) = self.schedule.first_entry() {
            if *entry.key() > current {
                break;
            }
            for revision in entry.remove() {
                let files = graph.evict(revision);
                debug!(revision, files, current, "evicted revision");
                evicted.push(revision);
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChurnError;
    use crate::provenance::FileRevision;

    fn linear_plan(len: usize) -> Vec<Option<DiffBase>> {
        (0..len)
            .map(|i| {
                (i > 0).then(|| DiffBase {
                    revision: i - 1,
                    merge: false,
                })
            })
            .collect()
    }

    fn process(
        evictor: &mut HistoryWindowEvictor,
        graph: &mut LineProvenanceGraph,
        upto: RevisionIndex,
    ) {
        for i in 0..=upto {
            graph.begin_revision(i);
            graph.record(i, "f".into(), FileRevision::introduced("x\n".into(), i));
            evictor.after_revision(i, graph);
        }
    }

    #[test]
    fn linear_history_keeps_exactly_the_window() {
        let plan = linear_plan(25);
        let mut evictor = HistoryWindowEvictor::new(20, RetentionMode::Adaptive, &plan);
        let mut graph = LineProvenanceGraph::new();
        process(&mut evictor, &mut graph, 24);

        assert!(graph.is_evicted(4));
        assert!(!graph.is_evicted(5));
        assert_eq!(graph.retained_revisions(), 20);
        assert!(matches!(
            graph.base(25, 4, "f"),
            Err(ChurnError::HistoryWindowExceeded { requested: 4, .. })
        ));
        assert!(graph.base(25, 24, "f").unwrap().is_some());
    }

    #[test]
    fn adaptive_mode_keeps_a_far_merge_base() {
        let mut plan = linear_plan(30);
        plan[29] = Some(DiffBase {
            revision: 2,
            merge: true,
        });
        let mut adaptive = HistoryWindowEvictor::new(20, RetentionMode::Adaptive, &plan);
        assert_eq!(adaptive.retire_at(2), 29);
        assert_eq!(adaptive.retire_at(3), 23);

        let mut graph = LineProvenanceGraph::new();
        process(&mut adaptive, &mut graph, 28);
        assert!(graph.base(29, 2, "f").unwrap().is_some());
        assert!(graph.is_evicted(3));

        let evicted = adaptive.after_revision(29, &mut graph);
        assert!(evicted.contains(&2));
    }

    #[test]
    fn fixed_mode_fails_loudly_on_a_far_merge_base() {
        let mut plan = linear_plan(30);
        plan[29] = Some(DiffBase {
            revision: 2,
            merge: true,
        });
        let mut fixed = HistoryWindowEvictor::new(20, RetentionMode::Fixed, &plan);
        let mut graph = LineProvenanceGraph::new();
        process(&mut fixed, &mut graph, 28);
        assert!(matches!(
            graph.base(29, 2, "f"),
            Err(ChurnError::HistoryWindowExceeded { .. })
        ));
    }
}
