use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::classifier::{ChurnClassifier, ClassifiedFile};
use crate::config::ChurnConfig;
use crate::diff::{BlobDiffer, LineDiffer};
use crate::error::Result;
use crate::evictor::HistoryWindowEvictor;
use crate::history::{index_map, linearize};
use crate::merge::{MergeParentPolicy, plan_diff_bases};
use crate::model::{BlameSummary, ChurnRecord, FileSnapshot};
use crate::output::ChurnSink;
use crate::provenance::LineProvenanceGraph;
use crate::source::HistorySource;

/// Drives the forward blame over a whole history, one revision at a time.
pub struct BlameOrchestrator<'a, S: HistorySource> {
    source: &'a mut S,
    config: &'a ChurnConfig,
    differ: Box<dyn LineDiffer>,
    policy: Box<dyn MergeParentPolicy>,
    progress: ProgressBar,
}

impl<'a, S: HistorySource> BlameOrchestrator<'a, S> {
    pub fn new(source: &'a mut S, config: &'a ChurnConfig) -> Self {
        Self {
            source,
            config,
            differ: Box::new(BlobDiffer::new(config.diff_algorithm)),
            policy: config.merge_policy.build(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn MergeParentPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Shows a progress bar while revisions are processed.
    pub fn with_progress(mut self) -> Self {
        self.progress = ProgressBar::new(0).with_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise}) {per_sec:0.1} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self
    }

    /// Runs the analysis, streaming one record per commit into `sink`.
    /// `sink.finish()` is left to the caller.
    pub fn run(self, sink: &mut dyn ChurnSink) -> Result<BlameSummary> {
        let config = self.config;
        let head = self.source.resolve_head(config.head.as_deref())?;
        let commits = linearize(&*self.source, &head, config.order)?;
        let index = index_map(&commits);

        // Commits from the stop commit on are never processed, so they are
        // not planned either.
        let stop = commits
            .iter()
            .position(|commit| config.is_stop_commit(&commit.id))
            .unwrap_or(commits.len());
        if let Some(commit) = commits.get(stop) {
            info!(commit = %commit.id, current = stop, "reached stop commit");
        }
        let commits_to_process = &commits[..stop];
        let plan = plan_diff_bases(commits_to_process, &index, self.policy.as_ref())?;
        let mut evictor =
            HistoryWindowEvictor::new(config.retention_window, config.retention, &plan);
        let mut graph = LineProvenanceGraph::new();
        let classifier = ChurnClassifier::new(&commits, self.differ.as_ref());
        let filter = config.path_filter.as_ref();

        self.progress.set_length(commits_to_process.len() as u64);
        let mut records = Vec::with_capacity(commits_to_process.len());
        for (current, commit) in commits_to_process.iter().enumerate() {
            graph.begin_revision(current);
            let files = self.source.files_of(commit, filter)?;
            let base = plan[current];

            // Files are independent: classify them in parallel against the
            // immutable older revisions, then record in path order.
            let classified: Vec<ClassifiedFile> = files
                .into_par_iter()
                .map(|FileSnapshot { path, content }| {
                    let base_file = match base {
                        Some(base) => Some((base, graph.base(current, base.revision, &path)?)),
                        None => None,
                    };
                    classifier.classify(current, path, content, base_file)
                })
                .collect::<Result<Vec<_>>>()?;

            let mut churn_files = Vec::new();
            for ClassifiedFile {
                path,
                revision,
                churn,
            } in classified
            {
                graph.record(current, path, revision);
                churn_files.extend(churn);
            }
            debug!(
                commit = %commit.id,
                current,
                churned_files = churn_files.len(),
                "processed revision"
            );

            let record = ChurnRecord::new(commit, churn_files);
            sink.append(&record)?;
            records.push(record);
            evictor.after_revision(current, &mut graph);
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();
        info!(
            records = records.len(),
            retained = graph.retained_revisions(),
            "churn analysis finished"
        );

        Ok(BlameSummary {
            path: config.path_filter.as_ref().map(|f| f.as_str().to_string()),
            head: head.id,
            records,
        })
    }
}
