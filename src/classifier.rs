use std::sync::Arc;

use crate::diff::{Hunk, HunkKind, LineDiffer};
use crate::error::{ChurnError, Result};
use crate::merge::DiffBase;
use crate::model::{ChurnFile, CommitInfo, LineNumber, RevisionIndex, count_lines};
use crate::provenance::FileRevision;

/// The new provenance of one file plus the churn its commit caused, if any.
#[derive(Debug)]
pub struct ClassifiedFile {
    pub path: String,
    pub revision: FileRevision,
    pub churn: Option<ChurnFile>,
}

/// Turns diffs between a base revision and the current one into updated
/// line origins and self/interactive churn.
pub struct ChurnClassifier<'a> {
    commits: &'a [CommitInfo],
    differ: &'a dyn LineDiffer,
}

impl<'a> ChurnClassifier<'a> {
    pub fn new(commits: &'a [CommitInfo], differ: &'a dyn LineDiffer) -> Self {
        Self { commits, differ }
    }

    /// Classifies `path` as it appears at `current`.
    ///
    /// `base` is the planned diff base, paired with the file's state there
    /// (`None` if the file did not exist at the base). Without a base every
    /// line is attributed to `current`.
    pub fn classify(
        &self,
        current: RevisionIndex,
        path: String,
        content: Arc<str>,
        base: Option<(DiffBase, Option<&FileRevision>)>,
    ) -> Result<ClassifiedFile> {
        let Some((base, base_file)) = base else {
            return Ok(ClassifiedFile {
                path,
                revision: FileRevision::introduced(content, current),
                churn: None,
            });
        };

        if let Some(previous) = base_file {
            if previous.has_same_content(&content) {
                return Ok(ClassifiedFile {
                    path,
                    revision: previous.unchanged(content),
                    churn: None,
                });
            }
        }

        let no_origins: &[RevisionIndex] = &[];
        let (source_text, source_origins) = base_file
            .map(|file| (file.content(), file.origins()))
            .unwrap_or(("", no_origins));
        let hunks = self.differ.diff(source_text, &content)?;
        let inserted_by = if base.merge { base.revision } else { current };

        let mut churn = ChurnFile::new(path.clone());
        let origins = self.assign_origins(
            current,
            inserted_by,
            source_origins,
            count_lines(&content),
            &hunks,
            &mut churn,
        )?;

        Ok(ClassifiedFile {
            path,
            revision: FileRevision::with_origins(content, origins),
            churn: (!churn.is_empty()).then_some(churn),
        })
    }

    // Walks the hunks with a source cursor into the base and a destination
    // cursor into the current text.
    fn assign_origins(
        &self,
        current: RevisionIndex,
        inserted_by: RevisionIndex,
        source_origins: &[RevisionIndex],
        dest_len: usize,
        hunks: &[Hunk],
        churn: &mut ChurnFile,
    ) -> Result<Vec<RevisionIndex>> {
        let modifier = &self.commits[current].author;
        let mut origins = Vec::with_capacity(dest_len);
        let mut source_line = 0usize;

        for hunk in hunks {
            for _ in 0..hunk.lines {
                match hunk.kind {
                    HunkKind::Equal => {
                        let origin =
                            self.source_origin(source_origins, source_line, &churn.file_name)?;
                        source_line += 1;
                        origins.push(origin);
                    }
                    HunkKind::Insert => origins.push(inserted_by),
                    HunkKind::Delete => {
                        let owner_revision =
                            self.source_origin(source_origins, source_line, &churn.file_name)?;
                        source_line += 1;
                        let owner = &self.commits[owner_revision].author;
                        let line = source_line as LineNumber;
                        if owner.same_identity(modifier) {
                            churn.self_churn.push(line);
                        } else {
                            churn
                                .interactive_churn
                                .entry(owner.email.clone())
                                .or_default()
                                .push(line);
                        }
                    }
                }
                if origins.len() > dest_len {
                    return Err(ChurnError::Diff {
                        path: churn.file_name.clone(),
                        reason: format!("hunks produce more than {dest_len} destination lines"),
                    });
                }
            }
        }

        if source_line != source_origins.len() || origins.len() != dest_len {
            return Err(ChurnError::Diff {
                path: churn.file_name.clone(),
                reason: format!(
                    "hunks cover {source_line}/{} source and {}/{dest_len} destination lines",
                    source_origins.len(),
                    origins.len()
                ),
            });
        }
        Ok(origins)
    }

    fn source_origin(
        &self,
        source_origins: &[RevisionIndex],
        line: usize,
        path: &str,
    ) -> Result<RevisionIndex> {
        source_origins.get(line).copied().ok_or_else(|| ChurnError::Diff {
            path: path.to_string(),
            reason: format!(
                "source line {} is past the end of the base ({} lines)",
                line + 1,
                source_origins.len()
            ),
        })
    }
}
