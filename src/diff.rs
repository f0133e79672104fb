use gix::diff::blob::{
    Algorithm, diff as blob_diff, intern::InternedInput, sources::lines_with_terminator,
};
use std::ops::Range;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkKind {
    Equal,
    Insert,
    Delete,
}

/// A run of lines that the diff treats the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub kind: HunkKind,
    pub lines: u32,
    pub text: String,
}

impl Hunk {
    fn from_lines(kind: HunkKind, lines: &[&str]) -> Self {
        Self {
            kind,
            lines: lines.len() as u32,
            text: lines.concat(),
        }
    }
}

/// Produces an ordered, gap-free hunk list covering both texts.
pub trait LineDiffer: Send + Sync {
    fn diff(&self, source: &str, dest: &str) -> Result<Vec<Hunk>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    MyersMinimal,
    Histogram,
}

impl From<DiffAlgorithm> for Algorithm {
    fn from(value: DiffAlgorithm) -> Self {
        match value {
            DiffAlgorithm::Myers => Algorithm::Myers,
            DiffAlgorithm::MyersMinimal => Algorithm::MyersMinimal,
            DiffAlgorithm::Histogram => Algorithm::Histogram,
        }
    }
}

/// Line diff backed by gix's blob diff.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobDiffer {
    algorithm: DiffAlgorithm,
}

impl BlobDiffer {
    pub fn new(algorithm: DiffAlgorithm) -> Self {
        Self { algorithm }
    }
}

impl LineDiffer for BlobDiffer {
    fn diff(&self, source: &str, dest: &str) -> Result<Vec<Hunk>> {
        // Tokens keep their terminators, so a changed line ending or a
        // newline added at end of file is a change, and token i is exactly
        // the i-th `split_inclusive('\n')` slice.
        let input = InternedInput::new(lines_with_terminator(source), lines_with_terminator(dest));
        let mut changes: Vec<(Range<u32>, Range<u32>)> = Vec::new();
        blob_diff(
            self.algorithm.into(),
            &input,
            |before: Range<u32>, after: Range<u32>| {
                changes.push((before, after));
            },
        );
        let source_lines: Vec<&str> = source.split_inclusive('\n').collect();
        let dest_lines: Vec<&str> = dest.split_inclusive('\n').collect();
        Ok(hunks_from_changes(&source_lines, &dest_lines, &changes))
    }
}

// Fills the unchanged stretches between change ranges with Equal hunks.
// Within a change, deletions come before insertions.
fn hunks_from_changes(
    source: &[&str],
    dest: &[&str],
    changes: &[(Range<u32>, Range<u32>)],
) -> Vec<Hunk> {
    let mut hunks = Vec::with_capacity(changes.len() * 3 + 1);
    let mut source_pos = 0usize;
    let mut dest_pos = 0usize;
    for (before, after) in changes {
        let (before_start, before_end) = (before.start as usize, before.end as usize);
        let (after_start, after_end) = (after.start as usize, after.end as usize);
        if before_start > source_pos {
            hunks.push(Hunk::from_lines(
                HunkKind::Equal,
                &source[source_pos..before_start],
            ));
        }
        if before_end > before_start {
            hunks.push(Hunk::from_lines(
                HunkKind::Delete,
                &source[before_start..before_end],
            ));
        }
        if after_end > after_start {
            hunks.push(Hunk::from_lines(
                HunkKind::Insert,
                &dest[after_start..after_end],
            ));
        }
        source_pos = before_end;
        dest_pos = after_end;
    }
    if source_pos < source.len() {
        hunks.push(Hunk::from_lines(HunkKind::Equal, &source[source_pos..]));
    }
    debug_assert_eq!(
        source.len() - source_pos,
        dest.len() - dest_pos,
        "unchanged tails differ in length"
    );
    hunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(hunks: &[Hunk]) -> Vec<(HunkKind, u32)> {
        hunks.iter().map(|h| (h.kind, h.lines)).collect()
    }

    #[test]
    fn identical_texts_are_one_equal_hunk() {
        let hunks = BlobDiffer::default().diff("a\nb\n", "a\nb\n").unwrap();
        assert_eq!(kinds(&hunks), vec![(HunkKind::Equal, 2)]);
        assert_eq!(hunks[0].text, "a\nb\n");
    }

    #[test]
    fn modified_line_is_delete_then_insert() {
        let hunks = BlobDiffer::default()
            .diff("a\nb\nc\n", "a\nB\nc\n")
            .unwrap();
        assert_eq!(
            kinds(&hunks),
            vec![
                (HunkKind::Equal, 1),
                (HunkKind::Delete, 1),
                (HunkKind::Insert, 1),
                (HunkKind::Equal, 1),
            ]
        );
        assert_eq!(hunks[1].text, "b\n");
        assert_eq!(hunks[2].text, "B\n");
    }

    #[test]
    fn empty_source_is_all_inserts() {
        let hunks = BlobDiffer::new(DiffAlgorithm::Histogram)
            .diff("", "x\ny")
            .unwrap();
        assert_eq!(kinds(&hunks), vec![(HunkKind::Insert, 2)]);
    }

    #[test]
    fn emptied_file_is_all_deletes() {
        let hunks = BlobDiffer::default().diff("x\ny\n", "").unwrap();
        assert_eq!(kinds(&hunks), vec![(HunkKind::Delete, 2)]);
    }

    #[test]
    fn line_ending_conversion_is_a_change() {
        let hunks = BlobDiffer::default().diff("a\r\nb\n", "a\nb\n").unwrap();
        assert_eq!(
            kinds(&hunks),
            vec![
                (HunkKind::Delete, 1),
                (HunkKind::Insert, 1),
                (HunkKind::Equal, 1),
            ]
        );
        assert_eq!(hunks[0].text, "a\r\n");
        assert_eq!(hunks[1].text, "a\n");
    }

    #[test]
    fn newline_added_at_end_of_file_is_a_change() {
        let hunks = BlobDiffer::default().diff("x\na", "x\na\n").unwrap();
        assert_eq!(
            kinds(&hunks),
            vec![
                (HunkKind::Equal, 1),
                (HunkKind::Delete, 1),
                (HunkKind::Insert, 1),
            ]
        );
        assert_eq!(hunks[1].text, "a");
        assert_eq!(hunks[2].text, "a\n");
    }

    #[test]
    fn hunks_cover_both_texts() {
        let source = "1\n2\n3\n4\n5\n6\n";
        let dest = "0\n1\n3\n4\nfour\n6\n7\n";
        for algorithm in [
            DiffAlgorithm::Myers,
            DiffAlgorithm::MyersMinimal,
            DiffAlgorithm::Histogram,
        ] {
            let hunks = BlobDiffer::new(algorithm).diff(source, dest).unwrap();
            let source_total: u32 = hunks
                .iter()
                .filter(|h| h.kind != HunkKind::Insert)
                .map(|h| h.lines)
                .sum();
            let dest_total: u32 = hunks
                .iter()
                .filter(|h| h.kind != HunkKind::Delete)
                .map(|h| h.lines)
                .sum();
            assert_eq!(source_total, 6);
            assert_eq!(dest_total, 7);
        }
    }
}
