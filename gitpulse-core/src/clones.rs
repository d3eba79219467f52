//! Clone-detection overlay
//!
//! Runs the external clone detector over a pair's checked-out trees and
//! intersects its reported spans with per-hunk line numbers. Only records
//! with exactly two blocks are kept: the old-file and new-file versions of
//! the same tree change. Everything else is discarded and counted.

use crate::blocks::{Line, LineKind};
use crate::errors::AnalysisError;
use crate::repo::{TreeEntryChange, DEV_NULL};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

/// One span reported by the detector
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloneBlock {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// One clone record; only two-block records survive parsing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloneSet {
    pub blocks: Vec<CloneBlock>,
}

/// Parsed detector output for one pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneFindings {
    pub sets: Vec<CloneSet>,
    /// Records dropped for not having exactly two blocks
    pub discarded_multi_block: usize,
}

impl CloneFindings {
    /// Keep two-block records, count the rest
    pub fn from_sets(sets: Vec<CloneSet>) -> CloneFindings {
        let mut kept = Vec::new();
        let mut discarded = 0;
        for set in sets {
            if set.blocks.len() == 2 {
                kept.push(set);
            } else {
                discarded += 1;
            }
        }
        CloneFindings {
            sets: kept,
            discarded_multi_block: discarded,
        }
    }
}

/// External clone-detection subprocess.
///
/// Stdout must be a JSON array of clone records. No configured binary means
/// detection is disabled and every pair sees an empty finding set.
#[derive(Debug, Clone, Default)]
pub struct CloneDetector {
    pub binary: Option<PathBuf>,
    pub args: Vec<String>,
}

impl CloneDetector {
    pub fn is_enabled(&self) -> bool {
        self.binary.is_some()
    }

    /// Run the detector with the pair directory as working directory.
    ///
    /// Failures are reported as [`AnalysisError::CloneDetectionFailed`];
    /// the caller decides whether to degrade or abort.
    pub fn run(&self, working_dir: &Path) -> Result<CloneFindings, AnalysisError> {
        let Some(binary) = &self.binary else {
            return Ok(CloneFindings::default());
        };

        let output = Command::new(binary)
            .args(&self.args)
            .current_dir(working_dir)
            .output()
            .map_err(|e| {
                AnalysisError::CloneDetectionFailed(format!(
                    "failed to spawn {}: {}",
                    binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(AnalysisError::CloneDetectionFailed(format!(
                "{} exited with {}: {}",
                binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let sets: Vec<CloneSet> = serde_json::from_slice(&output.stdout).map_err(|e| {
            AnalysisError::CloneDetectionFailed(format!("unparseable detector output: {}", e))
        })?;
        Ok(CloneFindings::from_sets(sets))
    }
}

/// Clone spans of one tree change, split by side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeCloneSpans {
    /// (start_line, end_line) spans on the old-file version
    pub old: Vec<(u32, u32)>,
    /// (start_line, end_line) spans on the new-file version
    pub new: Vec<(u32, u32)>,
}

impl ChangeCloneSpans {
    pub fn is_empty(&self) -> bool {
        self.old.is_empty() && self.new.is_empty()
    }
}

/// Case-insensitive absolute key for path comparison
fn canonical_key(base: &Path, path: &str) -> String {
    let raw = Path::new(path);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        base.join(raw)
    };
    let mut parts: Vec<String> = Vec::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            other => parts.push(other.as_os_str().to_string_lossy().to_lowercase()),
        }
    }
    parts.join("/")
}

/// Select the clone spans belonging to one tree change.
///
/// A set qualifies only when its two blocks resolve to the old-side and
/// new-side copies of the change under the pair directory
/// (`<pair_dir>/old/<old_path>` and `<pair_dir>/new/<new_path>`).
pub fn spans_for_change(
    findings: &CloneFindings,
    pair_dir: &Path,
    change: &TreeEntryChange,
) -> ChangeCloneSpans {
    let old_key = (change.old_path != DEV_NULL)
        .then(|| canonical_key(pair_dir, &format!("old/{}", change.old_path)));
    let new_key = (change.new_path != DEV_NULL)
        .then(|| canonical_key(pair_dir, &format!("new/{}", change.new_path)));

    let mut spans = ChangeCloneSpans::default();
    for set in &findings.sets {
        let keys: Vec<String> = set
            .blocks
            .iter()
            .map(|b| canonical_key(pair_dir, &b.file_path))
            .collect();
        let matches_change = |first: usize, second: usize| {
            old_key.as_deref() == Some(keys[first].as_str())
                && new_key.as_deref() == Some(keys[second].as_str())
        };
        let (old_block, new_block) = if matches_change(0, 1) {
            (&set.blocks[0], &set.blocks[1])
        } else if matches_change(1, 0) {
            (&set.blocks[1], &set.blocks[0])
        } else {
            continue;
        };
        spans.old.push((old_block.start_line, old_block.end_line));
        spans.new.push((new_block.start_line, new_block.end_line));
    }
    spans
}

/// Per-hunk line counts falling inside clone spans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneCounts {
    pub added: usize,
    pub deleted: usize,
    pub added_no_comments: usize,
    pub deleted_no_comments: usize,
}

fn in_spans(number: u32, spans: &[(u32, u32)]) -> bool {
    spans
        .iter()
        .any(|&(start, end)| number >= start && number <= end)
}

/// Count a hunk's added/deleted lines inside the change's clone spans.
///
/// `deleted_keep` and `added_keep` are the comment keep-masks aligned with
/// the hunk's deleted-line and added-line sequences respectively.
pub fn count_cloned<'a, I>(
    lines: I,
    spans: &ChangeCloneSpans,
    deleted_keep: &[bool],
    added_keep: &[bool],
) -> CloneCounts
where
    I: IntoIterator<Item = &'a Line>,
{
    let mut counts = CloneCounts::default();
    let mut deleted_idx = 0;
    let mut added_idx = 0;

    for line in lines {
        match line.kind {
            LineKind::Deleted => {
                if in_spans(line.number, &spans.old) {
                    counts.deleted += 1;
                    if deleted_keep.get(deleted_idx).copied().unwrap_or(false) {
                        counts.deleted_no_comments += 1;
                    }
                }
                deleted_idx += 1;
            }
            LineKind::Added => {
                if in_spans(line.number, &spans.new) {
                    counts.added += 1;
                    if added_keep.get(added_idx).copied().unwrap_or(false) {
                        counts.added_no_comments += 1;
                    }
                }
                added_idx += 1;
            }
            LineKind::Untouched => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::ChangeKind;

    fn line(kind: LineKind, number: u32, text: &str) -> Line {
        Line {
            kind,
            number,
            text: text.to_string(),
        }
    }

    fn modified(path: &str) -> TreeEntryChange {
        TreeEntryChange {
            old_path: path.to_string(),
            new_path: path.to_string(),
            kind: ChangeKind::Modified,
        }
    }

    fn set(old_path: &str, old_span: (u32, u32), new_path: &str, new_span: (u32, u32)) -> CloneSet {
        CloneSet {
            blocks: vec![
                CloneBlock {
                    file_path: old_path.to_string(),
                    start_line: old_span.0,
                    end_line: old_span.1,
                },
                CloneBlock {
                    file_path: new_path.to_string(),
                    start_line: new_span.0,
                    end_line: new_span.1,
                },
            ],
        }
    }

    #[test]
    fn test_multi_block_records_are_discarded_and_counted() {
        let mut three = set("old/a.rs", (1, 2), "new/a.rs", (3, 4));
        three.blocks.push(CloneBlock {
            file_path: "new/b.rs".to_string(),
            start_line: 1,
            end_line: 1,
        });
        let one = CloneSet {
            blocks: vec![CloneBlock {
                file_path: "old/a.rs".to_string(),
                start_line: 1,
                end_line: 1,
            }],
        };
        let two = set("old/a.rs", (1, 2), "new/a.rs", (3, 4));

        let findings = CloneFindings::from_sets(vec![three, one, two]);
        assert_eq!(findings.sets.len(), 1);
        assert_eq!(findings.discarded_multi_block, 2);
    }

    #[test]
    fn test_spans_match_same_change_only() {
        let pair_dir = Path::new("/tmp/pairs/abc_def");
        let findings = CloneFindings::from_sets(vec![
            set("old/src/a.rs", (10, 20), "new/src/a.rs", (30, 40)),
            set("old/src/other.rs", (1, 5), "new/src/other.rs", (1, 5)),
            // Blocks reversed: new side listed first
            set("new/src/a.rs", (50, 60), "old/src/a.rs", (70, 80)),
        ]);

        let spans = spans_for_change(&findings, pair_dir, &modified("src/a.rs"));
        assert_eq!(spans.old, vec![(10, 20), (70, 80)]);
        assert_eq!(spans.new, vec![(30, 40), (50, 60)]);
    }

    #[test]
    fn test_span_matching_is_case_insensitive() {
        let pair_dir = Path::new("/tmp/pairs/abc_def");
        let findings =
            CloneFindings::from_sets(vec![set("old/SRC/A.RS", (1, 3), "new/src/a.rs", (1, 3))]);
        let spans = spans_for_change(&findings, pair_dir, &modified("src/a.rs"));
        assert_eq!(spans.old, vec![(1, 3)]);
    }

    #[test]
    fn test_sets_touching_one_side_only_are_ignored() {
        let pair_dir = Path::new("/tmp/pairs/abc_def");
        // Both blocks on the new side: not an old/new pairing of the change
        let findings =
            CloneFindings::from_sets(vec![set("new/src/a.rs", (1, 3), "new/src/a.rs", (5, 7))]);
        let spans = spans_for_change(&findings, pair_dir, &modified("src/a.rs"));
        assert!(spans.is_empty());
    }

    #[test]
    fn test_added_file_has_no_old_side_to_match() {
        let pair_dir = Path::new("/tmp/pairs/abc_def");
        let change = TreeEntryChange {
            old_path: DEV_NULL.to_string(),
            new_path: "src/a.rs".to_string(),
            kind: ChangeKind::Added,
        };
        let findings =
            CloneFindings::from_sets(vec![set("old/src/a.rs", (1, 3), "new/src/a.rs", (1, 3))]);
        assert!(spans_for_change(&findings, pair_dir, &change).is_empty());
    }

    #[test]
    fn test_count_cloned_intersects_line_numbers() {
        let lines = vec![
            line(LineKind::Deleted, 10, "-a"),
            line(LineKind::Deleted, 11, "-// comment"),
            line(LineKind::Deleted, 15, "-outside"),
            line(LineKind::Untouched, 30, " ctx"),
            line(LineKind::Added, 31, "+x"),
            line(LineKind::Added, 32, "+y"),
            line(LineKind::Added, 40, "+outside"),
        ];
        let spans = ChangeCloneSpans {
            old: vec![(10, 12)],
            new: vec![(31, 33)],
        };
        let deleted_keep = vec![true, false, true];
        let added_keep = vec![true, true, true];

        let counts = count_cloned(&lines, &spans, &deleted_keep, &added_keep);
        assert_eq!(counts.deleted, 2);
        assert_eq!(counts.deleted_no_comments, 1);
        assert_eq!(counts.added, 2);
        assert_eq!(counts.added_no_comments, 2);
    }

    #[test]
    fn test_detector_output_parses_two_block_records() {
        let json = r#"[
            {"blocks": [
                {"file_path": "old/a.rs", "start_line": 1, "end_line": 4},
                {"file_path": "new/a.rs", "start_line": 2, "end_line": 5}
            ]},
            {"blocks": [
                {"file_path": "old/a.rs", "start_line": 1, "end_line": 1},
                {"file_path": "new/a.rs", "start_line": 1, "end_line": 1},
                {"file_path": "new/b.rs", "start_line": 1, "end_line": 1}
            ]}
        ]"#;
        let sets: Vec<CloneSet> = serde_json::from_str(json).unwrap();
        let findings = CloneFindings::from_sets(sets);
        assert_eq!(findings.sets.len(), 1);
        assert_eq!(findings.discarded_multi_block, 1);
        assert_eq!(findings.sets[0].blocks[1].end_line, 5);
    }

    #[test]
    fn test_disabled_detector_returns_empty_findings() {
        let detector = CloneDetector::default();
        assert!(!detector.is_enabled());
        let findings = detector.run(Path::new("/nonexistent")).unwrap();
        assert_eq!(findings, CloneFindings::default());
    }
}
