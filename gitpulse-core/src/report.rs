//! Result object and output generation
//!
//! The analysis produces one rooted, serializable report: repository and
//! span, unified developers, commits, pairs, per-file contributions with
//! their blocks and similarities, and hours estimates per parameter set.
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::blocks::BlockNature;
use crate::developers::DeveloperIdentity;
use crate::hours::{DeveloperHours, HoursType};
use crate::metrics::ChangeMetrics;
use crate::repo::{ChangeKind, Signature};
use crate::similarity::SimilarityRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Repository and span header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RepositoryInfo {
    pub path: String,
    pub since: String,
    pub until: String,
    pub commit_count: usize,
}

/// One unified developer with their share of the span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeveloperReport {
    #[serde(flatten)]
    pub identity: DeveloperIdentity,
    pub commit_count: usize,
}

/// One commit of the span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CommitReport {
    pub sha: String,
    pub short_sha: String,
    /// Index into the report's developer list
    pub developer: usize,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
    pub parents: Vec<String>,
    pub is_merge: bool,
}

/// One analyzed parent→child pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PairReport {
    pub id: String,
    pub child_sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_sha: Option<String>,
}

/// Block summary inside a file-block report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BlockReport {
    pub nature: BlockNature,
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub lines_untouched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_start: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_start: Option<u32>,
}

/// One hunk of a contribution: coordinates, blocks, similarities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileBlockReport {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub represents_new_empty_file: bool,
    pub blocks: Vec<BlockReport>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub similarities: Vec<SimilarityRecord>,
}

/// Per-(pair, file) contribution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TreeEntryContribution {
    pub pair_id: String,
    pub commit_sha: String,
    /// Child committer timestamp, the sort key of the final output
    pub committer_time: i64,
    /// Index into the report's developer list
    pub developer: usize,
    pub change_kind: ChangeKind,
    pub old_path: String,
    pub new_path: String,
    pub file_blocks: Vec<FileBlockReport>,
    /// One record per enabled measurement
    pub metrics: Vec<ChangeMetrics>,
}

/// Hours estimates of one developer under one parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeveloperHoursReport {
    /// Index into the report's developer list
    pub developer: usize,
    #[serde(flatten)]
    pub hours: DeveloperHours,
}

/// All developers' estimates under one parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HoursReport {
    pub hours_type: HoursType,
    pub developers: Vec<DeveloperHoursReport>,
}

/// Recovery and observability counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunCounters {
    pub analyzed_pairs: usize,
    pub skipped_pairs: usize,
    pub skipped_files: usize,
    pub discarded_clone_sets: usize,
}

/// The rooted result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisReport {
    pub repository: RepositoryInfo,
    pub developers: Vec<DeveloperReport>,
    pub commits: Vec<CommitReport>,
    pub pairs: Vec<PairReport>,
    pub contributions: Vec<TreeEntryContribution>,
    pub hours: Vec<HoursReport>,
    pub counters: RunCounters,
}

impl AnalysisReport {
    /// Order contributions by child committer timestamp descending, then
    /// pair id and path for stability.
    pub fn sort_contributions(&mut self) {
        self.contributions.sort_by(|a, b| {
            b.committer_time
                .cmp(&a.committer_time)
                .then_with(|| a.pair_id.cmp(&b.pair_id))
                .then_with(|| a.new_path.cmp(&b.new_path))
                .then_with(|| a.old_path.cmp(&b.old_path))
        });
    }
}

/// Serialize the report as pretty JSON
pub fn render_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize analysis report to JSON")
}

/// Render a deterministic plain-text summary
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let push = |out: &mut String, line: String| {
        out.push_str(&line);
        out.push('\n');
    };

    push(&mut out, format!("Repository: {}", report.repository.path));
    push(
        &mut out,
        format!(
            "Span: {} .. {} ({} commits, {} pairs)",
            report.repository.since,
            report.repository.until,
            report.repository.commit_count,
            report.pairs.len()
        ),
    );

    push(&mut out, format!("Developers: {}", report.developers.len()));
    for developer in &report.developers {
        push(
            &mut out,
            format!(
                "  {} <{}> ({} commits)",
                developer.identity.label(),
                developer.identity.email,
                developer.commit_count
            ),
        );
    }

    push(
        &mut out,
        format!("Contributions: {}", report.contributions.len()),
    );

    for hours in &report.hours {
        push(
            &mut out,
            format!(
                "Hours (max_diff={}m, first_add={}m):",
                hours.hours_type.max_commit_diff, hours.hours_type.first_commit_add
            ),
        );
        for entry in &hours.developers {
            let label = report
                .developers
                .get(entry.developer)
                .map(|d| d.identity.label())
                .unwrap_or("(unknown)");
            push(
                &mut out,
                format!("  {:<30} {:>8.2} h", label, entry.hours.total_hours),
            );
        }
    }

    let counters = &report.counters;
    push(
        &mut out,
        format!(
            "Pairs analyzed: {} (skipped: {}), files skipped: {}, clone sets discarded: {}",
            counters.analyzed_pairs,
            counters.skipped_pairs,
            counters.skipped_files,
            counters.discarded_clone_sets
        ),
    );

    out
}

/// Write rendered output to a file with the atomic temp + rename pattern
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }

    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, content)
        .with_context(|| format!("failed to write temporary file: {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("failed to rename temporary file to: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::MeasurementType;

    fn contribution(pair_id: &str, path: &str, time: i64) -> TreeEntryContribution {
        TreeEntryContribution {
            pair_id: pair_id.to_string(),
            commit_sha: "c".to_string(),
            committer_time: time,
            developer: 0,
            change_kind: ChangeKind::Modified,
            old_path: path.to_string(),
            new_path: path.to_string(),
            file_blocks: Vec::new(),
            metrics: Vec::new(),
        }
    }

    fn minimal_report() -> AnalysisReport {
        AnalysisReport {
            repository: RepositoryInfo {
                path: "/work/repo".to_string(),
                since: "2024-01-01 00:00".to_string(),
                until: "2024-02-01 00:00".to_string(),
                commit_count: 3,
            },
            developers: vec![DeveloperReport {
                identity: DeveloperIdentity {
                    name: "Alice".to_string(),
                    email: "a@x".to_string(),
                    alternative_names: Default::default(),
                    alternative_emails: Default::default(),
                },
                commit_count: 3,
            }],
            commits: Vec::new(),
            pairs: Vec::new(),
            contributions: vec![
                contribution("p1", "b.rs", 100),
                contribution("p2", "a.rs", 300),
                contribution("p2", "b.rs", 300),
                contribution("p3", "c.rs", 200),
            ],
            hours: vec![HoursReport {
                hours_type: HoursType::default(),
                developers: vec![DeveloperHoursReport {
                    developer: 0,
                    hours: DeveloperHours {
                        initial_commit: "c1".to_string(),
                        total_hours: 4.5,
                        spans: Vec::new(),
                    },
                }],
            }],
            counters: RunCounters {
                analyzed_pairs: 3,
                skipped_pairs: 1,
                skipped_files: 2,
                discarded_clone_sets: 1,
            },
        }
    }

    #[test]
    fn test_contributions_sort_newest_first() {
        let mut report = minimal_report();
        report.sort_contributions();
        let keys: Vec<(i64, &str, &str)> = report
            .contributions
            .iter()
            .map(|c| (c.committer_time, c.pair_id.as_str(), c.new_path.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (300, "p2", "a.rs"),
                (300, "p2", "b.rs"),
                (200, "p3", "c.rs"),
                (100, "p1", "b.rs"),
            ]
        );
    }

    #[test]
    fn test_json_rendering_is_deterministic() {
        let report = minimal_report();
        let first = render_json(&report).unwrap();
        let second = render_json(&report).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("\"total_hours\": 4.5"));
        assert!(first.contains("\"commit_count\": 3"));
    }

    #[test]
    fn test_json_roundtrip() {
        let report = minimal_report();
        let json = render_json(&report).unwrap();
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_text_summary_mentions_span_and_counters() {
        let text = render_text(&minimal_report());
        assert!(text.contains("Repository: /work/repo"));
        assert!(text.contains("Span: 2024-01-01 00:00 .. 2024-02-01 00:00 (3 commits, 0 pairs)"));
        assert!(text.contains("Alice"));
        assert!(text.contains("4.50 h"));
        assert!(text.contains("clone sets discarded: 1"));
    }

    #[test]
    fn test_similarity_records_serialize_inside_file_blocks() {
        let block = FileBlockReport {
            old_start: 1,
            old_lines: 2,
            new_start: 1,
            new_lines: 2,
            represents_new_empty_file: false,
            blocks: vec![BlockReport {
                nature: BlockNature::Replaced,
                lines_added: 1,
                lines_deleted: 1,
                lines_untouched: 0,
                old_start: Some(1),
                new_start: Some(1),
            }],
            similarities: vec![SimilarityRecord {
                measurement: MeasurementType::JaroWinkler,
                distance: 0.25,
                distance_no_comments: 0.0,
            }],
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"jaro_winkler\""));
        assert!(json.contains("\"replaced\""));
    }

    #[test]
    fn test_write_output_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/report.json");
        write_output(&target, "{\"a\":1}").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"a\":1}");

        write_output(&target, "{\"a\":2}").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"a\":2}");
        assert!(!target.with_extension("tmp").exists());
    }
}
