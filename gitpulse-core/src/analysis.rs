//! Analysis orchestration
//!
//! Drives the full pipeline: span resolution, developer unification, hours
//! estimation, and the per-pair diff analysis (tree checkout, clone
//! detection, hunk segmentation, similarity, aggregation). Pairs run in
//! parallel under the configured execution policy; each recovery is logged
//! with its pair id and file path and surfaced in the run counters.

use crate::blocks::{segment, Line, LineKind};
use crate::cancel::CancellationToken;
use crate::clones::{count_cloned, spans_for_change, ChangeCloneSpans, CloneFindings};
use crate::config::{ExecutionPolicy, ResolvedConfig};
use crate::developers::{unify_commits, Unification};
use crate::errors::AnalysisError;
use crate::hours::estimate;
use crate::loc::{count as count_loc, keep_mask, LocStats};
use crate::metrics::{aggregate, file_loc_for, ChangeMetrics, FileLoc, HunkCounts};
use crate::pairs::{build_pairs, CommitPair, SortOrder};
use crate::patch::{parse_hunks, Hunk};
use crate::repo::{ChangeKind, Commit, RepoPool, Repository, TreeEntryChange, DEV_NULL};
use crate::report::{
    AnalysisReport, BlockReport, CommitReport, DeveloperHoursReport, DeveloperReport,
    FileBlockReport, HoursReport, PairReport, RepositoryInfo, RunCounters, TreeEntryContribution,
};
use crate::similarity::{compare, MeasurementType};
use crate::span::CommitSpan;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::Path;

/// Analyze a repository span into the rooted report.
///
/// Hours estimation runs across the enabled parameter sets; the diff
/// pipeline runs across pairs unless `skip_git_metrics` is set. Both
/// sections honor the cancellation token.
pub fn analyze_repository(
    repo_path: &Path,
    span: &CommitSpan,
    order: SortOrder,
    config: &ResolvedConfig,
    cancel: &CancellationToken,
) -> Result<AnalysisReport> {
    let repo = Repository::open(repo_path)?;
    let resolved = span.resolve(&repo)?;
    let commits = resolved.commits.clone();
    let unified = unify_commits(&commits);

    let threads = match config.execution_policy {
        ExecutionPolicy::Linear => 1,
        ExecutionPolicy::Parallel => 0,
    };
    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| AnalysisError::Internal(format!("failed to build thread pool: {}", e)))?;

    cancel.checkpoint()?;
    let hours = thread_pool.install(|| hours_reports(&commits, &unified, span, config));
    cancel.checkpoint()?;

    let (pair_reports, contributions, counters) = if config.skip_git_metrics {
        (Vec::new(), Vec::new(), RunCounters::default())
    } else {
        let pairs = build_pairs(
            &repo,
            &commits,
            config.skip_initial_commit,
            config.skip_merge_commits,
            order,
        );
        let pool = RepoPool::open(repo_path, thread_pool.current_num_threads().max(1))?;
        let outcomes: Vec<PairOutcome> = thread_pool.install(|| {
            pairs
                .into_par_iter()
                .map(|pair| analyze_pair(&pool, pair, config, &unified, cancel))
                .collect()
        });
        cancel.checkpoint()?;
        collect_outcomes(outcomes)
    };

    let mut developer_reports: Vec<DeveloperReport> = unified
        .identities
        .iter()
        .map(|identity| DeveloperReport {
            identity: identity.clone(),
            commit_count: 0,
        })
        .collect();
    for idx in unified.by_commit.values() {
        if let Some(report) = developer_reports.get_mut(*idx) {
            report.commit_count += 1;
        }
    }

    let commit_reports: Vec<CommitReport> = commits
        .iter()
        .map(|commit| CommitReport {
            sha: commit.id.clone(),
            short_sha: commit.id[..commit.id.len().min(7)].to_string(),
            developer: unified.by_commit.get(&commit.id).copied().unwrap_or(0),
            author: commit.author.clone(),
            committer: commit.committer.clone(),
            message: commit.message.clone(),
            parents: commit.parents.clone(),
            is_merge: commit.is_merge(),
        })
        .collect();

    let mut report = AnalysisReport {
        repository: RepositoryInfo {
            path: repo_path.display().to_string(),
            since: resolved.since_display.clone(),
            until: resolved.until_display.clone(),
            commit_count: commits.len(),
        },
        developers: developer_reports,
        commits: commit_reports,
        pairs: pair_reports,
        contributions,
        hours,
        counters,
    };
    report.sort_contributions();
    Ok(report)
}

/// Hours estimation across the enabled parameter sets (parallel section)
fn hours_reports(
    commits: &[Commit],
    unified: &Unification,
    span: &CommitSpan,
    config: &ResolvedConfig,
) -> Vec<HoursReport> {
    let selector = span.selector();

    let mut per_developer: Vec<Vec<&Commit>> = vec![Vec::new(); unified.identities.len()];
    for commit in commits {
        if let Some(&idx) = unified.by_commit.get(&commit.id) {
            per_developer[idx].push(commit);
        }
    }
    for list in &mut per_developer {
        list.sort_by(|a, b| {
            (selector.timestamp_of(a), a.id.as_str())
                .cmp(&(selector.timestamp_of(b), b.id.as_str()))
        });
    }

    config
        .hours_types
        .par_iter()
        .map(|&hours_type| HoursReport {
            hours_type,
            developers: per_developer
                .iter()
                .enumerate()
                .filter_map(|(developer, dev_commits)| {
                    estimate(dev_commits, selector, hours_type)
                        .map(|hours| DeveloperHoursReport { developer, hours })
                })
                .collect(),
        })
        .collect()
}

/// Everything one pair's analysis produced
struct PairOutcome {
    report: PairReport,
    contributions: Vec<TreeEntryContribution>,
    skipped_pair: bool,
    skipped_files: usize,
    discarded_clone_sets: usize,
}

fn collect_outcomes(
    outcomes: Vec<PairOutcome>,
) -> (Vec<PairReport>, Vec<TreeEntryContribution>, RunCounters) {
    let mut pair_reports = Vec::with_capacity(outcomes.len());
    let mut contributions = Vec::new();
    let mut counters = RunCounters::default();
    for outcome in outcomes {
        if outcome.skipped_pair {
            counters.skipped_pairs += 1;
        } else {
            counters.analyzed_pairs += 1;
        }
        counters.skipped_files += outcome.skipped_files;
        counters.discarded_clone_sets += outcome.discarded_clone_sets;
        pair_reports.push(outcome.report);
        contributions.extend(outcome.contributions);
    }
    (pair_reports, contributions, counters)
}

/// Analyze one pair end to end; recoveries never escape this function
fn analyze_pair(
    pool: &RepoPool,
    mut pair: CommitPair,
    config: &ResolvedConfig,
    unified: &Unification,
    cancel: &CancellationToken,
) -> PairOutcome {
    let pair_id = pair.id();
    let mut outcome = PairOutcome {
        report: PairReport {
            id: pair_id.clone(),
            child_sha: pair.child.id.clone(),
            parent_sha: pair.parent.as_ref().map(|p| p.id.clone()),
        },
        contributions: Vec::new(),
        skipped_pair: false,
        skipped_files: 0,
        discarded_clone_sets: 0,
    };
    if cancel.is_cancelled() {
        outcome.skipped_pair = true;
        return outcome;
    }

    let repo = pool.lease();
    match analyze_pair_inner(&repo, &mut pair, &pair_id, config, unified, &mut outcome) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("warning: skipping pair {}: {:#}", pair_id, e);
            outcome.skipped_pair = true;
            outcome.contributions.clear();
        }
    }
    pair.release();
    outcome
}

fn analyze_pair_inner(
    repo: &Repository,
    pair: &mut CommitPair,
    pair_id: &str,
    config: &ResolvedConfig,
    unified: &Unification,
    outcome: &mut PairOutcome,
) -> Result<()> {
    let changes: Vec<TreeEntryChange> = pair
        .tree_changes(repo)?
        .iter()
        .filter(|change| {
            matches!(
                change.kind,
                ChangeKind::Added | ChangeKind::Modified | ChangeKind::Deleted | ChangeKind::Renamed
            )
        })
        .filter(|change| config.language_allows(change.extension().as_deref()))
        .filter(|change| config.should_include(change.effective_path()))
        .cloned()
        .collect();
    if changes.is_empty() {
        return Ok(());
    }

    let parent_id = pair.parent.as_ref().map(|p| p.id.clone());
    let child_id = pair.child.id.clone();
    let committer_time = pair.child.committer.timestamp;
    let developer = unified.by_commit.get(&child_id).copied().unwrap_or(0);

    // Check out both sides of every change under the pair's scratch tree
    let pair_dir = config.temp_directory.join(pair_id);
    let checkout =
        write_pair_tree(repo, &pair_dir, parent_id.as_deref(), &child_id, &changes)
            .map_err(|e| AnalysisError::TempIoFailed(format!("{}: {:#}", pair_dir.display(), e)))?;

    let findings = run_clone_detection(config, &pair_dir, pair_id);
    outcome.discarded_clone_sets += findings.discarded_multi_block;

    let patch = pair.patch(repo, config.context_lines)?.clone();

    for change in &changes {
        let spans = spans_for_change(&findings, &pair_dir, change);
        let old_loc = checkout.old_stats(&change.old_path);
        let new_loc = checkout.new_stats(&change.new_path);
        let file_loc = file_loc_for(change.kind, old_loc, new_loc);

        let analyzed = match change.kind {
            ChangeKind::Added | ChangeKind::Deleted => {
                let content = if change.kind == ChangeKind::Added {
                    checkout.new_content(&change.new_path)
                } else {
                    checkout.old_content(&change.old_path)
                };
                let hunk = synthetic_hunk(change.kind, content);
                Some(analyze_file_hunks(&[hunk], &spans, &[], file_loc))
            }
            _ => {
                let text = patch
                    .for_change(change)
                    .map(|f| f.text.as_str())
                    .unwrap_or("");
                match parse_hunks(change, text) {
                    Ok(hunks) => Some(analyze_file_hunks(
                        &hunks,
                        &spans,
                        &config.measurements,
                        file_loc,
                    )),
                    Err(e) => {
                        eprintln!(
                            "warning: skipping file {} in pair {}: {}",
                            change.effective_path(),
                            pair_id,
                            e
                        );
                        outcome.skipped_files += 1;
                        None
                    }
                }
            }
        };

        if let Some((file_blocks, metrics)) = analyzed {
            outcome.contributions.push(TreeEntryContribution {
                pair_id: pair_id.to_string(),
                commit_sha: child_id.clone(),
                committer_time,
                developer,
                change_kind: change.kind,
                old_path: change.old_path.clone(),
                new_path: change.new_path.clone(),
                file_blocks,
                metrics,
            });
        }
    }

    // Scratch tree is only needed while the detector and overlay run
    let _ = std::fs::remove_dir_all(&pair_dir);
    Ok(())
}

/// Clone detection with local degradation: failures yield an empty set
fn run_clone_detection(config: &ResolvedConfig, pair_dir: &Path, pair_id: &str) -> CloneFindings {
    match config.clone_detector.run(pair_dir) {
        Ok(findings) => findings,
        Err(e) => {
            eprintln!("warning: clone detection degraded for pair {}: {}", pair_id, e);
            CloneFindings::default()
        }
    }
}

/// Cached blob contents of one pair's checkout
struct PairCheckout {
    old: std::collections::HashMap<String, String>,
    new: std::collections::HashMap<String, String>,
}

impl PairCheckout {
    fn old_content(&self, path: &str) -> &str {
        self.old.get(path).map(String::as_str).unwrap_or("")
    }

    fn new_content(&self, path: &str) -> &str {
        self.new.get(path).map(String::as_str).unwrap_or("")
    }

    fn old_stats(&self, path: &str) -> LocStats {
        count_loc(self.old_content(path).lines())
    }

    fn new_stats(&self, path: &str) -> LocStats {
        count_loc(self.new_content(path).lines())
    }
}

/// Write the old/new versions of the changed files under
/// `<pair_dir>/{old,new}/<relative-path>`, wiping the directory first.
fn write_pair_tree(
    repo: &Repository,
    pair_dir: &Path,
    parent_id: Option<&str>,
    child_id: &str,
    changes: &[TreeEntryChange],
) -> Result<PairCheckout> {
    if pair_dir.exists() {
        std::fs::remove_dir_all(pair_dir)
            .with_context(|| format!("failed to wipe {}", pair_dir.display()))?;
    }
    let old_root = pair_dir.join("old");
    let new_root = pair_dir.join("new");
    std::fs::create_dir_all(&old_root)
        .with_context(|| format!("failed to create {}", old_root.display()))?;
    std::fs::create_dir_all(&new_root)
        .with_context(|| format!("failed to create {}", new_root.display()))?;

    let mut checkout = PairCheckout {
        old: Default::default(),
        new: Default::default(),
    };

    for change in changes {
        if change.old_path != DEV_NULL {
            if let Some(parent) = parent_id {
                let content = repo.read_blob(parent, &change.old_path)?;
                write_tree_entry(&old_root, &change.old_path, &content)?;
                checkout.old.insert(change.old_path.clone(), content);
            }
        }
        if change.new_path != DEV_NULL {
            let content = repo.read_blob(child_id, &change.new_path)?;
            write_tree_entry(&new_root, &change.new_path, &content)?;
            checkout.new.insert(change.new_path.clone(), content);
        }
    }
    Ok(checkout)
}

fn write_tree_entry(root: &Path, relative: &str, content: &str) -> Result<()> {
    let target = root.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&target, content)
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(())
}

/// The synthetic whole-file hunk of a pure addition or deletion
fn synthetic_hunk(kind: ChangeKind, content: &str) -> Hunk {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Hunk::empty_file_marker();
    }
    let count = lines.len() as u32;
    let prefix = if kind == ChangeKind::Added { '+' } else { '-' };
    let body = lines
        .iter()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n");
    let (old_start, old_lines, new_start, new_lines) = if kind == ChangeKind::Added {
        (0, 0, 1, count)
    } else {
        (1, count, 0, 0)
    };
    Hunk {
        old_start,
        old_lines,
        new_start,
        new_lines,
        body,
        represents_new_empty_file: false,
    }
}

/// Segment, measure, and aggregate one file's hunks.
///
/// `measurements` empty skips similarity (synthetic add/delete hunks); the
/// aggregation then runs for the sentinel only.
fn analyze_file_hunks(
    hunks: &[Hunk],
    spans: &ChangeCloneSpans,
    measurements: &[MeasurementType],
    file_loc: FileLoc,
) -> (Vec<FileBlockReport>, Vec<ChangeMetrics>) {
    let mut file_blocks = Vec::with_capacity(hunks.len());
    let mut hunk_counts = Vec::with_capacity(hunks.len());

    for hunk in hunks {
        let blocks = segment(hunk);
        let lines: Vec<&Line> = blocks.iter().flat_map(|b| b.lines.iter()).collect();

        let deleted_contents: Vec<&str> = lines
            .iter()
            .filter(|l| l.kind == LineKind::Deleted)
            .map(|l| l.content())
            .collect();
        let added_contents: Vec<&str> = lines
            .iter()
            .filter(|l| l.kind == LineKind::Added)
            .map(|l| l.content())
            .collect();
        let deleted_mask = keep_mask(deleted_contents.iter().copied());
        let added_mask = keep_mask(added_contents.iter().copied());

        let cloned = count_cloned(lines.iter().copied(), spans, &deleted_mask, &added_mask);

        let similarities = if measurements.is_empty() {
            Vec::new()
        } else {
            let deleted_text = deleted_contents.join("\n");
            let added_text = added_contents.join("\n");
            let deleted_nc = masked_text(&deleted_contents, &deleted_mask);
            let added_nc = masked_text(&added_contents, &added_mask);
            compare(measurements, &deleted_text, &added_text, &deleted_nc, &added_nc)
        };

        file_blocks.push(FileBlockReport {
            old_start: hunk.old_start,
            old_lines: hunk.old_lines,
            new_start: hunk.new_start,
            new_lines: hunk.new_lines,
            represents_new_empty_file: hunk.represents_new_empty_file,
            blocks: blocks
                .iter()
                .map(|block| BlockReport {
                    nature: block.nature(),
                    lines_added: block.lines_added(),
                    lines_deleted: block.lines_deleted(),
                    lines_untouched: block.lines_untouched(),
                    old_start: block.old_start(),
                    new_start: block.new_start(),
                })
                .collect(),
            similarities: similarities.clone(),
        });

        hunk_counts.push(HunkCounts {
            added: added_contents.len(),
            deleted: deleted_contents.len(),
            added_no_comments: added_mask.iter().filter(|&&keep| keep).count(),
            deleted_no_comments: deleted_mask.iter().filter(|&&keep| keep).count(),
            cloned,
            similarities,
        });
    }

    let enabled: &[MeasurementType] = if measurements.is_empty() {
        &[MeasurementType::None]
    } else {
        measurements
    };
    let metrics = aggregate(enabled, file_loc, &hunk_counts);
    (file_blocks, metrics)
}

fn masked_text(contents: &[&str], mask: &[bool]) -> String {
    contents
        .iter()
        .zip(mask.iter())
        .filter(|(_, &keep)| keep)
        .map(|(line, _)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}
