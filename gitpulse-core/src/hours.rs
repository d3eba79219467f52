//! Session-based effort estimation
//!
//! Converts one developer's ordered commit timestamps into estimated
//! working hours. Commits closer together than `max_commit_diff` minutes
//! belong to the same session and contribute their gap; a larger gap opens
//! a new session and contributes `first_commit_add` minutes instead.

use crate::repo::Commit;
use crate::span::TimeSelector;
use serde::{Deserialize, Serialize};

/// Session-model parameters, both in positive minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct HoursType {
    /// Maximum commit gap (minutes) still counted as the same session
    pub max_commit_diff: u32,
    /// Minutes attributed to the first commit of each session
    pub first_commit_add: u32,
}

impl Default for HoursType {
    fn default() -> Self {
        HoursType {
            max_commit_diff: 120,
            first_commit_add: 120,
        }
    }
}

/// Per-commit detail of one developer's estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HoursSpan {
    /// Previous commit id; absent on the first commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    /// Commit the span's hours are attributed to
    pub until: String,
    pub hours: f64,
    /// Monotone non-decreasing cumulative hours
    pub running_total: f64,
    /// True only on the developer's very first commit
    pub is_initial: bool,
    /// True on the first commit of every session
    pub is_session_initial: bool,
}

/// One developer's full estimate under one parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeveloperHours {
    /// The developer's first analyzed commit
    pub initial_commit: String,
    pub total_hours: f64,
    pub spans: Vec<HoursSpan>,
}

/// Estimate hours for one developer's commits.
///
/// `commits` must be that developer's commits ordered ascending by the
/// selector's timestamp. Returns `None` for an empty sequence.
pub fn estimate(
    commits: &[&Commit],
    selector: TimeSelector,
    params: HoursType,
) -> Option<DeveloperHours> {
    let first = commits.first()?;
    let session_hours = f64::from(params.first_commit_add) / 60.0;

    let mut spans = Vec::with_capacity(commits.len());
    let mut running_total = session_hours;
    spans.push(HoursSpan {
        since: None,
        until: first.id.clone(),
        hours: session_hours,
        running_total,
        is_initial: true,
        is_session_initial: true,
    });

    for window in commits.windows(2) {
        let (prev, curr) = (window[0], window[1]);
        let gap_minutes =
            (selector.timestamp_of(curr) - selector.timestamp_of(prev)) as f64 / 60.0;
        let (hours, session_initial) = if gap_minutes <= f64::from(params.max_commit_diff) {
            (gap_minutes / 60.0, false)
        } else {
            (session_hours, true)
        };
        running_total += hours;
        spans.push(HoursSpan {
            since: Some(prev.id.clone()),
            until: curr.id.clone(),
            hours,
            running_total,
            is_initial: false,
            is_session_initial: session_initial,
        });
    }

    Some(DeveloperHours {
        initial_commit: first.id.clone(),
        total_hours: running_total,
        spans,
    })
}

/// One-pass estimate over raw timestamps (seconds, ascending)
pub fn estimate_total(timestamps: &[i64], params: HoursType) -> f64 {
    if timestamps.is_empty() {
        return 0.0;
    }
    let session_hours = f64::from(params.first_commit_add) / 60.0;
    let mut total = session_hours;
    for window in timestamps.windows(2) {
        let gap_minutes = (window[1] - window[0]) as f64 / 60.0;
        if gap_minutes <= f64::from(params.max_commit_diff) {
            total += gap_minutes / 60.0;
        } else {
            total += session_hours;
        }
    }
    total
}
