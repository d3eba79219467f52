//! Commit span selection
//!
//! Resolves since/until bounds, an optional head limit, and an optional
//! id-filter set into an ordered, inclusive slice of the repository's
//! commits. Resolution is memoized, including failures.

use crate::errors::AnalysisError;
use crate::repo::{Commit, Repository};
use regex::Regex;
use std::sync::OnceLock;

static COMMITISH_RE: OnceLock<Regex> = OnceLock::new();

fn commitish_re() -> &'static Regex {
    COMMITISH_RE.get_or_init(|| Regex::new(r"^[a-f0-9]{3,64}$").unwrap())
}

/// Date format accepted for span bounds (interpreted as UTC)
pub const BOUND_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One side of a commit span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanBound {
    Unbounded,
    /// Unix timestamp in seconds, UTC
    Date(i64),
    /// Hex id prefix (3 to 64 chars)
    Sha(String),
}

impl SpanBound {
    /// Parse a bound: `yyyy-MM-dd HH:mm` as a UTC date, otherwise a hex
    /// commit-ish prefix. `None` means unbounded.
    pub fn parse(input: Option<&str>) -> Result<SpanBound, AnalysisError> {
        let Some(raw) = input else {
            return Ok(SpanBound::Unbounded);
        };
        let raw = raw.trim();
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, BOUND_DATE_FORMAT) {
            return Ok(SpanBound::Date(dt.and_utc().timestamp()));
        }
        if commitish_re().is_match(raw) {
            return Ok(SpanBound::Sha(raw.to_string()));
        }
        Err(AnalysisError::BoundsInvalid(format!(
            "'{}' is neither a {} date nor a commit-ish",
            raw, "yyyy-MM-dd HH:mm"
        )))
    }
}

/// Which signature timestamp bounds compare against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSelector {
    Author,
    #[default]
    Committer,
}

impl TimeSelector {
    pub fn timestamp_of(self, commit: &Commit) -> i64 {
        match self {
            TimeSelector::Author => commit.author.timestamp,
            TimeSelector::Committer => commit.committer.timestamp,
        }
    }
}

/// The resolved, inclusive commit slice plus presentation bounds
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpan {
    /// Commits ordered by committer timestamp ascending
    pub commits: Vec<Commit>,
    pub since_display: String,
    pub until_display: String,
}

/// Span request with memoized resolution
#[derive(Debug)]
pub struct CommitSpan {
    since: SpanBound,
    until: SpanBound,
    limit: Option<usize>,
    sha_filter: Vec<String>,
    selector: TimeSelector,
    resolved: OnceLock<Result<ResolvedSpan, AnalysisError>>,
}

impl CommitSpan {
    pub fn new(since: SpanBound, until: SpanBound, selector: TimeSelector) -> CommitSpan {
        CommitSpan {
            since,
            until,
            limit: None,
            sha_filter: Vec::new(),
            selector,
            resolved: OnceLock::new(),
        }
    }

    /// Keep only the head of the candidate list
    pub fn with_limit(mut self, limit: Option<usize>) -> CommitSpan {
        self.limit = limit;
        self
    }

    /// Restrict candidates to ids starting with one of these prefixes
    pub fn with_sha_filter(mut self, filter: Vec<String>) -> CommitSpan {
        self.sha_filter = filter;
        self
    }

    pub fn selector(&self) -> TimeSelector {
        self.selector
    }

    /// Resolve against the repository. Memoized, including failures.
    pub fn resolve<'a>(&'a self, repo: &Repository) -> Result<&'a ResolvedSpan, AnalysisError> {
        let slot = self.resolved.get_or_init(|| {
            let all = repo
                .all_commits()
                .map_err(|e| AnalysisError::RepositoryUnavailable(e.to_string()))?;
            resolve_span(
                all,
                &self.since,
                &self.until,
                self.limit,
                &self.sha_filter,
                self.selector,
            )
        });
        match slot {
            Ok(span) => Ok(span),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Pure span resolution over an already-ordered commit list.
///
/// `all` must be sorted by committer timestamp ascending.
pub fn resolve_span(
    all: &[Commit],
    since: &SpanBound,
    until: &SpanBound,
    limit: Option<usize>,
    sha_filter: &[String],
    selector: TimeSelector,
) -> Result<ResolvedSpan, AnalysisError> {
    // Candidate set: id-filtered when a filter is given, unknown ids dropped
    let candidates: Vec<&Commit> = if sha_filter.is_empty() {
        all.iter().collect()
    } else {
        all.iter()
            .filter(|c| sha_filter.iter().any(|f| c.id.starts_with(f.as_str())))
            .collect()
    };

    let candidates = match limit {
        Some(n) => &candidates[..n.min(candidates.len())],
        None => &candidates[..],
    };

    if candidates.is_empty() {
        return Err(AnalysisError::BoundsInvalid(
            "span selects no commits".to_string(),
        ));
    }

    let since_idx = match since {
        SpanBound::Unbounded => Some(0),
        SpanBound::Date(ts) => candidates
            .iter()
            .position(|c| selector.timestamp_of(c) >= *ts),
        SpanBound::Sha(prefix) => candidates.iter().position(|c| c.id.starts_with(prefix)),
    };

    let until_idx = match until {
        SpanBound::Unbounded => Some(candidates.len() - 1),
        SpanBound::Date(ts) => {
            let count = candidates
                .iter()
                .filter(|c| selector.timestamp_of(c) <= *ts)
                .count();
            count.checked_sub(1)
        }
        SpanBound::Sha(prefix) => candidates.iter().position(|c| c.id.starts_with(prefix)),
    };

    let (Some(since_idx), Some(until_idx)) = (since_idx, until_idx) else {
        return Err(AnalysisError::BoundsInvalid(
            "a bound matches no commit in the span".to_string(),
        ));
    };
    if until_idx < since_idx {
        return Err(AnalysisError::BoundsInvalid(format!(
            "until (index {}) precedes since (index {})",
            until_idx, since_idx
        )));
    }

    // A single-commit request must name exactly one commit
    if let (SpanBound::Sha(a), SpanBound::Sha(b)) = (since, until) {
        if a == b {
            let matches = candidates.iter().filter(|c| c.id.starts_with(a)).count();
            if matches > 1 {
                return Err(AnalysisError::AmbiguousSha(format!(
                    "prefix {} matches {} commits",
                    a, matches
                )));
            }
        }
    }

    let commits: Vec<Commit> = candidates[since_idx..=until_idx]
        .iter()
        .map(|c| (*c).clone())
        .collect();

    let since_display = display_bound(since, commits.first(), selector);
    let until_display = display_bound(until, commits.last(), selector);

    Ok(ResolvedSpan {
        commits,
        since_display,
        until_display,
    })
}

/// Presentation string for a bound: the date-time, or `#<short>` for ids
fn display_bound(bound: &SpanBound, endpoint: Option<&Commit>, selector: TimeSelector) -> String {
    match bound {
        SpanBound::Sha(prefix) => format!("#{}", prefix),
        SpanBound::Date(ts) => format_utc(*ts),
        SpanBound::Unbounded => endpoint
            .map(|c| format_utc(selector.timestamp_of(c)))
            .unwrap_or_default(),
    }
}

/// Format a Unix timestamp as `yyyy-MM-dd HH:mm` UTC
pub fn format_utc(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format(BOUND_DATE_FORMAT).to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::Signature;

    fn commit(id: &str, ts: i64) -> Commit {
        Commit {
            id: id.to_string(),
            author: Signature {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                timestamp: ts - 60,
            },
            committer: Signature {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                timestamp: ts,
            },
            message: String::new(),
            parents: Vec::new(),
        }
    }

    fn fixture() -> Vec<Commit> {
        vec![
            commit("aaa111", 1_000),
            commit("bbb222", 2_000),
            commit("ccc333", 3_000),
            commit("ddd444", 4_000),
        ]
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(SpanBound::parse(None).unwrap(), SpanBound::Unbounded);
        assert_eq!(
            SpanBound::parse(Some("2023-11-14 22:13")).unwrap(),
            SpanBound::Date(1_700_000_000 - 1_700_000_000 % 60)
        );
        assert_eq!(
            SpanBound::parse(Some("abc123")).unwrap(),
            SpanBound::Sha("abc123".to_string())
        );
        assert!(matches!(
            SpanBound::parse(Some("not-a-bound!")),
            Err(AnalysisError::BoundsInvalid(_))
        ));
        // Too short for a commit-ish
        assert!(SpanBound::parse(Some("ab")).is_err());
    }

    #[test]
    fn test_unbounded_span_takes_everything() {
        let span = resolve_span(
            &fixture(),
            &SpanBound::Unbounded,
            &SpanBound::Unbounded,
            None,
            &[],
            TimeSelector::Committer,
        )
        .unwrap();
        assert_eq!(span.commits.len(), 4);
        assert_eq!(span.since_display, format_utc(1_000));
        assert_eq!(span.until_display, format_utc(4_000));
    }

    #[test]
    fn test_date_bounds_select_inclusive_slice() {
        let span = resolve_span(
            &fixture(),
            &SpanBound::Date(1_500),
            &SpanBound::Date(3_500),
            None,
            &[],
            TimeSelector::Committer,
        )
        .unwrap();
        let ids: Vec<&str> = span.commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["bbb222", "ccc333"]);
    }

    #[test]
    fn test_author_selector_changes_date_comparison() {
        // Author timestamps sit 60s before committer ones
        let span = resolve_span(
            &fixture(),
            &SpanBound::Date(1_940),
            &SpanBound::Unbounded,
            None,
            &[],
            TimeSelector::Author,
        )
        .unwrap();
        assert_eq!(span.commits[0].id, "bbb222");
    }

    #[test]
    fn test_sha_bounds_and_presentation() {
        let span = resolve_span(
            &fixture(),
            &SpanBound::Sha("bbb".to_string()),
            &SpanBound::Sha("ddd".to_string()),
            None,
            &[],
            TimeSelector::Committer,
        )
        .unwrap();
        assert_eq!(span.commits.len(), 3);
        assert_eq!(span.since_display, "#bbb");
        assert_eq!(span.until_display, "#ddd");
    }

    #[test]
    fn test_limit_applies_before_bounds() {
        let result = resolve_span(
            &fixture(),
            &SpanBound::Unbounded,
            &SpanBound::Sha("ddd".to_string()),
            Some(2),
            &[],
            TimeSelector::Committer,
        );
        // ddd444 was cut off by the limit, so the until bound matches nothing
        assert!(matches!(result, Err(AnalysisError::BoundsInvalid(_))));

        let span = resolve_span(
            &fixture(),
            &SpanBound::Unbounded,
            &SpanBound::Unbounded,
            Some(2),
            &[],
            TimeSelector::Committer,
        )
        .unwrap();
        assert_eq!(span.commits.len(), 2);
    }

    #[test]
    fn test_sha_filter_drops_unknown_ids_silently() {
        let span = resolve_span(
            &fixture(),
            &SpanBound::Unbounded,
            &SpanBound::Unbounded,
            None,
            &["bbb".to_string(), "zzz".to_string(), "ddd444".to_string()],
            TimeSelector::Committer,
        )
        .unwrap();
        let ids: Vec<&str> = span.commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["bbb222", "ddd444"]);
    }

    #[test]
    fn test_until_before_since_is_invalid() {
        let result = resolve_span(
            &fixture(),
            &SpanBound::Sha("ccc".to_string()),
            &SpanBound::Sha("aaa".to_string()),
            None,
            &[],
            TimeSelector::Committer,
        );
        assert!(matches!(result, Err(AnalysisError::BoundsInvalid(_))));
    }

    #[test]
    fn test_single_commit_request_rejects_ambiguous_prefix() {
        let mut commits = fixture();
        commits.push(commit("aaa999", 5_000));
        let result = resolve_span(
            &commits,
            &SpanBound::Sha("aaa".to_string()),
            &SpanBound::Sha("aaa".to_string()),
            None,
            &[],
            TimeSelector::Committer,
        );
        assert!(matches!(result, Err(AnalysisError::AmbiguousSha(_))));

        // An unambiguous single-commit request selects exactly that commit
        let span = resolve_span(
            &commits,
            &SpanBound::Sha("bbb".to_string()),
            &SpanBound::Sha("bbb".to_string()),
            None,
            &[],
            TimeSelector::Committer,
        )
        .unwrap();
        assert_eq!(span.commits.len(), 1);
        assert_eq!(span.commits[0].id, "bbb222");
    }

    #[test]
    fn test_until_date_before_all_commits_is_invalid() {
        let result = resolve_span(
            &fixture(),
            &SpanBound::Unbounded,
            &SpanBound::Date(500),
            None,
            &[],
            TimeSelector::Committer,
        );
        assert!(matches!(result, Err(AnalysisError::BoundsInvalid(_))));
    }
}
