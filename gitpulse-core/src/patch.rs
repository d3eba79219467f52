//! Unified-diff hunk parsing
//!
//! Splits one file's unified-diff text into hunks with their line-range
//! headers and raw bodies. The header dialect is permissive: either range
//! may collapse to a single count, and missing parts default to zero.

use crate::errors::AnalysisError;
use crate::repo::{ChangeKind, TreeEntryChange};
use regex::Regex;
use std::sync::OnceLock;

static HUNK_HEADER_RE: OnceLock<Regex> = OnceLock::new();

fn hunk_header_re() -> &'static Regex {
    HUNK_HEADER_RE.get_or_init(|| {
        Regex::new(
            r"(?m)^@@\s+-(?:(?P<old_start>\d+),)?(?P<old_num>\d+)\s+\+(?:(?P<new_start>\d+),)?(?P<new_num>\d+)\s+@@.*$",
        )
        .unwrap()
    })
}

/// One contiguous diff region with explicit old/new line ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// Raw patch lines including their ' ', '+', '-' prefixes
    pub body: String,
    /// All-zero hunk standing in for an added empty file, a pure rename,
    /// or a whole-file deletion
    pub represents_new_empty_file: bool,
}

impl Hunk {
    /// The all-zero hunk for content-less changes
    pub fn empty_file_marker() -> Hunk {
        Hunk {
            old_start: 0,
            old_lines: 0,
            new_start: 0,
            new_lines: 0,
            body: String::new(),
            represents_new_empty_file: true,
        }
    }

    /// Count of body lines with a leading '+'
    pub fn added_line_count(&self) -> usize {
        self.body.lines().filter(|l| l.starts_with('+')).count()
    }

    /// Count of body lines with a leading '-'
    pub fn deleted_line_count(&self) -> usize {
        self.body.lines().filter(|l| l.starts_with('-')).count()
    }
}

/// Parse the hunks of one file's unified-diff text.
///
/// Content-less shapes (whole-file deletion, added empty file, pure rename)
/// produce exactly one [`Hunk::empty_file_marker`]. A line starting with
/// `@@` that is not a valid header fails with
/// [`AnalysisError::PatchMalformed`].
pub fn parse_hunks(change: &TreeEntryChange, text: &str) -> Result<Vec<Hunk>, AnalysisError> {
    for line in text.lines() {
        if line.starts_with("@@") && !hunk_header_re().is_match(line) {
            return Err(AnalysisError::PatchMalformed(format!(
                "{}: bad hunk header '{}'",
                change.effective_path(),
                line
            )));
        }
    }

    let headers: Vec<regex::Captures<'_>> = hunk_header_re().captures_iter(text).collect();

    match change.kind {
        ChangeKind::Deleted => return Ok(vec![Hunk::empty_file_marker()]),
        ChangeKind::Added | ChangeKind::Renamed if headers.is_empty() => {
            return Ok(vec![Hunk::empty_file_marker()]);
        }
        _ => {}
    }

    let mut hunks = Vec::with_capacity(headers.len());
    for (idx, caps) in headers.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let body_end = headers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let body = &text[whole.end()..body_end];
        let body = body.strip_prefix('\n').unwrap_or(body);

        hunks.push(Hunk {
            old_start: group_u32(caps, "old_start"),
            old_lines: group_u32(caps, "old_num"),
            new_start: group_u32(caps, "new_start"),
            new_lines: group_u32(caps, "new_num"),
            body: body.to_string(),
            represents_new_empty_file: false,
        });
    }
    Ok(hunks)
}

/// A named capture as u32; absent groups default to 0
fn group_u32(caps: &regex::Captures<'_>, name: &str) -> u32 {
    caps.name(name)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}
