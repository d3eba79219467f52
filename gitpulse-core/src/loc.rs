//! Line-of-code classification
//!
//! Counts gross lines and lines remaining after stripping `/* */` and `//`
//! comments and whitespace-only lines. Pure; the regexes are the whole
//! model, with no language awareness beyond them.

use regex::Regex;
use std::sync::OnceLock;

static MULTI_LINE_COMMENT_RE: OnceLock<Regex> = OnceLock::new();
static SINGLE_LINE_COMMENT_RE: OnceLock<Regex> = OnceLock::new();

fn multi_line_comment_re() -> &'static Regex {
    MULTI_LINE_COMMENT_RE.get_or_init(|| Regex::new(r"/\*(.|[\r\n])*?\*/").unwrap())
}

fn single_line_comment_re() -> &'static Regex {
    SINGLE_LINE_COMMENT_RE.get_or_init(|| Regex::new(r"^\s*//.*").unwrap())
}

/// Gross and comment-stripped line counts for one file or text fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocStats {
    pub gross: usize,
    pub no_comments: usize,
}

/// Count gross lines and no-comment lines.
///
/// The no-comment count joins the lines, deletes every multi-line comment
/// match outright (which may fuse its first and last line), then drops
/// whitespace-only and `//` lines from the remainder.
pub fn count<'a, I>(lines: I) -> LocStats
where
    I: IntoIterator<Item = &'a str>,
{
    let collected: Vec<&str> = lines.into_iter().collect();
    let gross = collected.len();

    let joined = collected.join("\n");
    let stripped = multi_line_comment_re().replace_all(&joined, "");
    let no_comments = stripped
        .split('\n')
        .filter(|line| !line.trim().is_empty() && !single_line_comment_re().is_match(line))
        .count();

    LocStats { gross, no_comments }
}

/// Count a whole text fragment
pub fn count_text(text: &str) -> LocStats {
    count(text.lines())
}

/// Per-line retention mask under the comment rules.
///
/// Unlike [`count`], multi-line comment spans are blanked in place rather
/// than deleted, so the mask stays index-aligned with the input: entry i is
/// true iff line i still carries non-comment content.
pub fn keep_mask<'a, I>(lines: I) -> Vec<bool>
where
    I: IntoIterator<Item = &'a str>,
{
    let collected: Vec<&str> = lines.into_iter().collect();
    let joined = collected.join("\n");

    let mut blanked: Vec<u8> = joined.clone().into_bytes();
    for m in multi_line_comment_re().find_iter(&joined) {
        for byte in &mut blanked[m.range()] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
    }

    let blanked = String::from_utf8_lossy(&blanked).into_owned();
    let mask: Vec<bool> = blanked
        .split('\n')
        .map(|line| !line.trim().is_empty() && !single_line_comment_re().is_match(line))
        .collect();

    debug_assert_eq!(mask.len(), collected.len().max(1));
    if collected.is_empty() {
        Vec::new()
    } else {
        mask
    }
}
