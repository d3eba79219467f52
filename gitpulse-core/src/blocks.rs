//! Hunk segmentation into blocks and numbered lines
//!
//! Decomposes a hunk body into maximal contiguous blocks whose change-kind
//! mix is homogeneous: context blocks hold only untouched lines, change
//! blocks hold deleted and/or added lines. Pure; no I/O.

use crate::patch::Hunk;
use serde::{Deserialize, Serialize};

/// Change kind of one patch line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Untouched,
    Added,
    Deleted,
}

/// One numbered patch line.
///
/// Deleted lines carry their old-side number; added and untouched lines
/// their new-side number. Text keeps the leading prefix character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Line {
    pub kind: LineKind,
    pub number: u32,
    pub text: String,
}

impl Line {
    /// Line content without the one-character diff prefix
    pub fn content(&self) -> &str {
        match self.text.chars().next() {
            Some(first) => &self.text[first.len_utf8()..],
            None => "",
        }
    }
}

/// Block classification derived from its line mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockNature {
    Context,
    Added,
    Deleted,
    Replaced,
}

/// A maximal contiguous run of lines with homogeneous change-ness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub lines: Vec<Line>,
}

impl TextBlock {
    pub fn nature(&self) -> BlockNature {
        let added = self.lines_added();
        let deleted = self.lines_deleted();
        match (added > 0, deleted > 0) {
            (true, true) => BlockNature::Replaced,
            (true, false) => BlockNature::Added,
            (false, true) => BlockNature::Deleted,
            (false, false) => BlockNature::Context,
        }
    }

    pub fn lines_added(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Added)
            .count()
    }

    pub fn lines_deleted(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Deleted)
            .count()
    }

    pub fn lines_untouched(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Untouched)
            .count()
    }

    /// Old-side number of the block's first deleted line
    pub fn old_start(&self) -> Option<u32> {
        self.lines
            .iter()
            .find(|l| l.kind == LineKind::Deleted)
            .map(|l| l.number)
    }

    /// New-side number of the block's first added or untouched line
    pub fn new_start(&self) -> Option<u32> {
        self.lines
            .iter()
            .find(|l| l.kind != LineKind::Deleted)
            .map(|l| l.number)
    }

    /// Lines in serialization order: all deleted lines (old-line order)
    /// before all added lines (new-line order); context blocks unchanged.
    pub fn whole_block(&self) -> Vec<&Line> {
        if self.nature() == BlockNature::Context {
            return self.lines.iter().collect();
        }
        let mut ordered: Vec<&Line> = self
            .lines
            .iter()
            .filter(|l| l.kind == LineKind::Deleted)
            .collect();
        ordered.extend(self.lines.iter().filter(|l| l.kind == LineKind::Added));
        ordered
    }

    /// Concatenated content of the block's added lines
    pub fn added_text(&self) -> String {
        join_content(&self.lines, LineKind::Added)
    }

    /// Concatenated content of the block's deleted lines
    pub fn deleted_text(&self) -> String {
        join_content(&self.lines, LineKind::Deleted)
    }
}

fn join_content(lines: &[Line], kind: LineKind) -> String {
    lines
        .iter()
        .filter(|l| l.kind == kind)
        .map(Line::content)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Segment a hunk body into blocks of numbered lines.
///
/// Counters start at the hunk's old/new line starts; a block boundary is
/// cut wherever the change-ness (added/deleted vs untouched) of the current
/// line differs from the previous one. Empty-file marker hunks yield no
/// blocks.
pub fn segment(hunk: &Hunk) -> Vec<TextBlock> {
    if hunk.represents_new_empty_file || hunk.body.is_empty() {
        return Vec::new();
    }

    let mut idx_old = hunk.old_start;
    let mut idx_new = hunk.new_start;
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut current: Vec<Line> = Vec::new();
    let mut prev_changed: Option<bool> = None;

    for raw in hunk.body.lines() {
        let (kind, number) = match raw.chars().next() {
            Some('-') => {
                let n = idx_old;
                idx_old += 1;
                (LineKind::Deleted, n)
            }
            Some('+') => {
                let n = idx_new;
                idx_new += 1;
                (LineKind::Added, n)
            }
            _ => {
                let n = idx_new;
                idx_old += 1;
                idx_new += 1;
                (LineKind::Untouched, n)
            }
        };

        let changed = kind != LineKind::Untouched;
        if prev_changed.is_some() && prev_changed != Some(changed) {
            blocks.push(TextBlock {
                lines: std::mem::take(&mut current),
            });
        }
        prev_changed = Some(changed);
        current.push(Line {
            kind,
            number,
            text: raw.to_string(),
        });
    }
    if !current.is_empty() {
        blocks.push(TextBlock { lines: current });
    }
    blocks
}
