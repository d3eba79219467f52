//! Parent→child commit pairing
//!
//! Turns an ordered commit span into the pairs the diff pipeline runs on.
//! Each pair lazily materializes its tree-changes view and per-file patch;
//! both are released explicitly once the pair has been analyzed.

use crate::repo::{Commit, Patch, Repository, TreeEntryChange};
use anyhow::Result;

/// Traversal order over the span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    OldestFirst,
    LatestFirst,
}

/// One parent→child pair; parent is absent only for a root commit
#[derive(Debug)]
pub struct CommitPair {
    pub child: Commit,
    pub parent: Option<Commit>,
    patch: Option<Patch>,
    changes: Option<Vec<TreeEntryChange>>,
}

impl CommitPair {
    pub fn new(child: Commit, parent: Option<Commit>) -> CommitPair {
        CommitPair {
            child,
            parent,
            patch: None,
            changes: None,
        }
    }

    /// Stable identifier `<parent_short>_<child_short>` (at most 31 chars)
    pub fn id(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}_{}", parent.short_id(), self.child.short_id()),
            None => format!("_{}", self.child.short_id()),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Per-file change kinds between parent and child trees. Memoized.
    pub fn tree_changes(&mut self, repo: &Repository) -> Result<&[TreeEntryChange]> {
        if self.changes.is_none() {
            let parent_id = self.parent.as_ref().map(|p| p.id.as_str());
            self.changes = Some(repo.tree_changes(parent_id, &self.child.id)?);
        }
        Ok(self.changes.get_or_insert_with(Vec::new))
    }

    /// Per-file unified diff between parent and child trees. Memoized.
    pub fn patch(&mut self, repo: &Repository, context_lines: u32) -> Result<&Patch> {
        if self.patch.is_none() {
            let parent_id = self.parent.as_ref().map(|p| p.id.as_str());
            self.patch = Some(repo.diff(parent_id, &self.child.id, context_lines)?);
        }
        Ok(self.patch.get_or_insert_with(Patch::default))
    }

    /// Drop the materialized patch and tree views
    pub fn release(&mut self) {
        self.patch = None;
        self.changes = None;
    }
}

/// Pure pairing over a resolved span.
///
/// `lookup_parent` resolves a parent id to its commit; unresolvable parents
/// (shallow history) degrade the pair to a root pair rather than failing.
/// At most one pair is emitted per commit, against its first parent.
pub fn pair_commits<F>(
    commits: &[Commit],
    lookup_parent: F,
    skip_initial: bool,
    skip_merge: bool,
    order: SortOrder,
) -> Vec<CommitPair>
where
    F: Fn(&str) -> Option<Commit>,
{
    let mut pairs = Vec::new();
    let iter: Box<dyn Iterator<Item = &Commit>> = match order {
        SortOrder::OldestFirst => Box::new(commits.iter()),
        SortOrder::LatestFirst => Box::new(commits.iter().rev()),
    };
    for child in iter {
        if child.is_merge() && skip_merge {
            continue;
        }
        let parent = child.parents.first().and_then(|id| lookup_parent(id));
        if parent.is_none() && skip_initial {
            continue;
        }
        pairs.push(CommitPair::new(child.clone(), parent));
    }
    pairs
}

/// Parent-expanded pairing: one pair per parent, used for ancestor
/// generations. A root commit still yields its single parent-less pair.
pub fn pair_commits_per_parent<F>(
    commits: &[Commit],
    lookup_parent: F,
    skip_initial: bool,
    order: SortOrder,
) -> Vec<CommitPair>
where
    F: Fn(&str) -> Option<Commit>,
{
    let mut pairs = Vec::new();
    let iter: Box<dyn Iterator<Item = &Commit>> = match order {
        SortOrder::OldestFirst => Box::new(commits.iter()),
        SortOrder::LatestFirst => Box::new(commits.iter().rev()),
    };
    for child in iter {
        if child.parents.is_empty() {
            if !skip_initial {
                pairs.push(CommitPair::new(child.clone(), None));
            }
            continue;
        }
        for parent_id in &child.parents {
            let parent = lookup_parent(parent_id);
            if parent.is_none() && skip_initial {
                continue;
            }
            pairs.push(CommitPair::new(child.clone(), parent));
        }
    }
    pairs
}

/// Pair a span against a repository (parents looked up from all commits)
pub fn build_pairs(
    repo: &Repository,
    commits: &[Commit],
    skip_initial: bool,
    skip_merge: bool,
    order: SortOrder,
) -> Vec<CommitPair> {
    pair_commits(
        commits,
        |id| repo.lookup(id).ok().cloned(),
        skip_initial,
        skip_merge,
        order,
    )
}
