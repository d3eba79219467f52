//! Read-only git repository adapter
//!
//! Exposes the minimum the analysis needs: all commits reachable from all
//! refs, per-commit lookup, tree-changes and unified-diff patches between
//! two commits, and blob reads for tree-entry checkout.
//!
//! Global invariants enforced:
//! - Commit hash is the sole identity
//! - All reads are idempotent
//! - Missing parents produce root pairs, not errors
//!
//! Uses git CLI directly (no libgit2) for portability.

use crate::errors::AnalysisError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Conventional old-side path of an added file and new-side path of a deleted one
pub const DEV_NULL: &str = "/dev/null";

/// Unit separator used in `git log --format` output
const FIELD_SEP: char = '\u{1f}';
/// Record separator used in `git log --format` output
const RECORD_SEP: char = '\u{1e}';

/// Author or committer stamp on a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Unix timestamp in seconds, UTC
    pub timestamp: i64,
}

/// One commit as read from the object database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Commit {
    /// Full hex identifier (40 or 64 chars)
    pub id: String,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
    /// Parent identifiers in recorded order; empty for a root commit
    pub parents: Vec<String>,
}

impl Commit {
    /// Stable short identifier (first 15 hex chars), used in pair ids
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(15)]
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Per-file change kind between two trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    TypeChange,
    Unmodified,
}

impl ChangeKind {
    /// Parse the status letter of `git diff --name-status` output
    fn from_status(status: &str) -> Option<ChangeKind> {
        match status.chars().next()? {
            'A' => Some(ChangeKind::Added),
            'D' => Some(ChangeKind::Deleted),
            'M' => Some(ChangeKind::Modified),
            'R' => Some(ChangeKind::Renamed),
            'C' => Some(ChangeKind::Copied),
            'T' => Some(ChangeKind::TypeChange),
            _ => None,
        }
    }
}

/// One per-file record from comparing two commit trees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TreeEntryChange {
    pub old_path: String,
    pub new_path: String,
    pub kind: ChangeKind,
}

impl TreeEntryChange {
    /// The path the entry lives at after the change (old path for deletions)
    pub fn effective_path(&self) -> &str {
        if self.kind == ChangeKind::Deleted {
            &self.old_path
        } else {
            &self.new_path
        }
    }

    /// Lower-cased extension of the effective path, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(self.effective_path())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// Unified-diff text for one file of a pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub old_path: String,
    pub new_path: String,
    /// Hunk headers and bodies, starting at the first `@@` line; empty for
    /// pure renames, empty files, and binary entries
    pub text: String,
}

/// Per-file unified diffs between two trees
#[derive(Debug, Clone, Default)]
pub struct Patch {
    files: Vec<FilePatch>,
    by_path: HashMap<String, usize>,
}

impl Patch {
    fn push(&mut self, file: FilePatch) {
        let key = if file.new_path == DEV_NULL {
            file.old_path.clone()
        } else {
            file.new_path.clone()
        };
        self.by_path.insert(key, self.files.len());
        self.files.push(file);
    }

    /// Look up the diff for a tree-entry change (old path for deletions)
    pub fn for_change(&self, change: &TreeEntryChange) -> Option<&FilePatch> {
        self.by_path
            .get(change.effective_path())
            .map(|&idx| &self.files[idx])
    }

    pub fn files(&self) -> &[FilePatch] {
        &self.files
    }
}

/// Read-only handle on an on-disk git repository
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    commits: std::sync::OnceLock<Vec<Commit>>,
}

impl Repository {
    /// Open a repository, verifying the backing store exists
    pub fn open(path: &Path) -> Result<Repository> {
        let probe = Command::new("git")
            .current_dir(path)
            .args(["rev-parse", "--git-dir"])
            .output();
        match probe {
            Ok(output) if output.status.success() => Ok(Repository {
                root: path.to_path_buf(),
                commits: std::sync::OnceLock::new(),
            }),
            Ok(output) => Err(AnalysisError::RepositoryUnavailable(format!(
                "{}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into()),
            Err(e) => Err(AnalysisError::RepositoryUnavailable(format!(
                "{}: failed to invoke git: {}",
                path.display(),
                e
            ))
            .into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Execute a git command in the repository and return the trimmed stdout
    fn git(&self, args: &[&str]) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.git_raw(args)?)
            .trim()
            .to_string())
    }

    /// Execute a git command and return the raw stdout bytes (no trimming)
    fn git_raw(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(args)
            .output()
            .context("failed to invoke git")?;

        if !output.status.success() {
            anyhow::bail!(
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(output.stdout)
    }

    /// All commits reachable from all refs, deduplicated, ordered by
    /// committer timestamp ascending (ties broken by id). Memoized.
    pub fn all_commits(&self) -> Result<&[Commit]> {
        if let Some(commits) = self.commits.get() {
            return Ok(commits);
        }
        let loaded = self.load_commits()?;
        Ok(self.commits.get_or_init(|| loaded))
    }

    fn load_commits(&self) -> Result<Vec<Commit>> {
        let format = format!(
            "--format=%H{s}%an{s}%ae{s}%at{s}%cn{s}%ce{s}%ct{s}%P{s}%B{r}",
            s = FIELD_SEP,
            r = RECORD_SEP
        );
        let raw = self.git_raw(&["log", "--all", &format])?;
        let text = String::from_utf8_lossy(&raw);

        let mut seen: HashMap<String, ()> = HashMap::new();
        let mut commits = Vec::new();
        for record in text.split(RECORD_SEP) {
            let record = record.trim_start_matches(['\n', '\r']);
            if record.trim().is_empty() {
                continue;
            }
            let commit = parse_commit_record(record)
                .with_context(|| format!("unparseable commit record: {:.80}", record))?;
            if seen.insert(commit.id.clone(), ()).is_none() {
                commits.push(commit);
            }
        }

        commits.sort_by(|a, b| {
            (a.committer.timestamp, a.id.as_str()).cmp(&(b.committer.timestamp, b.id.as_str()))
        });
        Ok(commits)
    }

    /// Fetch a commit by full id or unique prefix
    pub fn lookup(&self, id: &str) -> Result<&Commit> {
        self.all_commits()?
            .iter()
            .find(|c| c.id.starts_with(id))
            .ok_or_else(|| anyhow::anyhow!("no commit with id {}", id))
    }

    /// Per-file change kinds between two commits (rename detection on).
    ///
    /// `old` of `None` compares against the empty tree (root commit).
    pub fn tree_changes(&self, old: Option<&str>, new: &str) -> Result<Vec<TreeEntryChange>> {
        let output = match old {
            Some(old_id) => self.git(&[
                "diff",
                "--name-status",
                "--find-renames",
                "--no-color",
                old_id,
                new,
            ])?,
            None => self.git(&[
                "diff-tree",
                "--no-commit-id",
                "--root",
                "-r",
                "--find-renames",
                "--name-status",
                "--no-color",
                new,
            ])?,
        };

        let mut changes = Vec::new();
        for line in output.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split('\t');
            let status = parts.next().unwrap_or_default();
            let Some(kind) = ChangeKind::from_status(status) else {
                continue;
            };
            let first = parts.next().unwrap_or_default().to_string();
            let second = parts.next().map(|p| p.to_string());
            let change = match kind {
                ChangeKind::Added => TreeEntryChange {
                    old_path: DEV_NULL.to_string(),
                    new_path: first,
                    kind,
                },
                ChangeKind::Deleted => TreeEntryChange {
                    old_path: first,
                    new_path: DEV_NULL.to_string(),
                    kind,
                },
                ChangeKind::Renamed | ChangeKind::Copied => TreeEntryChange {
                    old_path: first.clone(),
                    new_path: second.unwrap_or(first),
                    kind,
                },
                _ => TreeEntryChange {
                    old_path: first.clone(),
                    new_path: first,
                    kind,
                },
            };
            changes.push(change);
        }
        Ok(changes)
    }

    /// Unified-diff patch between two commits, split per file.
    ///
    /// `context_lines` is clamped to `i32::MAX`; passing the maximum yields
    /// one hunk per file covering the full content.
    pub fn diff(&self, old: Option<&str>, new: &str, context_lines: u32) -> Result<Patch> {
        let unified = format!("-U{}", context_lines.min(i32::MAX as u32));
        let raw = match old {
            Some(old_id) => self.git_raw(&[
                "diff",
                "--no-color",
                "--find-renames",
                &unified,
                old_id,
                new,
            ])?,
            None => self.git_raw(&[
                "diff-tree",
                "--no-commit-id",
                "--root",
                "-r",
                "-p",
                "--find-renames",
                "--no-color",
                &unified,
                new,
            ])?,
        };
        Ok(parse_patch_output(&String::from_utf8_lossy(&raw)))
    }

    /// Content of one tree entry at a commit
    pub fn read_blob(&self, commit: &str, path: &str) -> Result<String> {
        let spec = format!("{}:{}", commit, path);
        let raw = self
            .git_raw(&["show", &spec])
            .with_context(|| format!("failed to read blob {}", spec))?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// Parse one `FIELD_SEP`-delimited commit record
fn parse_commit_record(record: &str) -> Option<Commit> {
    let mut fields = record.split(FIELD_SEP);
    let id = fields.next()?.trim().to_string();
    let author_name = fields.next()?.to_string();
    let author_email = fields.next()?.to_string();
    let author_ts = fields.next()?.trim().parse::<i64>().ok()?;
    let committer_name = fields.next()?.to_string();
    let committer_email = fields.next()?.to_string();
    let committer_ts = fields.next()?.trim().parse::<i64>().ok()?;
    let parents = fields
        .next()?
        .split_whitespace()
        .map(|p| p.to_string())
        .collect();
    let message = fields.next().unwrap_or_default().trim_end().to_string();

    if id.is_empty() {
        return None;
    }
    Some(Commit {
        id,
        author: Signature {
            name: author_name,
            email: author_email,
            timestamp: author_ts,
        },
        committer: Signature {
            name: committer_name,
            email: committer_email,
            timestamp: committer_ts,
        },
        message,
        parents,
    })
}

/// Strip the `a/` or `b/` diff prefix from a `---`/`+++` header path
fn strip_diff_prefix(path: &str) -> String {
    if path == DEV_NULL {
        return path.to_string();
    }
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
        .to_string()
}

/// Split raw `git diff` output into per-file sections
fn parse_patch_output(raw: &str) -> Patch {
    let mut patch = Patch::default();

    let mut old_path: Option<String> = None;
    let mut new_path: Option<String> = None;
    let mut hunk_lines: Vec<&str> = Vec::new();
    let mut in_section = false;

    let mut flush = |old_path: &mut Option<String>,
                     new_path: &mut Option<String>,
                     hunk_lines: &mut Vec<&str>| {
        if old_path.is_some() || new_path.is_some() {
            let old = old_path.take().unwrap_or_else(|| DEV_NULL.to_string());
            let new = new_path.take().unwrap_or_else(|| DEV_NULL.to_string());
            let text = hunk_lines.join("\n");
            patch.push(FilePatch {
                old_path: old,
                new_path: new,
                text,
            });
        }
        hunk_lines.clear();
    };

    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            flush(&mut old_path, &mut new_path, &mut hunk_lines);
            in_section = true;
            // Fallback paths from the section header; refined by the
            // ---/+++/rename headers below when present.
            let mut parts = rest.split_whitespace();
            old_path = parts.next().map(strip_diff_prefix);
            new_path = parts.next().map(strip_diff_prefix);
            continue;
        }
        if !in_section {
            continue;
        }
        if !hunk_lines.is_empty() || line.starts_with("@@") {
            hunk_lines.push(line);
        } else if let Some(p) = line.strip_prefix("--- ") {
            old_path = Some(strip_diff_prefix(p));
        } else if let Some(p) = line.strip_prefix("+++ ") {
            new_path = Some(strip_diff_prefix(p));
        } else if let Some(p) = line.strip_prefix("rename from ") {
            old_path = Some(p.to_string());
        } else if let Some(p) = line.strip_prefix("rename to ") {
            new_path = Some(p.to_string());
        }
    }
    flush(&mut old_path, &mut new_path, &mut hunk_lines);

    patch
}

fn relock<'a, T>(
    result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

struct PoolInner {
    handles: Mutex<Vec<Repository>>,
    returned: Condvar,
}

/// Bounded pool of repository handles for parallel reads.
///
/// Each handle is an independent view on the same on-disk store, so readers
/// never share a `Repository` across threads. Acquisition blocks until a
/// handle is returned; leases return their handle on drop.
pub struct RepoPool {
    inner: Arc<PoolInner>,
}

impl RepoPool {
    /// Open `size` handles (at least one) on the repository at `path`
    pub fn open(path: &Path, size: usize) -> Result<RepoPool> {
        let size = size.max(1);
        let mut handles = Vec::with_capacity(size);
        for _ in 0..size {
            handles.push(Repository::open(path)?);
        }
        Ok(RepoPool {
            inner: Arc::new(PoolInner {
                handles: Mutex::new(handles),
                returned: Condvar::new(),
            }),
        })
    }

    /// Borrow a handle, blocking until one is available
    pub fn lease(&self) -> RepoLease {
        let mut guard = relock(self.inner.handles.lock());
        loop {
            if let Some(repo) = guard.pop() {
                return RepoLease {
                    repo: Some(repo),
                    inner: Arc::clone(&self.inner),
                };
            }
            guard = relock(self.inner.returned.wait(guard));
        }
    }
}

/// Scoped loan of a pooled repository handle
pub struct RepoLease {
    repo: Option<Repository>,
    inner: Arc<PoolInner>,
}

impl std::ops::Deref for RepoLease {
    type Target = Repository;

    fn deref(&self) -> &Repository {
        // repo is only vacated in drop
        self.repo.as_ref().expect("lease already released")
    }
}

impl Drop for RepoLease {
    fn drop(&mut self) {
        if let Some(repo) = self.repo.take() {
            relock(self.inner.handles.lock()).push(repo);
            self.inner.returned.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commit_record() {
        let record = format!(
            "abc123{s}Alice{s}alice@example.com{s}1700000000{s}Bob{s}bob@example.com{s}1700000100{s}p1 p2{s}Fix the thing\n",
            s = FIELD_SEP
        );
        let commit = parse_commit_record(&record).expect("record should parse");
        assert_eq!(commit.id, "abc123");
        assert_eq!(commit.author.name, "Alice");
        assert_eq!(commit.author.timestamp, 1_700_000_000);
        assert_eq!(commit.committer.email, "bob@example.com");
        assert_eq!(commit.parents, vec!["p1", "p2"]);
        assert_eq!(commit.message, "Fix the thing");
        assert!(commit.is_merge());
    }

    #[test]
    fn test_parse_patch_output_modified_file() {
        let raw = "diff --git a/src/lib.rs b/src/lib.rs\n\
                   index 111..222 100644\n\
                   --- a/src/lib.rs\n\
                   +++ b/src/lib.rs\n\
                   @@ -1,2 +1,2 @@\n \
                   fn main() {\n\
                   -    old();\n\
                   +    new();\n";
        let patch = parse_patch_output(raw);
        assert_eq!(patch.files().len(), 1);
        let file = &patch.files()[0];
        assert_eq!(file.old_path, "src/lib.rs");
        assert_eq!(file.new_path, "src/lib.rs");
        assert!(file.text.starts_with("@@ -1,2 +1,2 @@"));
        assert!(file.text.contains("-    old();"));
    }

    #[test]
    fn test_parse_patch_output_pure_rename_has_empty_text() {
        let raw = "diff --git a/old_name.rs b/new_name.rs\n\
                   similarity index 100%\n\
                   rename from old_name.rs\n\
                   rename to new_name.rs\n";
        let patch = parse_patch_output(raw);
        assert_eq!(patch.files().len(), 1);
        let file = &patch.files()[0];
        assert_eq!(file.old_path, "old_name.rs");
        assert_eq!(file.new_path, "new_name.rs");
        assert!(file.text.is_empty());

        let change = TreeEntryChange {
            old_path: "old_name.rs".to_string(),
            new_path: "new_name.rs".to_string(),
            kind: ChangeKind::Renamed,
        };
        assert!(patch.for_change(&change).is_some());
    }

    #[test]
    fn test_parse_patch_output_added_and_deleted() {
        let raw = "diff --git a/added.rs b/added.rs\n\
                   new file mode 100644\n\
                   --- /dev/null\n\
                   +++ b/added.rs\n\
                   @@ -0,0 +1 @@\n\
                   +fn added() {}\n\
                   diff --git a/gone.rs b/gone.rs\n\
                   deleted file mode 100644\n\
                   --- a/gone.rs\n\
                   +++ /dev/null\n\
                   @@ -1 +0,0 @@\n\
                   -fn gone() {}\n";
        let patch = parse_patch_output(raw);
        assert_eq!(patch.files().len(), 2);
        assert_eq!(patch.files()[0].old_path, DEV_NULL);
        assert_eq!(patch.files()[0].new_path, "added.rs");
        assert_eq!(patch.files()[1].new_path, DEV_NULL);

        let deleted = TreeEntryChange {
            old_path: "gone.rs".to_string(),
            new_path: DEV_NULL.to_string(),
            kind: ChangeKind::Deleted,
        };
        let file = patch.for_change(&deleted).expect("deleted file indexed by old path");
        assert!(file.text.contains("-fn gone() {}"));
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn seed_repo(dir: &Path) {
        let run = |args: &[&str], envs: &[(&str, &str)]| {
            let mut cmd = Command::new("git");
            cmd.current_dir(dir).args(args);
            for (key, value) in envs {
                cmd.env(key, value);
            }
            let output = cmd.output().expect("failed to invoke git");
            assert!(
                output.status.success(),
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        };
        run(&["init", "-q"], &[]);
        run(&["config", "user.name", "Alice"], &[]);
        run(&["config", "user.email", "alice@example.com"], &[]);

        std::fs::write(dir.join("a.rs"), "fn a() {}\n").expect("write a.rs");
        run(&["add", "-A"], &[]);
        run(
            &["commit", "-q", "-m", "first"],
            &[
                ("GIT_AUTHOR_DATE", "1704100000 +0000"),
                ("GIT_COMMITTER_DATE", "1704100000 +0000"),
            ],
        );

        std::fs::write(dir.join("a.rs"), "fn a() { a_impl(); }\nfn a_impl() {}\n")
            .expect("rewrite a.rs");
        run(&["add", "-A"], &[]);
        run(
            &["commit", "-q", "-m", "second"],
            &[
                ("GIT_AUTHOR_DATE", "1704110000 +0000"),
                ("GIT_COMMITTER_DATE", "1704110000 +0000"),
            ],
        );
    }

    #[test]
    fn test_open_fails_outside_a_repository() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Repository::open(dir.path()).expect_err("bare dir should not open");
        assert_eq!(crate::errors::exit_code_for(&err), crate::errors::EXIT_REPO);
    }

    #[test]
    fn test_all_commits_and_diffs_over_seeded_repo() {
        if !git_available() {
            eprintln!("Skipping test: git unavailable");
            return;
        }
        let dir = tempfile::tempdir().expect("tempdir");
        seed_repo(dir.path());

        let repo = Repository::open(dir.path()).expect("open seeded repo");
        let commits = repo.all_commits().expect("all commits");
        assert_eq!(commits.len(), 2);
        // Ordered by committer timestamp ascending
        assert!(commits[0].committer.timestamp < commits[1].committer.timestamp);
        assert_eq!(commits[0].message, "first");
        assert!(commits[0].parents.is_empty());
        assert_eq!(commits[1].parents, vec![commits[0].id.clone()]);

        // Idempotent reads return the memoized list
        let again = repo.all_commits().expect("all commits again");
        assert_eq!(again.len(), 2);

        let (first, second) = (commits[0].id.clone(), commits[1].id.clone());
        let changes = repo
            .tree_changes(Some(&first), &second)
            .expect("tree changes");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert_eq!(changes[0].new_path, "a.rs");

        // Root commit compares against the empty tree
        let root_changes = repo.tree_changes(None, &first).expect("root changes");
        assert_eq!(root_changes.len(), 1);
        assert_eq!(root_changes[0].kind, ChangeKind::Added);
        assert_eq!(root_changes[0].old_path, DEV_NULL);

        let patch = repo.diff(Some(&first), &second, 3).expect("diff");
        let file = patch.for_change(&changes[0]).expect("patch for a.rs");
        assert!(file.text.starts_with("@@"));
        assert!(file.text.contains("+fn a_impl() {}"));

        let blob = repo.read_blob(&second, "a.rs").expect("read blob");
        assert!(blob.contains("a_impl"));

        let missing = repo.lookup("ffffffffffffffff");
        assert!(missing.is_err());
    }

    #[test]
    fn test_pool_lease_returns_handles() {
        if !git_available() {
            eprintln!("Skipping test: git unavailable");
            return;
        }
        let dir = tempfile::tempdir().expect("tempdir");
        seed_repo(dir.path());

        let pool = RepoPool::open(dir.path(), 2).expect("pool");
        {
            let first = pool.lease();
            let second = pool.lease();
            assert_eq!(first.all_commits().unwrap().len(), 2);
            assert_eq!(second.all_commits().unwrap().len(), 2);
        }
        // Both handles returned; leasing twice again must not block
        let _first = pool.lease();
        let _second = pool.lease();
    }

    #[test]
    fn test_change_kind_parsing_covers_rename_scores() {
        assert_eq!(ChangeKind::from_status("R100"), Some(ChangeKind::Renamed));
        assert_eq!(ChangeKind::from_status("C75"), Some(ChangeKind::Copied));
        assert_eq!(ChangeKind::from_status("M"), Some(ChangeKind::Modified));
        assert_eq!(ChangeKind::from_status("X"), None);
    }

    #[test]
    fn test_effective_path_and_extension() {
        let deleted = TreeEntryChange {
            old_path: "src/Gone.CS".to_string(),
            new_path: DEV_NULL.to_string(),
            kind: ChangeKind::Deleted,
        };
        assert_eq!(deleted.effective_path(), "src/Gone.CS");
        assert_eq!(deleted.extension().as_deref(), Some("cs"));

        let added = TreeEntryChange {
            old_path: DEV_NULL.to_string(),
            new_path: "src/new.rs".to_string(),
            kind: ChangeKind::Added,
        };
        assert_eq!(added.effective_path(), "src/new.rs");
    }
}
