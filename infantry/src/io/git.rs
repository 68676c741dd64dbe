//! Git adapter for mission commands.
//!
//! Every operation shells out to `git` in the configured repository and turns a
//! non-zero exit into a [`GitError`] that carries stderr.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::types::FileStat;

/// Failure of a git invocation.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("spawn git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git {args} failed: {stderr}")]
    Command {
        args: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("detached HEAD (refuse to run)")]
    DetachedHead,
    #[error("unexpected git output: {0}")]
    Parse(String),
}

pub type GitResult<T> = Result<T, GitError>;

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Return the current branch name (errors on detached HEAD).
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> GitResult<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
            return Err(GitError::DetachedHead);
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Return the current HEAD short SHA.
    pub fn head_short_sha(&self, len: usize) -> GitResult<String> {
        let arg = format!("--short={len}");
        let out = self.run_capture(&["rev-parse", &arg, "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// Get status entries (including untracked) in porcelain format.
    pub fn status_porcelain(&self) -> GitResult<Vec<StatusEntry>> {
        let out = self.run_capture(&["status", "--porcelain=v1", "-uall"])?;
        let mut entries = Vec::new();
        for line in out.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_status_line(line)?);
        }
        Ok(entries)
    }

    /// Status entries whose path does not start with any of `allowed_prefixes`.
    pub fn changes_outside(&self, allowed_prefixes: &[&str]) -> GitResult<Vec<StatusEntry>> {
        let entries = self.status_porcelain()?;
        Ok(entries
            .into_iter()
            .filter(|entry| {
                !allowed_prefixes
                    .iter()
                    .any(|prefix| entry.path.starts_with(prefix))
            })
            .collect())
    }

    /// Check whether a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> GitResult<bool> {
        let status = self
            .run(&[
                "show-ref",
                "--verify",
                "--quiet",
                &format!("refs/heads/{branch}"),
            ])?
            .status;
        Ok(status.success())
    }

    /// True if `path` is in the index.
    pub fn is_tracked(&self, path: &str) -> GitResult<bool> {
        let out = self.run_capture(&["ls-files", "--", path])?;
        Ok(!out.trim().is_empty())
    }

    /// Checkout `branch`, creating it at HEAD first when `create_new` is set.
    #[instrument(skip_all, fields(branch, create_new))]
    pub fn checkout(&self, branch: &str, create_new: bool) -> GitResult<()> {
        if create_new {
            debug!(branch, "creating and checking out new branch");
            self.run_checked(&["checkout", "-b", branch])?;
        } else {
            debug!(branch, "checking out branch");
            self.run_checked(&["checkout", branch])?;
        }
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> GitResult<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// Stage all changes (including deletions) under the given pathspecs.
    pub fn add_paths(&self, paths: &[&str]) -> GitResult<()> {
        let mut args = vec!["add", "-A", "--"];
        args.extend_from_slice(paths);
        self.run_checked(&args)?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> GitResult<bool> {
        let out = self.run_capture(&["diff", "--cached", "--name-only"])?;
        Ok(!out.trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> GitResult<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(true)
    }

    /// Stage everything and commit. A clean tree is a successful no-op.
    pub fn commit_all(&self, message: &str) -> GitResult<bool> {
        self.add_all()?;
        self.commit_staged(message)
    }

    pub fn last_commit_hash(&self) -> GitResult<String> {
        let out = self.run_capture(&["rev-parse", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// Subject line of the HEAD commit.
    pub fn last_commit_summary(&self) -> GitResult<String> {
        let out = self.run_capture(&["log", "-1", "--pretty=%s"])?;
        Ok(out.trim().to_string())
    }

    /// Per-file added/removed line counts of the HEAD commit.
    pub fn last_commit_file_stats(&self) -> GitResult<Vec<FileStat>> {
        let out = self.run_capture(&["show", "--numstat", "--format=", "HEAD"])?;
        let mut stats = Vec::new();
        for line in out.lines() {
            if line.trim().is_empty() {
                continue;
            }
            stats.push(parse_numstat_line(line)?);
        }
        Ok(stats)
    }

    fn run_capture(&self, args: &[&str]) -> GitResult<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> GitResult<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::Command {
                args: args.join(" "),
                code: output.status.code(),
                stderr,
            });
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> GitResult<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|source| GitError::Spawn {
                args: args.join(" "),
                source,
            })
    }
}

fn parse_status_line(line: &str) -> GitResult<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 {
        return Err(GitError::Parse(format!("unexpected porcelain line: '{line}'")));
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry { code, path })
}

fn parse_numstat_line(line: &str) -> GitResult<FileStat> {
    let mut parts = line.splitn(3, '\t');
    let (Some(added), Some(removed), Some(path)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(GitError::Parse(format!("unexpected numstat line: '{line}'")));
    };
    Ok(FileStat {
        path: path.trim().to_string(),
        added: added.parse().ok(),
        removed: removed.parse().ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    #[test]
    fn is_tracked_distinguishes_index_from_worktree() {
        let repo = TestRepo::new().expect("repo");
        repo.write_file("notes/draft.md", "draft\n").expect("write");

        assert!(repo.git().is_tracked("README.md").expect("tracked"));
        assert!(!repo.git().is_tracked("notes/draft.md").expect("untracked"));
        assert!(!repo.git().is_tracked("missing.md").expect("missing"));
    }

    #[test]
    fn parses_untracked_line() {
        let e = parse_status_line("?? foo.txt").expect("parse");
        assert_eq!(
            e,
            StatusEntry {
                code: "??".to_string(),
                path: "foo.txt".to_string()
            }
        );
    }

    #[test]
    fn parses_rename_line_uses_new_path() {
        let e = parse_status_line("R  old.txt -> new.txt").expect("parse");
        assert_eq!(e.path, "new.txt");
    }

    #[test]
    fn parses_numstat_lines() {
        let stat = parse_numstat_line("3\t1\tlib/x.py").expect("parse");
        assert_eq!(stat.added, Some(3));
        assert_eq!(stat.removed, Some(1));
        assert_eq!(stat.path, "lib/x.py");

        let binary = parse_numstat_line("-\t-\tlogo.png").expect("parse");
        assert_eq!(binary.added, None);
        assert!(parse_numstat_line("garbage").is_err());
    }

    #[test]
    fn branch_lifecycle_against_real_repo() {
        let repo = TestRepo::new().expect("repo");
        let git = repo.git();

        assert_eq!(git.current_branch().expect("branch"), "main");
        assert!(!git.branch_exists("fix/thing").expect("exists"));

        git.checkout("fix/thing", true).expect("create");
        assert_eq!(git.current_branch().expect("branch"), "fix/thing");
        assert!(git.branch_exists("fix/thing").expect("exists"));

        git.checkout("main", false).expect("checkout main");
        assert_eq!(git.current_branch().expect("branch"), "main");
    }

    #[test]
    fn creating_existing_branch_is_a_typed_error() {
        let repo = TestRepo::new().expect("repo");
        let git = repo.git();
        git.checkout("docs/readme", true).expect("create");
        git.checkout("main", false).expect("back");

        let err = git.checkout("docs/readme", true).unwrap_err();
        match err {
            GitError::Command { stderr, .. } => assert!(stderr.contains("already exists")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn commit_all_is_noop_on_clean_tree() {
        let repo = TestRepo::new().expect("repo");
        let git = repo.git();
        assert!(!git.commit_all("nothing").expect("commit"));

        repo.write_file("lib/x.py", "def bar():\n    pass\n")
            .expect("write");
        assert!(git.commit_all("add x").expect("commit"));
        assert_eq!(git.last_commit_summary().expect("summary"), "add x");
        assert_eq!(git.last_commit_hash().expect("hash").len(), 40);

        let stats = git.last_commit_file_stats().expect("stats");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].path, "lib/x.py");
        assert_eq!(stats[0].added, Some(2));
    }

    #[test]
    fn changes_outside_filters_allowed_prefixes() {
        let repo = TestRepo::new().expect("repo");
        repo.write_file("missions/a/report.md", "r").expect("write");
        repo.write_file("stray.txt", "s").expect("write");

        let outside = repo.git().changes_outside(&["missions/a/"]).expect("status");
        assert_eq!(outside.len(), 1);
        assert_eq!(outside[0].path, "stray.txt");
    }
}
