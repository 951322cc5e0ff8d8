//! Typed repository commands layered over a [`GitRunner`]

use super::{GitError, GitRunner};
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use std::sync::Arc;

/// Author identity stamped on a rewritten commit, as both author and committer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
    pub date: DateTime<FixedOffset>,
}

/// Repository operations used by planning and applying
#[derive(Clone)]
pub struct Repository {
    git: Arc<dyn GitRunner>,
}

impl Repository {
    pub fn new(git: Arc<dyn GitRunner>) -> Self {
        Self { git }
    }

    /// Absolute path of the working tree root
    pub async fn toplevel(&self) -> Result<String, GitError> {
        let out = self.git.run(&["rev-parse", "--show-toplevel"]).await?;
        Ok(out.trim().to_string())
    }

    /// Resolve any revision expression to a full commit id
    pub async fn resolve_commit(&self, rev: &str) -> Result<String, GitError> {
        let spec = format!("{rev}^{{commit}}");
        let out = self.git.run(&["rev-parse", "--verify", &spec]).await?;
        Ok(out.trim().to_string())
    }

    /// Current tip
    pub async fn head(&self) -> Result<String, GitError> {
        self.resolve_commit("HEAD").await
    }

    /// Symbolic name of the checked-out branch (`HEAD` when detached)
    pub async fn current_branch(&self) -> Result<String, GitError> {
        let out = self
            .git
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        Ok(out.trim().to_string())
    }

    /// The `n`th first-parent ancestor of `rev`
    pub async fn nth_ancestor(&self, rev: &str, n: usize) -> Result<String, GitError> {
        self.resolve_commit(&format!("{rev}~{n}")).await
    }

    /// A parentless commit reachable from `rev`
    pub async fn root_commit(&self, rev: &str) -> Result<String, GitError> {
        let out = self.git.run(&["rev-list", "--max-parents=0", rev]).await?;
        out.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(String::from)
            .ok_or_else(|| GitError::failed(&["rev-list", "--max-parents=0", rev], None, "no root commit"))
    }

    /// Whether `ancestor` is reachable from `descendant`
    pub async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError> {
        match self
            .git
            .run(&["merge-base", "--is-ancestor", ancestor, descendant])
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.exit_code() == Some(1) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of parents recorded on `sha`
    pub async fn parent_count(&self, sha: &str) -> Result<usize, GitError> {
        let out = self
            .git
            .run(&["rev-list", "--parents", "-n", "1", sha])
            .await?;
        Ok(out.split_whitespace().count().saturating_sub(1))
    }

    /// True when there are no staged, unstaged or untracked changes
    pub async fn is_clean(&self) -> Result<bool, GitError> {
        let out = self.git.run(&["status", "--porcelain"]).await?;
        Ok(out.trim().is_empty())
    }

    /// Whether `path` shows up as a change in `status --porcelain`.
    ///
    /// Paths outside the working tree never do.
    pub async fn dirties_worktree(&self, path: &Path) -> Result<bool, GitError> {
        let path = path.to_string_lossy();
        match self
            .git
            .run(&["status", "--porcelain", "--untracked-files=all", "--", &path])
            .await
        {
            Ok(out) => Ok(!out.trim().is_empty()),
            Err(e) if e.exit_code() == Some(128) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether a local branch called `name` exists
    pub async fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        let reference = format!("refs/heads/{name}");
        match self
            .git
            .run(&["rev-parse", "--verify", "--quiet", &reference])
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.exit_code() == Some(1) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create `name` at the current tip and switch to it
    pub async fn create_branch(&self, name: &str) -> Result<(), GitError> {
        self.git.run(&["checkout", "-q", "-b", name]).await?;
        Ok(())
    }

    /// Point the current branch, index and working tree at `rev`
    pub async fn reset_hard(&self, rev: &str) -> Result<(), GitError> {
        self.git.run(&["reset", "-q", "--hard", rev]).await?;
        Ok(())
    }

    /// Stage the changes `sha` introduces without committing them.
    ///
    /// `mainline` selects the parent to diff against when `sha` is a merge.
    pub async fn cherry_pick_no_commit(
        &self,
        sha: &str,
        mainline: Option<usize>,
    ) -> Result<(), GitError> {
        match mainline {
            Some(parent) => {
                let parent = parent.to_string();
                self.git
                    .run(&["cherry-pick", "--no-commit", "-m", &parent, sha])
                    .await?
            }
            None => self.git.run(&["cherry-pick", "--no-commit", sha]).await?,
        };
        Ok(())
    }

    /// Back out a failed staging attempt.
    ///
    /// A no-commit pick leaves no sequencer state behind, so when
    /// `cherry-pick --abort` has nothing to abort the index and tree are
    /// reset to `HEAD` instead.
    pub async fn abort_cherry_pick(&self) -> Result<(), GitError> {
        if let Err(e) = self.git.run(&["cherry-pick", "--abort"]).await {
            tracing::debug!(error = %e, "cherry-pick --abort unavailable, resetting");
            self.git.run(&["reset", "-q", "--hard", "HEAD"]).await?;
        }
        Ok(())
    }

    /// Paths that differ between the index and `HEAD`
    pub async fn staged_paths(&self) -> Result<Vec<String>, GitError> {
        let out = self.git.run(&["diff", "--cached", "--name-only"]).await?;
        Ok(out
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(String::from)
            .collect())
    }

    /// Drop everything staged, keeping `HEAD`
    pub async fn discard_staged(&self) -> Result<(), GitError> {
        self.git.run(&["reset", "-q", "--hard", "HEAD"]).await?;
        Ok(())
    }

    /// Commit the index with `message`, attributing both author and committer to `identity`.
    ///
    /// Hooks are bypassed and only whitespace is cleaned up, so lines starting
    /// with `#` are kept. Returns the new commit id.
    pub async fn commit_as(
        &self,
        message: &str,
        identity: &CommitIdentity,
    ) -> Result<String, GitError> {
        let date = identity.date.to_rfc3339();
        let env = [
            ("GIT_AUTHOR_NAME", identity.name.as_str()),
            ("GIT_AUTHOR_EMAIL", identity.email.as_str()),
            ("GIT_AUTHOR_DATE", date.as_str()),
            ("GIT_COMMITTER_NAME", identity.name.as_str()),
            ("GIT_COMMITTER_EMAIL", identity.email.as_str()),
            ("GIT_COMMITTER_DATE", date.as_str()),
        ];

        self.git
            .run_with_env(
                &[
                    "commit",
                    "-q",
                    "--no-verify",
                    "--cleanup=whitespace",
                    "-m",
                    message,
                ],
                &env,
            )
            .await?;

        self.head().await
    }

    /// `git show` of a single commit
    pub async fn show_patch(&self, sha: &str) -> Result<String, GitError> {
        self.git
            .run(&[
                "show",
                "--patch",
                "--unified=3",
                "--no-color",
                "--no-ext-diff",
                "--find-renames",
                sha,
            ])
            .await
    }

    /// Raw `git log` over `range`, oldest first, in the given format
    pub async fn log_reverse(&self, range: &str, format: &str) -> Result<String, GitError> {
        let format = format!("--format={format}");
        self.git
            .run(&["log", "--reverse", "--topo-order", &format, range, "--"])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitCli;
    use crate::test_support::{AUTHOR_EMAIL, AUTHOR_NAME, ScriptedGit, TestRepo};

    fn repository(repo: &TestRepo) -> Repository {
        Repository::new(Arc::new(GitCli::new(repo.path())))
    }

    #[tokio::test]
    async fn test_parent_count_and_ancestry() {
        let repo = TestRepo::new();
        let first = repo.commit_file("a.txt", "1\n", "first");
        let second = repo.commit_file("a.txt", "2\n", "second");
        let git = repository(&repo);

        assert_eq!(git.parent_count(&first).await.unwrap(), 0);
        assert_eq!(git.parent_count(&second).await.unwrap(), 1);
        assert!(git.is_ancestor(&first, &second).await.unwrap());
        assert!(!git.is_ancestor(&second, &first).await.unwrap());
        assert_eq!(git.root_commit("HEAD").await.unwrap(), first);
        assert_eq!(git.nth_ancestor("HEAD", 1).await.unwrap(), first);
        assert!(git.nth_ancestor("HEAD", 5).await.is_err());
    }

    #[tokio::test]
    async fn test_clean_and_branch_checks() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "1\n", "first");
        let git = repository(&repo);

        assert!(git.is_clean().await.unwrap());
        std::fs::write(repo.path().join("untracked.txt"), "x").unwrap();
        assert!(!git.is_clean().await.unwrap());

        let current = git.current_branch().await.unwrap();
        assert!(git.branch_exists(&current).await.unwrap());
        assert!(!git.branch_exists("rewrite/none").await.unwrap());
    }

    #[tokio::test]
    async fn test_dirties_worktree() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "1\n", "first");
        let git = repository(&repo);

        let inside = repo.path().join("plan.json");
        std::fs::write(&inside, "{}").unwrap();
        assert!(git.dirties_worktree(&inside).await.unwrap());

        std::fs::write(repo.path().join(".gitignore"), "plan.json\n").unwrap();
        repo.git(&["add", ".gitignore"]);
        repo.git(&["commit", "-q", "-m", "ignore plans"]);
        assert!(!git.dirties_worktree(&inside).await.unwrap());

        let elsewhere = tempfile::TempDir::new().unwrap();
        let outside = elsewhere.path().join("plan.json");
        std::fs::write(&outside, "{}").unwrap();
        assert!(!git.dirties_worktree(&outside).await.unwrap());
    }

    #[tokio::test]
    async fn test_commit_as_sets_author_and_committer() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "1\n", "first");
        std::fs::write(repo.path().join("a.txt"), "2\n").unwrap();
        repo.git(&["add", "a.txt"]);

        let git = repository(&repo);
        let identity = CommitIdentity {
            name: AUTHOR_NAME.into(),
            email: AUTHOR_EMAIL.into(),
            date: DateTime::parse_from_rfc3339("2020-02-03T04:05:06+01:00").unwrap(),
        };
        let sha = git
            .commit_as("fix: keep #hash lines\n\n# not a comment", &identity)
            .await
            .unwrap();

        assert_eq!(sha, repo.head());
        let meta = repo.git(&["log", "-1", "--format=%an|%ae|%cn|%ce|%aI|%cI"]);
        assert_eq!(
            meta,
            "Ada Lovelace|ada@example.com|Ada Lovelace|ada@example.com|2020-02-03T04:05:06+01:00|2020-02-03T04:05:06+01:00"
        );
        let body = repo.git(&["log", "-1", "--format=%b"]);
        assert_eq!(body, "# not a comment");
    }

    #[tokio::test]
    async fn test_abort_falls_back_to_reset() {
        let fake = Arc::new(ScriptedGit::new().fail(
            &["cherry-pick", "--abort"],
            128,
            "error: no cherry-pick or revert in progress",
        ));
        let git = Repository::new(fake.clone());

        git.abort_cherry_pick().await.unwrap();

        assert!(fake.called(&["cherry-pick", "--abort"]));
        assert!(fake.called(&["reset", "-q", "--hard", "HEAD"]));
    }

    #[tokio::test]
    async fn test_merge_pick_uses_mainline() {
        let fake = Arc::new(ScriptedGit::new());
        let git = Repository::new(fake.clone());

        git.cherry_pick_no_commit("abc", Some(1)).await.unwrap();
        assert!(fake.called(&["cherry-pick", "--no-commit", "-m", "1", "abc"]));
    }
}
