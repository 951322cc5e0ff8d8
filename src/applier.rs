//! Apply phase: replay a plan onto a new branch with rewritten messages
//!
//! The replay is a small state machine. Each transition is one git step and
//! any failure stops the run where it stands; nothing is rolled back.
//!
//! ```text
//! Init -> BranchCreated -> Reset -> Replaying(0) -> ... -> Replaying(n) -> Done
//! ```

use crate::git::{GitError, Repository, short};
use crate::plan::{Plan, PlanItem};
use thiserror::Error;

/// Errors that stop an apply run
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("new branch name is required (--branch)")]
    MissingBranch,

    #[error("plan has no items")]
    EmptyPlan,

    #[error("worktree is not clean; commit or stash changes first")]
    DirtyWorktree,

    #[error("branch '{branch}' already exists; pick another name or delete it first")]
    BranchExists { branch: String },

    #[error("plan commit {sha} is not in this repository: {source}")]
    UnknownCommit {
        sha: String,
        #[source]
        source: GitError,
    },

    #[error("failed to create branch '{branch}': {source}")]
    BranchCreate {
        branch: String,
        #[source]
        source: GitError,
    },

    #[error("cannot resolve base {rev}: {source}")]
    BaseUnresolved {
        rev: String,
        #[source]
        source: GitError,
    },

    #[error("failed to reset to base {}: {source}", short(.base))]
    Reset {
        base: String,
        #[source]
        source: GitError,
    },

    #[error("merge commit detected ({}); rerun with --allow-merges (experimental)", short(.sha))]
    MergeEncountered { sha: String },

    #[error("cherry-pick failed at {}; resolve manually, then rerun: {source}", short(.sha))]
    ReplayConflict {
        sha: String,
        #[source]
        source: GitError,
    },

    #[error("failed to commit rewrite of {}: {source}", short(.sha))]
    Commit {
        sha: String,
        #[source]
        source: GitError,
    },

    #[error("git failed while replaying {}: {source}", short(.sha))]
    Replay {
        sha: String,
        #[source]
        source: GitError,
    },

    #[error(transparent)]
    Git(#[from] GitError),
}

impl ApplyError {
    /// Whether the run stopped after the new branch was created and checked out
    pub fn leaves_branch(&self) -> bool {
        matches!(
            self,
            ApplyError::BaseUnresolved { .. }
                | ApplyError::Reset { .. }
                | ApplyError::MergeEncountered { .. }
                | ApplyError::ReplayConflict { .. }
                | ApplyError::Commit { .. }
                | ApplyError::Replay { .. }
        )
    }
}

/// Inputs for one apply run
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Branch to create; must not exist yet
    pub branch: String,
    /// Replay merge commits against their first parent
    pub allow_merges: bool,
}

/// Position of a replay in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyState {
    Init,
    BranchCreated,
    Reset { base: String },
    Replaying { index: usize },
    Done,
}

/// What happened to one plan item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A new commit was written
    Rewritten { new_sha: String },
    /// The change was already present; no commit was made
    Collapsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub sha: String,
    pub outcome: ItemOutcome,
}

/// Result of a completed apply run
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub branch: String,
    /// Branch checked out before the run
    pub started_from: String,
    pub base: String,
    pub items: Vec<ItemReport>,
}

impl ApplyReport {
    /// Number of commits written to the new branch
    pub fn rewritten(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, ItemOutcome::Rewritten { .. }))
            .count()
    }

    /// Number of items that produced no commit
    pub fn collapsed(&self) -> usize {
        self.items.len() - self.rewritten()
    }
}

/// Replays plan items onto a fresh branch
pub struct Applier<'a> {
    repo: &'a Repository,
}

impl<'a> Applier<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Replay `plan` onto `options.branch`.
    ///
    /// Preconditions are checked before anything is written. After that the
    /// branch is created, reset to the plan base and each item is picked and
    /// committed with its new message and original author identity. The
    /// source branch is never touched.
    pub async fn apply(&self, plan: &Plan, options: &ApplyOptions) -> Result<ApplyReport, ApplyError> {
        self.check_preconditions(plan, options).await?;

        let mut report = ApplyReport {
            branch: options.branch.trim().to_string(),
            started_from: self.repo.current_branch().await?,
            base: String::new(),
            items: Vec::with_capacity(plan.items.len()),
        };

        let mut state = ApplyState::Init;
        loop {
            match self.step(&state, plan, options, &mut report).await {
                Ok(ApplyState::Done) => break,
                Ok(next) => state = next,
                Err(e) => {
                    tracing::error!(state = ?state, branch = %report.branch, "apply stopped: {e}");
                    return Err(e);
                }
            }
        }

        tracing::warn!(
            branch = %report.branch,
            "history rewritten; commit ids on this branch differ from '{}'",
            report.started_from
        );
        Ok(report)
    }

    async fn check_preconditions(&self, plan: &Plan, options: &ApplyOptions) -> Result<(), ApplyError> {
        let branch = options.branch.trim();
        if branch.is_empty() {
            return Err(ApplyError::MissingBranch);
        }
        if plan.items.is_empty() {
            return Err(ApplyError::EmptyPlan);
        }
        if !self.repo.is_clean().await? {
            return Err(ApplyError::DirtyWorktree);
        }
        if self.repo.branch_exists(branch).await? {
            return Err(ApplyError::BranchExists {
                branch: branch.to_string(),
            });
        }
        for item in &plan.items {
            self.repo
                .resolve_commit(&item.sha)
                .await
                .map_err(|source| ApplyError::UnknownCommit {
                    sha: item.sha.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn step(
        &self,
        state: &ApplyState,
        plan: &Plan,
        options: &ApplyOptions,
        report: &mut ApplyReport,
    ) -> Result<ApplyState, ApplyError> {
        match state {
            ApplyState::Init => {
                self.repo
                    .create_branch(&report.branch)
                    .await
                    .map_err(|source| ApplyError::BranchCreate {
                        branch: report.branch.clone(),
                        source,
                    })?;
                tracing::info!(branch = %report.branch, from = %report.started_from, "created branch");
                Ok(ApplyState::BranchCreated)
            }
            ApplyState::BranchCreated => {
                let base = self.effective_base(plan).await?;
                self.repo
                    .reset_hard(&base)
                    .await
                    .map_err(|source| ApplyError::Reset {
                        base: base.clone(),
                        source,
                    })?;
                tracing::info!(base = %short(&base), "reset to base");
                report.base = base.clone();
                Ok(ApplyState::Reset { base })
            }
            ApplyState::Reset { base } => {
                tracing::debug!(base = %short(base), items = plan.items.len(), "replaying");
                Ok(ApplyState::Replaying { index: 0 })
            }
            ApplyState::Replaying { index } => match plan.items.get(*index) {
                Some(item) => {
                    let outcome = self.replay(item, options.allow_merges).await?;
                    report.items.push(ItemReport {
                        sha: item.sha.clone(),
                        outcome,
                    });
                    Ok(ApplyState::Replaying { index: index + 1 })
                }
                None => Ok(ApplyState::Done),
            },
            ApplyState::Done => Ok(ApplyState::Done),
        }
    }

    /// The recorded base, or the live parent of the first item when the
    /// plan has none
    async fn effective_base(&self, plan: &Plan) -> Result<String, ApplyError> {
        let rev = match plan.recorded_base() {
            Some(base) => base.to_string(),
            None => {
                // checked non-empty before any transition
                let first = &plan.items[0].sha;
                format!("{first}^")
            }
        };

        let base = self
            .repo
            .resolve_commit(&rev)
            .await
            .map_err(|source| ApplyError::BaseUnresolved {
                rev: rev.clone(),
                source,
            })?;

        if plan.recorded_base().is_none() {
            tracing::warn!(
                base = %short(&base),
                "plan records no base; using the current parent of the first item, which may differ from planning time"
            );
        }
        Ok(base)
    }

    async fn replay(&self, item: &PlanItem, allow_merges: bool) -> Result<ItemOutcome, ApplyError> {
        let replay_err = |source| ApplyError::Replay {
            sha: item.sha.clone(),
            source,
        };

        let is_merge = self.repo.parent_count(&item.sha).await.map_err(replay_err)? > 1;
        if is_merge && !allow_merges {
            return Err(ApplyError::MergeEncountered {
                sha: item.sha.clone(),
            });
        }

        let mainline = is_merge.then_some(1);
        if let Err(source) = self.repo.cherry_pick_no_commit(&item.sha, mainline).await {
            if let Err(abort) = self.repo.abort_cherry_pick().await {
                tracing::warn!(sha = %short(&item.sha), "could not clean up failed pick: {abort}");
            }
            return Err(ApplyError::ReplayConflict {
                sha: item.sha.clone(),
                source,
            });
        }

        if self.repo.staged_paths().await.map_err(replay_err)?.is_empty() {
            self.repo.discard_staged().await.map_err(replay_err)?;
            tracing::info!(sha = %short(&item.sha), "skip: no changes after pick");
            return Ok(ItemOutcome::Collapsed);
        }

        let new_sha = self
            .repo
            .commit_as(item.effective_message(), &item.identity())
            .await
            .map_err(|source| ApplyError::Commit {
                sha: item.sha.clone(),
                source,
            })?;

        tracing::info!("rewritten: {} -> {}", short(&item.sha), short(&new_sha));
        Ok(ItemOutcome::Rewritten { new_sha })
    }
}
