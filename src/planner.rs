//! Planning phase: commit range in, persisted plan out

use crate::config::ConfigError;
use crate::git::{
    GitError, RangeError, RangeSpec, Repository, commit_diff, list_commits, resolve_range, short,
};
use crate::plan::{self, Plan, PlanItem, StoreError};
use crate::sanitize::sanitize_message;
use crate::suggest::{MessageSuggester, SuggestError, suggest_with_deadline};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a planning run. Nothing is written when one occurs.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("failed to read diff of {sha}: {source}")]
    Diff {
        sha: String,
        #[source]
        source: GitError,
    },

    #[error("suggestion failed for {sha}: {source}")]
    Suggestion {
        sha: String,
        #[source]
        source: SuggestError,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Inputs for one planning run
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub range: RangeSpec,
    pub model: String,
    pub allow_merges: bool,
    /// Deadline for each suggestion call
    pub timeout: Duration,
    pub diff_char_budget: usize,
    pub output: PathBuf,
}

/// Result of a completed planning run
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub plan: Plan,
    /// Merge commits left out of the plan
    pub skipped_merges: Vec<String>,
    pub output: PathBuf,
}

/// Walks a range once, oldest first, asking for a message per commit
pub struct Planner<'a> {
    repo: &'a Repository,
}

impl<'a> Planner<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Plan `options.range` and write the plan to `options.output`.
    ///
    /// `connect` builds the suggestion client once the range is known to be
    /// non-empty. The first failed suggestion aborts the run.
    pub async fn run<F>(&self, options: &PlanOptions, connect: F) -> Result<PlanReport, PlanError>
    where
        F: FnOnce() -> Result<Box<dyn MessageSuggester>, ConfigError>,
    {
        let range = resolve_range(self.repo, &options.range).await?;
        let commits = list_commits(self.repo, &range).await?;
        tracing::info!(range = %range.expression(), commits = commits.len(), "planning");

        let suggester = connect()?;

        let mut items = Vec::with_capacity(commits.len());
        let mut skipped_merges = Vec::new();

        for commit in &commits {
            if commit.is_merge && !options.allow_merges {
                tracing::info!(sha = %short(&commit.sha), "skip merge commit");
                skipped_merges.push(commit.sha.clone());
                continue;
            }

            let diff = commit_diff(self.repo, &commit.sha, options.diff_char_budget)
                .await
                .map_err(|source| PlanError::Diff {
                    sha: commit.sha.clone(),
                    source,
                })?;

            let suggestion = suggest_with_deadline(
                suggester.as_ref(),
                &options.model,
                &diff,
                &commit.subject,
                options.timeout,
            )
            .await
            .map_err(|source| PlanError::Suggestion {
                sha: commit.sha.clone(),
                source,
            })?;

            let message = sanitize_message(&suggestion);
            tracing::info!(
                "planned: {}  {}  ->  {}",
                short(&commit.sha),
                clip(&commit.subject, 60),
                clip(first_line(&message), 60)
            );
            items.push(PlanItem::from_commit(commit, message));
        }

        let plan = Plan {
            repo_path: self.repo.toplevel().await?,
            base: range.base,
            head: range.head,
            created_at: chrono::Local::now().fixed_offset(),
            model: options.model.clone(),
            allow_merges: options.allow_merges,
            items,
        };

        plan::save(&plan, &options.output)?;

        Ok(PlanReport {
            plan,
            skipped_merges,
            output: options.output.clone(),
        })
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

fn clip(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
