//! Plan and plan item types

use crate::git::{CommitIdentity, CommitRecord};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One commit to rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    /// Source commit id
    pub sha: String,

    /// Original subject line
    pub old_message: String,

    /// Replacement message; blank falls back to `old_message`
    #[serde(default)]
    pub new_message: String,

    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<FixedOffset>,
}

impl PlanItem {
    /// Build an item for `commit` with a replacement message
    pub fn from_commit(commit: &CommitRecord, new_message: impl Into<String>) -> Self {
        Self {
            sha: commit.sha.clone(),
            old_message: commit.subject.clone(),
            new_message: new_message.into(),
            author_name: commit.author_name.clone(),
            author_email: commit.author_email.clone(),
            author_date: commit.author_date,
        }
    }

    /// Message to commit with
    pub fn effective_message(&self) -> &str {
        if self.new_message.trim().is_empty() {
            &self.old_message
        } else {
            &self.new_message
        }
    }

    /// Identity the rewritten commit is attributed to
    pub fn identity(&self) -> CommitIdentity {
        CommitIdentity {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
            date: self.author_date,
        }
    }
}

/// A complete message rewrite for a commit range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Working tree root the plan was made in
    pub repo_path: String,

    /// Exclusive lower bound; empty means derive from the first item's parent
    #[serde(default)]
    pub base: String,

    /// Inclusive upper bound
    pub head: String,

    pub created_at: DateTime<FixedOffset>,

    /// Suggestion model that produced the messages
    pub model: String,

    #[serde(default)]
    pub allow_merges: bool,

    /// Oldest first
    pub items: Vec<PlanItem>,
}

impl Plan {
    /// Recorded base, if any
    pub fn recorded_base(&self) -> Option<&str> {
        let base = self.base.trim();
        (!base.is_empty()).then_some(base)
    }
}
