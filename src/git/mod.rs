//! Git command boundary
//!
//! Every repository read and write goes through [`GitRunner`], a narrow
//! `run(args) -> output | error` seam. [`GitCli`] shells out to the `git`
//! binary; tests substitute a scripted fake.

mod diff;
mod log;
mod repo;

#[cfg(test)]
pub use diff::TRUNCATION_MARKER;
pub use diff::{DIFF_CHAR_BUDGET, commit_diff};
pub(crate) use log::short;
pub use log::{CommitRecord, RangeError, RangeSpec, ResolvedRange, list_commits, resolve_range};
pub use repo::{CommitIdentity, Repository};

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

/// Failure of a single git invocation
#[derive(Debug, Clone, Error)]
pub enum GitError {
    /// The git process could not be started
    #[error("failed to run `git {args}`: {message}")]
    Spawn { args: String, message: String },

    /// git exited non-zero; stderr is kept verbatim
    #[error("`git {args}` failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        args: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl GitError {
    /// Create a failure for the given invocation
    pub fn failed(args: &[&str], exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            args: args.join(" "),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Exit code of a failed invocation, if git ran at all
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            GitError::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Executes git subcommands against one working tree.
///
/// Calls are sequential and never retried; a failure is returned to the
/// caller as-is.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` with extra environment variables, returning stdout
    async fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Result<String, GitError>;

    /// Run `git <args>`, returning stdout
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        self.run_with_env(args, &[]).await
    }
}

/// [`GitRunner`] backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    working_dir: PathBuf,
}

impl GitCli {
    /// Create a runner rooted at `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl GitRunner for GitCli {
    async fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Result<String, GitError> {
        tracing::debug!(args = %args.join(" "), "git");

        let output = Command::new("git")
            .args(args)
            .envs(env.iter().copied())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GitError::Spawn {
                args: args.join(" "),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::failed(
                args,
                exit_status_code(&output.status),
                stderr.trim_end(),
            ));
        }

        // File contents and author names are not guaranteed to be UTF-8
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn exit_status_code_parts(code: Option<i32>, _signal: Option<i32>) -> Option<i32> {
    if let Some(code) = code {
        return Some(code);
    }
    #[cfg(unix)]
    {
        if let Some(signal) = _signal {
            return Some(128 + signal);
        }
    }
    None
}

/// Exit code of a finished process, using 128+signal for signal-terminated processes on Unix.
fn exit_status_code(status: &std::process::ExitStatus) -> Option<i32> {
    let code = status.code();
    #[cfg(unix)]
    let signal = status.signal();
    #[cfg(not(unix))]
    let signal = None;
    exit_status_code_parts(code, signal)
}
