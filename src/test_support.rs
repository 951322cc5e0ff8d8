//! Shared fixtures for unit tests: throwaway git repositories and a scripted runner

use crate::git::{GitError, GitRunner};
use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use tempfile::TempDir;

pub const AUTHOR_NAME: &str = "Ada Lovelace";
pub const AUTHOR_EMAIL: &str = "ada@example.com";
pub const AUTHOR_DATE: &str = "2021-03-04T05:06:07+02:00";

/// A git repository in a temporary directory, driven through the real `git` binary
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let repo = Self {
            dir: TempDir::new().unwrap(),
        };
        repo.git(&["init", "-q"]);
        repo.git(&["config", "user.name", "Current Operator"]);
        repo.git(&["config", "user.email", "operator@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("failed to run git");
        if !output.status.success() {
            panic!(
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    fn git_as_author(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .env("GIT_AUTHOR_NAME", AUTHOR_NAME)
            .env("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL)
            .env("GIT_AUTHOR_DATE", AUTHOR_DATE)
            .output()
            .expect("failed to run git");
        if !output.status.success() {
            panic!(
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        self.head()
    }

    /// Write `content` to `file` and commit it; returns the new commit id
    pub fn commit_file(&self, file: &str, content: &str, message: &str) -> String {
        self.commit_bytes(file, content.as_bytes(), message)
    }

    /// Like [`TestRepo::commit_file`] for content that need not be UTF-8
    pub fn commit_bytes(&self, file: &str, content: &[u8], message: &str) -> String {
        let path = self.path().join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        self.git(&["add", "--", file]);
        self.git_as_author(&["commit", "-q", "-m", message])
    }

    /// Commit with no tree change
    pub fn commit_empty(&self, message: &str) -> String {
        self.git_as_author(&["commit", "-q", "--allow-empty", "-m", message])
    }

    /// Merge `branch` into the current branch with a merge commit
    pub fn merge(&self, branch: &str, message: &str) -> String {
        self.git_as_author(&["merge", "-q", "--no-ff", "-m", message, branch])
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn current_branch(&self) -> String {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn tree(&self, rev: &str) -> String {
        self.git(&["rev-parse", &format!("{rev}^{{tree}}")])
    }

    pub fn count(&self, range: &str) -> usize {
        self.git(&["rev-list", "--count", range]).parse().unwrap()
    }

    /// Subjects of `range`, oldest first
    pub fn subjects(&self, range: &str) -> Vec<String> {
        let out = self.git(&["log", "--reverse", "--format=%s", range]);
        out.lines().map(String::from).collect()
    }
}

/// [`GitRunner`] fake that answers by argument prefix and records every call
pub struct ScriptedGit {
    rules: Vec<(Vec<String>, Result<String, GitError>)>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer invocations starting with `prefix` with `stdout`
    pub fn ok(mut self, prefix: &[&str], stdout: &str) -> Self {
        self.rules.push((to_owned(prefix), Ok(stdout.to_string())));
        self
    }

    /// Fail invocations starting with `prefix`
    pub fn fail(mut self, prefix: &[&str], exit_code: i32, stderr: &str) -> Self {
        let err = GitError::failed(prefix, Some(exit_code), stderr);
        self.rules.push((to_owned(prefix), Err(err)));
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether any recorded call starts with `prefix`
    pub fn called(&self, prefix: &[&str]) -> bool {
        self.calls()
            .iter()
            .any(|call| call.len() >= prefix.len() && call.iter().zip(prefix).all(|(a, b)| a == b))
    }
}

fn to_owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl GitRunner for ScriptedGit {
    async fn run_with_env(&self, args: &[&str], _env: &[(&str, &str)]) -> Result<String, GitError> {
        self.calls.lock().unwrap().push(to_owned(args));

        for (prefix, response) in &self.rules {
            if args.len() >= prefix.len() && prefix.iter().zip(args).all(|(p, a)| p == a) {
                return response.clone();
            }
        }
        Ok(String::new())
    }
}
