//! Output handlers for CLI commands
//!
//! Supports console (human), JSON and quiet output modes.

use serde::{Deserialize, Serialize};

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Parse from string
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "quiet" => Self::Quiet,
            _ => Self::Console,
        }
    }
}

/// Outcome of one replayed commit, as reported to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub sha: String,
    /// `None` when the commit collapsed into nothing
    pub new_sha: Option<String>,
}

/// Results emitted by `plan` and `apply`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    PlanWritten {
        path: String,
        model: String,
        items: usize,
        skipped_merges: Vec<String>,
        /// The plan file itself leaves the worktree unclean, which blocks `apply`
        dirties_worktree: bool,
    },
    ApplyComplete {
        branch: String,
        started_from: String,
        base: String,
        rewritten: usize,
        collapsed: usize,
        commits: Vec<CommitOutcome>,
    },
    Error {
        error: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);
}

/// Human-readable output
pub struct ConsoleHandler;

impl ConsoleHandler {
    fn render(event: &OutputEvent) -> String {
        match event {
            OutputEvent::PlanWritten {
                path,
                items,
                skipped_merges,
                dirties_worktree,
                ..
            } => {
                let mut out = format!("Wrote {path} ({items} messages)");
                if !skipped_merges.is_empty() {
                    out.push_str(&format!(
                        "\nSkipped {} merge commit(s); rerun with --allow-merges to include them",
                        skipped_merges.len()
                    ));
                }
                if *dirties_worktree {
                    out.push_str(&format!(
                        "\nNote: {path} is untracked in this worktree and apply needs a clean tree; \
                         move it elsewhere or add it to .gitignore first"
                    ));
                }
                out
            }
            OutputEvent::ApplyComplete {
                branch,
                started_from,
                base,
                rewritten,
                collapsed,
                ..
            } => {
                let base = base.get(..7).unwrap_or(base);
                format!(
                    "\n✅ Done. New branch \"{branch}\" contains rewritten history.\n   \
                     {rewritten} rewritten, {collapsed} collapsed (base {base}, started from {started_from})\n\
                     ⚠️  Rewriting history rewrites SHAs. Coordinate with your team before force-pushing:\n   \
                     git push --force-with-lease origin {branch}"
                )
            }
            OutputEvent::Error { error } => format!("Error: {error}"),
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::Error { .. } => eprintln!("{}", Self::render(&event)),
            _ => println!("{}", Self::render(&event)),
        }
    }
}

/// One JSON object per line
pub struct JsonHandler;

impl JsonHandler {
    fn render(event: &OutputEvent) -> Option<String> {
        serde_json::to_string(event).ok()
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        if let Some(line) = Self::render(&event) {
            println!("{line}");
        }
    }
}

/// Reports errors only
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        if let OutputEvent::Error { error } = event {
            eprintln!("Error: {error}");
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler),
        OutputMode::Json => Box::new(JsonHandler),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}
