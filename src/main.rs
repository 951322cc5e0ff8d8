mod applier;
mod cli;
mod config;
mod git;
mod logging;
mod plan;
mod planner;
mod sanitize;
mod suggest;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{ApplyArgs, OutputEvent, OutputHandler, OutputMode, PlanArgs};
use git::{GitCli, Repository};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "git-smartmsg")]
#[command(about = "Rewrite commit messages from their diffs, on a new branch")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository directory (defaults to current)
    #[arg(short = 'C', long, global = true)]
    dir: Option<PathBuf>,

    /// Output mode: console, json or quiet
    #[arg(long, global = true, default_value = "console")]
    output: String,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new commit messages for a range and write a plan
    Plan {
        /// Number of commits back from HEAD
        #[arg(long)]
        limit: Option<usize>,

        /// Explicit range, e.g. <base>..<head>; overrides --limit
        #[arg(long)]
        range: Option<String>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,

        /// Include merge commits (not recommended)
        #[arg(long)]
        allow_merges: bool,

        /// Plan file to write
        #[arg(long)]
        out: Option<String>,

        /// Per-commit deadline, e.g. 25s or 2m
        #[arg(long)]
        timeout: Option<String>,
    },

    /// Replay a plan onto a new branch as rewritten linear history
    Apply {
        /// Plan file to read
        #[arg(long = "in")]
        input: Option<String>,

        /// New branch to create
        #[arg(long)]
        branch: String,

        /// Replay merge commits against their first parent (best effort)
        #[arg(long)]
        allow_merges: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mode = if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::from_str(&cli.output)
    };
    let handler = cli::create_handler(mode);

    if let Err(e) = logging::init_logging(cli.debug, cli.quiet, cli.log_file.clone()) {
        eprintln!("failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli, handler.as_ref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            handler.emit(OutputEvent::Error {
                error: format!("{e:#}"),
            });
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, handler: &dyn OutputHandler) -> Result<()> {
    let working_dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let repo = Repository::new(Arc::new(GitCli::new(&working_dir)));
    let toplevel = repo
        .toplevel()
        .await
        .with_context(|| format!("{} is not inside a git repository", working_dir.display()))?;
    let config = config::SmartmsgConfig::load(Some(Path::new(&toplevel)))?;

    match cli.command {
        Commands::Plan {
            limit,
            range,
            model,
            allow_merges,
            out,
            timeout,
        } => {
            let args = PlanArgs {
                limit,
                range,
                model,
                allow_merges,
                out,
                timeout,
            };
            cli::plan_command(&repo, &working_dir, &config, args, handler).await
        }

        Commands::Apply {
            input,
            branch,
            allow_merges,
        } => {
            let args = ApplyArgs {
                input,
                branch,
                allow_merges,
            };
            cli::apply_command(&repo, &working_dir, &config, args, handler).await
        }
    }
}
