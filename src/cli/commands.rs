//! CLI command implementations

use super::output::{CommitOutcome, OutputEvent, OutputHandler};
use crate::applier::{Applier, ApplyOptions, ItemOutcome};
use crate::config::SmartmsgConfig;
use crate::git::{RangeSpec, Repository};
use crate::plan;
use crate::planner::{PlanOptions, Planner};
use crate::suggest::create_suggester;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Flags given to `plan`; unset values fall back to configuration
#[derive(Debug, Clone, Default)]
pub struct PlanArgs {
    pub limit: Option<usize>,
    pub range: Option<String>,
    pub model: Option<String>,
    pub allow_merges: bool,
    pub out: Option<String>,
    pub timeout: Option<String>,
}

/// Flags given to `apply`
#[derive(Debug, Clone, Default)]
pub struct ApplyArgs {
    pub input: Option<String>,
    pub branch: String,
    pub allow_merges: bool,
}

/// Generate a plan and write it to disk
pub async fn plan_command(
    repo: &Repository,
    working_dir: &Path,
    config: &SmartmsgConfig,
    args: PlanArgs,
    handler: &dyn OutputHandler,
) -> Result<()> {
    let options = plan_options(working_dir, config, args)?;

    let report = Planner::new(repo)
        .run(&options, || create_suggester(&config.suggest))
        .await
        .context("plan failed")?;

    let dirties_worktree = repo
        .dirties_worktree(&report.output)
        .await
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "could not check plan file status");
            false
        });

    handler.emit(OutputEvent::PlanWritten {
        path: report.output.display().to_string(),
        model: report.plan.model.clone(),
        items: report.plan.items.len(),
        skipped_merges: report.skipped_merges,
        dirties_worktree,
    });
    Ok(())
}

/// Replay a stored plan onto a new branch
pub async fn apply_command(
    repo: &Repository,
    working_dir: &Path,
    config: &SmartmsgConfig,
    args: ApplyArgs,
    handler: &dyn OutputHandler,
) -> Result<()> {
    let input = args.input.as_deref().unwrap_or(&config.plan.output);
    let path = expand_path(input, working_dir);
    let plan = plan::load(&path)?;

    let toplevel = repo.toplevel().await?;
    if Path::new(&plan.repo_path) != Path::new(&toplevel) {
        tracing::warn!(
            planned_in = %plan.repo_path,
            current = %toplevel,
            "plan was made in a different working tree"
        );
    }

    let options = ApplyOptions {
        branch: args.branch,
        allow_merges: args.allow_merges,
    };
    let report = match Applier::new(repo).apply(&plan, &options).await {
        Ok(report) => report,
        Err(e) if e.leaves_branch() => {
            let branch = options.branch.trim();
            return Err(anyhow::Error::new(e).context(format!(
                "apply failed; branch '{branch}' is checked out and partially rewritten"
            )));
        }
        Err(e) => return Err(anyhow::Error::new(e).context("apply failed")),
    };

    handler.emit(OutputEvent::ApplyComplete {
        rewritten: report.rewritten(),
        collapsed: report.collapsed(),
        commits: report
            .items
            .iter()
            .map(|item| CommitOutcome {
                sha: item.sha.clone(),
                new_sha: match &item.outcome {
                    ItemOutcome::Rewritten { new_sha } => Some(new_sha.clone()),
                    ItemOutcome::Collapsed => None,
                },
            })
            .collect(),
        branch: report.branch,
        started_from: report.started_from,
        base: report.base,
    });
    Ok(())
}

/// Layer `plan` flags over configuration
fn plan_options(working_dir: &Path, config: &SmartmsgConfig, args: PlanArgs) -> Result<PlanOptions> {
    let range = match args.range.as_deref().map(str::trim) {
        Some(expr) if !expr.is_empty() => RangeSpec::Explicit(expr.to_string()),
        _ => RangeSpec::Last(args.limit.unwrap_or(config.plan.limit)),
    };

    let timeout = match args.timeout.as_deref() {
        Some(raw) => parse_duration(raw)?,
        None => config.suggest.timeout(),
    };
    if timeout.is_zero() {
        bail!("--timeout must be greater than zero");
    }

    let out = args.out.as_deref().unwrap_or(&config.plan.output);

    Ok(PlanOptions {
        range,
        model: args.model.unwrap_or_else(|| config.suggest.model.clone()),
        allow_merges: args.allow_merges,
        timeout,
        diff_char_budget: config.suggest.diff_char_budget,
        output: expand_path(out, working_dir),
    })
}

/// Expand `~` and resolve relative paths against `working_dir`
pub fn expand_path(raw: &str, working_dir: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
    if expanded.is_absolute() {
        expanded
    } else {
        working_dir.join(expanded)
    }
}

/// Parse `25s`, `2m`, `500ms`, `1h` or a bare number of seconds
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: u64 = digits
        .parse()
        .with_context(|| format!("invalid duration '{raw}'"))?;

    let scale = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => bail!("invalid duration '{raw}': unknown unit '{other}'"),
    };
    match value.checked_mul(scale) {
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => bail!("invalid duration '{raw}': too large"),
    }
}
