//! Per-commit diff extraction

use super::{GitError, Repository};

/// Default number of characters of diff sent to the suggestion service
pub const DIFF_CHAR_BUDGET: usize = 40_000;

/// Appended when a diff is cut at the budget
pub const TRUNCATION_MARKER: &str = "\n...[truncated]...";

/// Unified diff of `sha` against its first parent, cut to `budget` characters
pub async fn commit_diff(repo: &Repository, sha: &str, budget: usize) -> Result<String, GitError> {
    let patch = repo.show_patch(sha).await?;
    Ok(truncate_chars(&patch, budget))
}

/// Keep the first `max` characters of `s`, marking the cut
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], TRUNCATION_MARKER),
        None => s.to_string(),
    }
}
