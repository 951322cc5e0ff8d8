//! Normalization of suggested commit messages

use regex::Regex;
use std::sync::LazyLock;

/// Used when a suggestion has no usable summary line
pub const FALLBACK_MESSAGE: &str = "chore: update";

static BRACKETED_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(feat|fix|docs|style|refactor|perf|test|chore)\]\s*:").expect("valid regex")
});

/// Reformat a suggestion into `summary[\n\nbody]`.
///
/// The summary is the first line with content once leading `#` and
/// whitespace are dropped and `[type]:` becomes `type:`. Remaining non-blank
/// lines form the body. Nothing is truncated.
pub fn sanitize_message(raw: &str) -> String {
    let mut summary: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in raw.lines() {
        match summary {
            None => {
                let cleaned = clean_summary(line);
                if !cleaned.is_empty() {
                    summary = Some(cleaned);
                }
            }
            Some(_) => {
                let line = line.trim_end();
                if !line.trim_start().is_empty() {
                    body.push(line);
                }
            }
        }
    }

    let Some(summary) = summary else {
        return FALLBACK_MESSAGE.to_string();
    };

    if body.is_empty() {
        summary
    } else {
        format!("{}\n\n{}", summary, body.join("\n"))
    }
}

fn clean_summary(line: &str) -> String {
    let stripped = line.trim_start_matches(|c: char| c == '#' || c.is_whitespace());
    BRACKETED_TYPE
        .replace(stripped, "$1:")
        .trim_end()
        .to_string()
}
