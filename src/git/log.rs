//! Commit range resolution and enumeration

use super::{GitError, Repository};
use chrono::{DateTime, FixedOffset};
use thiserror::Error;

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// sha, subject, author name, author email, strict ISO author date, parents
const LOG_FORMAT: &str = "%H%x1f%s%x1f%an%x1f%ae%x1f%aI%x1f%P%x1e";

/// Errors resolving or enumerating a commit range
#[derive(Debug, Error)]
pub enum RangeError {
    #[error("cannot parse range '{expr}': expected <base>..<head>")]
    Unparsable { expr: String },

    #[error("cannot resolve '{rev}': {source}")]
    Unresolvable {
        rev: String,
        #[source]
        source: GitError,
    },

    #[error("base {base} is not an ancestor of head {head}")]
    NotAncestor { base: String, head: String },

    #[error("no commits in range {range}")]
    Empty { range: String },

    #[error("malformed log record: {record:?}")]
    MalformedRecord { record: String },

    #[error(transparent)]
    Git(#[from] GitError),
}

/// How the caller selects commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// The last `n` commits reachable from the current tip
    Last(usize),
    /// An explicit `<base>..<head>` expression
    Explicit(String),
}

/// A range with both endpoints resolved to commit ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Exclusive lower bound
    pub base: String,
    /// Inclusive upper bound
    pub head: String,
}

impl ResolvedRange {
    /// The `base..head` expression git understands
    pub fn expression(&self) -> String {
        format!("{}..{}", self.base, self.head)
    }
}

/// A commit as read from the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub sha: String,
    pub subject: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<FixedOffset>,
    pub is_merge: bool,
}

/// Resolve `spec` against the repository.
///
/// For [`RangeSpec::Last`], a tip with fewer than `n` ancestors falls back to
/// the root commit as base.
pub async fn resolve_range(repo: &Repository, spec: &RangeSpec) -> Result<ResolvedRange, RangeError> {
    match spec {
        RangeSpec::Last(n) => {
            let head = resolve(repo, "HEAD").await?;
            let base = match repo.nth_ancestor(&head, *n).await {
                Ok(base) => base,
                Err(e) => {
                    tracing::debug!(error = %e, limit = n, "history shorter than limit");
                    let root = repo.root_commit(&head).await.map_err(|source| {
                        RangeError::Unresolvable {
                            rev: format!("{head}~{n}"),
                            source,
                        }
                    })?;
                    tracing::info!(base = %short(&root), "fewer than {} ancestors, using root commit as base", n);
                    root
                }
            };
            Ok(ResolvedRange { base, head })
        }
        RangeSpec::Explicit(expr) => {
            let (base_rev, head_rev) = parse_range_expression(expr)?;
            let base = resolve(repo, base_rev).await?;
            let head = resolve(repo, head_rev).await?;
            if !repo.is_ancestor(&base, &head).await? {
                return Err(RangeError::NotAncestor { base, head });
            }
            Ok(ResolvedRange { base, head })
        }
    }
}

async fn resolve(repo: &Repository, rev: &str) -> Result<String, RangeError> {
    repo.resolve_commit(rev)
        .await
        .map_err(|source| RangeError::Unresolvable {
            rev: rev.to_string(),
            source,
        })
}

/// Split `<base>..<head>` into its endpoints; an empty head means `HEAD`
fn parse_range_expression(expr: &str) -> Result<(&str, &str), RangeError> {
    let unparsable = || RangeError::Unparsable {
        expr: expr.to_string(),
    };

    let trimmed = expr.trim();
    if trimmed.contains("...") {
        return Err(unparsable());
    }
    let (base, head) = trimmed.split_once("..").ok_or_else(unparsable)?;
    let (base, head) = (base.trim(), head.trim());
    if base.is_empty() || head.contains("..") {
        return Err(unparsable());
    }

    Ok((base, if head.is_empty() { "HEAD" } else { head }))
}

/// Commits in `range`, oldest first. An empty range is an error.
pub async fn list_commits(repo: &Repository, range: &ResolvedRange) -> Result<Vec<CommitRecord>, RangeError> {
    let expression = range.expression();
    let out = repo.log_reverse(&expression, LOG_FORMAT).await?;
    let commits = parse_log(&out)?;

    if commits.is_empty() {
        return Err(RangeError::Empty { range: expression });
    }
    Ok(commits)
}

fn parse_log(out: &str) -> Result<Vec<CommitRecord>, RangeError> {
    let mut commits = Vec::new();

    for record in out.split(RECORD_SEP) {
        let record = record.trim_matches(|c| c == '\n' || c == '\r');
        if record.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.split(FIELD_SEP).collect();
        let malformed = || RangeError::MalformedRecord {
            record: record.to_string(),
        };
        if fields.len() < 6 {
            return Err(malformed());
        }

        let author_date = DateTime::parse_from_rfc3339(fields[4].trim()).map_err(|_| malformed())?;

        commits.push(CommitRecord {
            sha: fields[0].trim().to_string(),
            subject: fields[1].to_string(),
            author_name: fields[2].to_string(),
            author_email: fields[3].to_string(),
            author_date,
            is_merge: fields[5].split_whitespace().count() > 1,
        });
    }

    Ok(commits)
}

/// Abbreviated commit id for display
pub(crate) fn short(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitCli;
    use crate::test_support::{AUTHOR_DATE, AUTHOR_EMAIL, AUTHOR_NAME, TestRepo};
    use std::sync::Arc;

    fn repository(repo: &TestRepo) -> Repository {
        Repository::new(Arc::new(GitCli::new(repo.path())))
    }

    #[test]
    fn test_parse_range_expression() {
        assert_eq!(parse_range_expression("a..b").unwrap(), ("a", "b"));
        assert_eq!(parse_range_expression(" v1.0.. ").unwrap(), ("v1.0", "HEAD"));
        assert!(parse_range_expression("a...b").is_err());
        assert!(parse_range_expression("..b").is_err());
        assert!(parse_range_expression("main").is_err());
        assert!(parse_range_expression("a..b..c").is_err());
    }

    #[test]
    fn test_parse_log_records() {
        let out = "aaa\x1ffeat: one\x1fAda\x1fada@example.com\x1f2021-03-04T05:06:07+02:00\x1fppp\x1e\n\
                   bbb\x1fmerge it\x1fAda\x1fada@example.com\x1f2021-03-05T05:06:07+02:00\x1fppp qqq\x1e\n";
        let commits = parse_log(out).unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "aaa");
        assert_eq!(commits[0].subject, "feat: one");
        assert!(!commits[0].is_merge);
        assert!(commits[1].is_merge);
        assert_eq!(commits[1].author_date.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_parse_log_rejects_truncated_record() {
        let err = parse_log("aaa\x1fsubject\x1e").unwrap_err();
        assert!(matches!(err, RangeError::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_last_n_is_oldest_first() {
        let repo = TestRepo::new();
        let root = repo.commit_file("a.txt", "0\n", "root");
        let c1 = repo.commit_file("a.txt", "1\n", "one");
        let c2 = repo.commit_file("a.txt", "2\n", "two");
        let c3 = repo.commit_file("a.txt", "3\n", "three");
        let git = repository(&repo);

        let range = resolve_range(&git, &RangeSpec::Last(2)).await.unwrap();
        assert_eq!(range.base, c1);
        assert_eq!(range.head, c3);

        let commits = list_commits(&git, &range).await.unwrap();
        let shas: Vec<_> = commits.iter().map(|c| c.sha.clone()).collect();
        assert_eq!(shas, vec![c2, c3]);

        let all = resolve_range(&git, &RangeSpec::Last(3)).await.unwrap();
        assert_eq!(all.base, root);
        let subjects: Vec<_> = list_commits(&git, &all)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.subject)
            .collect();
        assert_eq!(subjects, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_short_history_falls_back_to_root() {
        let repo = TestRepo::new();
        let root = repo.commit_file("a.txt", "0\n", "root");
        repo.commit_file("a.txt", "1\n", "one");
        let git = repository(&repo);

        let range = resolve_range(&git, &RangeSpec::Last(20)).await.unwrap();
        assert_eq!(range.base, root);

        let commits = list_commits(&git, &range).await.unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].author_name, AUTHOR_NAME);
        assert_eq!(commits[0].author_email, AUTHOR_EMAIL);
        assert_eq!(commits[0].author_date.to_rfc3339(), AUTHOR_DATE);
    }

    #[tokio::test]
    async fn test_explicit_range() {
        let repo = TestRepo::new();
        let root = repo.commit_file("a.txt", "0\n", "root");
        let c1 = repo.commit_file("a.txt", "1\n", "one");
        repo.commit_file("a.txt", "2\n", "two");
        let git = repository(&repo);

        let expr = format!("{root}..{c1}");
        let range = resolve_range(&git, &RangeSpec::Explicit(expr)).await.unwrap();
        assert_eq!(range, ResolvedRange { base: root.clone(), head: c1.clone() });

        let backwards = RangeSpec::Explicit(format!("{c1}..{root}"));
        let err = resolve_range(&git, &backwards).await.unwrap_err();
        assert!(matches!(err, RangeError::NotAncestor { .. }));

        let unknown = RangeSpec::Explicit("nope..HEAD".into());
        let err = resolve_range(&git, &unknown).await.unwrap_err();
        assert!(matches!(err, RangeError::Unresolvable { ref rev, .. } if rev == "nope"));
    }

    #[tokio::test]
    async fn test_empty_range_is_error() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "0\n", "root");
        let git = repository(&repo);

        let range = resolve_range(&git, &RangeSpec::Last(0)).await.unwrap();
        let err = list_commits(&git, &range).await.unwrap_err();
        assert!(matches!(err, RangeError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_merge_commits_are_flagged() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "0\n", "root");
        let trunk = repo.current_branch();
        repo.git(&["checkout", "-q", "-b", "side"]);
        repo.commit_file("b.txt", "side\n", "side work");
        repo.git(&["checkout", "-q", &trunk]);
        repo.commit_file("c.txt", "main\n", "main work");
        repo.merge("side", "merge side");
        let git = repository(&repo);

        let range = resolve_range(&git, &RangeSpec::Last(1)).await.unwrap();
        let commits = list_commits(&git, &ResolvedRange {
            base: repo.git(&["rev-list", "--max-parents=0", "HEAD"]),
            head: range.head,
        })
        .await
        .unwrap();

        assert_eq!(commits.len(), 3);
        assert_eq!(commits.last().unwrap().subject, "merge side");
        assert!(commits.last().unwrap().is_merge);
        assert!(commits[..2].iter().all(|c| !c.is_merge));
    }
}
