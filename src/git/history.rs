//! Commit lookup and log walking.
//!
//! Commits are read with a single `git log -1` call using a NUL separated
//! format, then memoized by full id. Logs are listed with
//! `--pretty=format:%H` and every line is resolved through `get_commit`,
//! so a warm cache turns a log listing into one subprocess call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::error::{GitError, Result};
use crate::git::command::GitCommand;
use crate::git::repository::Repository;
use crate::models::{Commit, Signature};

pub const PRETTY_LOG_FORMAT: &str = "--pretty=format:%H";

const COMMIT_FORMAT: &str = "--format=%H%x00%T%x00%P%x00%an%x00%ae%x00%at%x00%cn%x00%ce%x00%ct%x00%B";
const COMMIT_FIELDS: usize = 10;

/// Options for `Repository::log`.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub max_count: Option<usize>,
    pub skip: Option<usize>,
    /// Only list commits touching this path.
    pub path: Option<String>,
}

/// Whether `id` is a complete SHA-1 or SHA-256 hex object id.
pub fn is_full_id(id: &str) -> bool {
    matches!(id.len(), 40 | 64) && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Turn a failed git run into "object not found", keeping timeouts and
/// spawn failures as they are.
fn not_found_on_failure(err: GitError, kind: &'static str, id: &str) -> GitError {
    match err {
        GitError::CommandFailed { .. } => GitError::ObjectNotFound {
            kind,
            id: id.to_string(),
        },
        other => other,
    }
}

pub(crate) fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|_| GitError::Parse(format!("invalid {} timestamp '{}'", field, raw)))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| GitError::Parse(format!("{} timestamp out of range: {}", field, secs)))
}

fn parse_commit_record(record: &str) -> Result<Commit> {
    let fields: Vec<&str> = record.splitn(COMMIT_FIELDS, '\0').collect();
    let [id, tree, parents, an, ae, at, cn, ce, ct, message] = fields[..] else {
        return Err(GitError::Parse(format!(
            "expected {} commit fields, got {}",
            COMMIT_FIELDS,
            fields.len()
        )));
    };

    if !is_full_id(id) {
        return Err(GitError::Parse(format!("invalid commit id '{}'", id)));
    }

    Ok(Commit {
        id: id.to_string(),
        tree_id: tree.to_string(),
        parents: parents.split_whitespace().map(str::to_string).collect(),
        author: Signature {
            name: an.to_string(),
            email: ae.to_string(),
            when: parse_timestamp(at, "author")?,
        },
        committer: Signature {
            name: cn.to_string(),
            email: ce.to_string(),
            when: parse_timestamp(ct, "committer")?,
        },
        message: message.trim_end_matches('\n').to_string(),
    })
}

impl Repository {
    /// Look up a commit by id or revision.
    ///
    /// Full ids are served from the cache when present. Anything else is
    /// resolved with `git rev-parse` first, then cached under its full id.
    pub async fn get_commit(&self, id: &str) -> Result<Arc<Commit>> {
        let id = id.trim();
        let full_id = if is_full_id(id) {
            id.to_ascii_lowercase()
        } else {
            self.resolve_commit_id(id).await?
        };

        if let Some(commit) = self.commit_cache.get(&full_id) {
            trace!(id = %full_id, "commit cache hit");
            return Ok(commit);
        }

        let cmd = GitCommand::new(
            "log",
            ["-1", "--no-color", COMMIT_FORMAT, full_id.as_str(), "--"],
        );
        let out = self
            .run(&cmd)
            .await
            .map_err(|e| not_found_on_failure(e, "commit", &full_id))?;
        let commit = parse_commit_record(&out)?;

        Ok(self.commit_cache.insert(full_id, commit))
    }

    /// Resolve any revision expression to a full commit id.
    pub async fn resolve_commit_id(&self, revision: &str) -> Result<String> {
        let spec = format!("{}^{{commit}}", revision);
        let cmd = GitCommand::new("rev-parse", ["--verify", "--quiet", spec.as_str()]);
        let out = self
            .run(&cmd)
            .await
            .map_err(|e| not_found_on_failure(e, "commit", revision))?;

        let full_id = out.trim();
        if !is_full_id(full_id) {
            return Err(GitError::Parse(format!(
                "rev-parse returned '{}' for '{}'",
                full_id, revision
            )));
        }
        Ok(full_id.to_ascii_lowercase())
    }

    /// Resolve every line of `--pretty=format:%H` output to a commit.
    ///
    /// Empty output yields an empty list. A single line that fails to
    /// resolve fails the whole call and no partial list is returned.
    pub async fn parse_pretty_format_log(&self, logs: &str) -> Result<Vec<Arc<Commit>>> {
        let logs = logs.strip_suffix('\n').unwrap_or(logs);
        if logs.is_empty() {
            return Ok(Vec::new());
        }

        let mut commits = Vec::new();
        for commit_id in logs.split('\n') {
            commits.push(self.get_commit(commit_id).await?);
        }
        Ok(commits)
    }

    /// List commits reachable from `revision`, newest first.
    pub async fn log(&self, revision: &str, opts: &LogOptions) -> Result<Vec<Arc<Commit>>> {
        let mut cmd = GitCommand::new("log", [PRETTY_LOG_FORMAT]);
        if let Some(max) = opts.max_count {
            cmd.arg(format!("--max-count={}", max));
        }
        if let Some(skip) = opts.skip {
            cmd.arg(format!("--skip={}", skip));
        }
        cmd.args([revision, "--"]);
        if let Some(path) = &opts.path {
            cmd.arg(path);
        }

        let out = self
            .run(&cmd)
            .await
            .map_err(|e| not_found_on_failure(e, "revision", revision))?;
        self.parse_pretty_format_log(&out).await
    }

    /// Number of commits reachable from `revision`.
    pub async fn commits_count(&self, revision: &str) -> Result<u64> {
        let cmd = GitCommand::new("rev-list", ["--count", revision, "--"]);
        let out = self
            .run(&cmd)
            .await
            .map_err(|e| not_found_on_failure(e, "revision", revision))?;
        out.trim()
            .parse()
            .map_err(|_| GitError::Parse(format!("invalid commit count '{}'", out.trim())))
    }

    pub async fn head_commit(&self) -> Result<Arc<Commit>> {
        self.get_commit("HEAD").await
    }

    pub async fn branch_commit(&self, branch: &str) -> Result<Arc<Commit>> {
        self.get_commit(&format!("refs/heads/{}", branch)).await
    }
}
