use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{GitError, Result};
use crate::git::cache::{CacheStats, DEFAULT_CACHE_CAPACITY, ObjectCache};
use crate::git::command::GitCommand;
use crate::git::operations;
use crate::git::runner::GitRunner;
use crate::models::{Commit, CommitInfo, Tag};

/// Handle to a repository working directory.
///
/// Holds the runner every query goes through plus two memoization tables:
/// commits keyed by full id and tags keyed by name.
pub struct Repository {
    path: PathBuf,
    runner: Arc<dyn GitRunner>,
    pub(crate) commit_cache: ObjectCache<Commit>,
    pub(crate) tag_cache: ObjectCache<Tag>,
}

impl Repository {
    pub fn open<P: AsRef<Path>>(path: P, runner: Arc<dyn GitRunner>) -> Result<Self> {
        Self::open_with_capacity(path, runner, DEFAULT_CACHE_CAPACITY)
    }

    /// Open `path`, sizing both caches to `cache_capacity` entries.
    pub fn open_with_capacity<P: AsRef<Path>>(
        path: P,
        runner: Arc<dyn GitRunner>,
        cache_capacity: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let path = std::path::absolute(path)
            .map_err(|e| GitError::io(format!("resolving {}", path.display()), e))?;

        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(GitError::NotADirectory(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitError::PathNotFound(path));
            }
            Err(e) => return Err(GitError::io(format!("inspecting {}", path.display()), e)),
        }

        tracing::debug!("Opened repository at {}", path.display());

        Ok(Self {
            path,
            runner,
            commit_cache: ObjectCache::new(cache_capacity),
            tag_cache: ObjectCache::new(cache_capacity),
        })
    }

    /// Create `path` if needed, run `git init` there and open the result.
    pub async fn init<P: AsRef<Path>>(
        path: P,
        bare: bool,
        runner: Arc<dyn GitRunner>,
    ) -> Result<Self> {
        operations::init(runner.as_ref(), path.as_ref(), bare).await?;
        Self::open(path, runner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn runner(&self) -> &dyn GitRunner {
        self.runner.as_ref()
    }

    /// Run `cmd` inside the working directory and decode stdout.
    pub(crate) async fn run(&self, cmd: &GitCommand) -> Result<String> {
        self.runner.run_string(cmd, Some(&self.path), None).await
    }

    pub fn cache_stats(&self) -> RepositoryCacheStats {
        RepositoryCacheStats {
            commits: self.commit_cache.stats(),
            tags: self.tag_cache.stats(),
        }
    }

    /// Forget every cached commit and tag.
    pub fn clear_caches(&self) {
        self.commit_cache.clear();
        self.tag_cache.clear();
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("commits_cached", &self.commit_cache.len())
            .field("tags_cached", &self.tag_cache.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RepositoryCacheStats {
    pub commits: CacheStats,
    pub tags: CacheStats,
}

pub fn commit_to_info(commit: &Commit) -> CommitInfo {
    let timestamp = commit.author.when.timestamp();
    CommitInfo {
        id: commit.id.clone(),
        summary: commit.summary().to_string(),
        author: commit.author.name.clone(),
        timestamp,
        relative_time: format_relative_time(timestamp),
    }
}

pub fn format_relative_time(timestamp: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let diff = now - timestamp;

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        let mins = diff / 60;
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff < 86400 {
        let hours = diff / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if diff < 2592000 {
        let days = diff / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else if diff < 31536000 {
        let months = diff / 2592000;
        format!("{} month{} ago", months, if months == 1 { "" } else { "s" })
    } else {
        let years = diff / 31536000;
        format!("{} year{} ago", years, if years == 1 { "" } else { "s" })
    }
}
