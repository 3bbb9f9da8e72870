//! Repository-level git commands.
//!
//! Each function turns an options struct into flags, runs one git
//! subprocess through the supplied runner and returns its result as is.
//! Zero timeouts mean "no timeout" everywhere.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::{GitError, Result};
use crate::git::command::GitCommand;
use crate::git::runner::{GitRunner, effective_timeout};

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub mirror: bool,
    pub bare: bool,
    pub quiet: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub all: bool,
    pub rebase: bool,
    /// Remote to pull from; `branch` is only passed along with it.
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub prune: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct RebaseOptions {
    pub branch: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub force: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    pub hard: bool,
    pub timeout: Option<Duration>,
}

/// Create `repo_path` (and parents) and run `git init` inside it.
pub async fn init(runner: &dyn GitRunner, repo_path: &Path, bare: bool) -> Result<()> {
    std::fs::create_dir_all(repo_path)
        .map_err(|e| GitError::io(format!("creating {}", repo_path.display()), e))?;

    let mut cmd = GitCommand::subcommand("init");
    cmd.flag(bare, "--bare");
    runner.run_in_dir(&cmd, repo_path).await?;

    info!("Initialized repository at {}", repo_path.display());
    Ok(())
}

/// Clone `from` into `to`, creating the parent directories of `to` first.
pub async fn clone(runner: &dyn GitRunner, from: &str, to: &Path, opts: &CloneOptions) -> Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| GitError::io(format!("creating {}", parent.display()), e))?;
    }

    let mut cmd = GitCommand::subcommand("clone");
    cmd.flag(opts.mirror, "--mirror")
        .flag(opts.bare, "--bare")
        .flag(opts.quiet, "--quiet")
        .arg(from)
        .arg(to);

    runner.run_timeout(&cmd, effective_timeout(opts.timeout)).await?;

    info!("Cloned {} into {}", from, to.display());
    Ok(())
}

pub async fn pull(runner: &dyn GitRunner, repo_path: &Path, opts: &PullOptions) -> Result<()> {
    let mut cmd = GitCommand::subcommand("pull");
    cmd.flag(opts.all, "--all").flag(opts.rebase, "--rebase");
    if let Some(remote) = &opts.remote {
        cmd.arg(remote);
        if let Some(branch) = &opts.branch {
            cmd.arg(branch);
        }
    }

    runner
        .run(&cmd, Some(repo_path), effective_timeout(opts.timeout))
        .await?;
    info!("Pulled into {}", repo_path.display());
    Ok(())
}

pub async fn fetch(runner: &dyn GitRunner, repo_path: &Path, opts: &FetchOptions) -> Result<()> {
    let mut cmd = GitCommand::subcommand("fetch");
    cmd.flag(opts.prune, "--prune");

    runner
        .run(&cmd, Some(repo_path), effective_timeout(opts.timeout))
        .await?;
    info!("Fetched into {}", repo_path.display());
    Ok(())
}

/// Rebase local commits on top of `opts.branch`, or the upstream when unset.
pub async fn rebase(runner: &dyn GitRunner, repo_path: &Path, opts: &RebaseOptions) -> Result<()> {
    let mut cmd = GitCommand::subcommand("rebase");
    if let Some(branch) = opts.branch.as_deref().filter(|b| !b.is_empty()) {
        cmd.arg(branch);
    }

    runner
        .run(&cmd, Some(repo_path), effective_timeout(opts.timeout))
        .await?;
    info!("Rebased {}", repo_path.display());
    Ok(())
}

pub async fn push(
    runner: &dyn GitRunner,
    repo_path: &Path,
    remote: &str,
    branch: &str,
    opts: &PushOptions,
) -> Result<()> {
    let mut cmd = GitCommand::subcommand("push");
    cmd.flag(opts.force, "--force").args([remote, branch]);

    runner
        .run(&cmd, Some(repo_path), effective_timeout(opts.timeout))
        .await?;
    info!("Pushed {} to {}", branch, remote);
    Ok(())
}

/// Reset HEAD to `revision`.
pub async fn reset_head(
    runner: &dyn GitRunner,
    repo_path: &Path,
    revision: &str,
    opts: &ResetOptions,
) -> Result<()> {
    let mut cmd = GitCommand::subcommand("reset");
    cmd.flag(opts.hard, "--hard").arg(revision);

    runner
        .run(&cmd, Some(repo_path), effective_timeout(opts.timeout))
        .await?;
    info!("Reset {} to {}", repo_path.display(), revision);
    Ok(())
}

pub async fn checkout(runner: &dyn GitRunner, repo_path: &Path, revision: &str) -> Result<()> {
    let cmd = GitCommand::new("checkout", [revision]);
    runner.run_in_dir(&cmd, repo_path).await?;
    info!("Checked out {} in {}", revision, repo_path.display());
    Ok(())
}

/// Version of the git binary, e.g. `2.39.5` from `git version 2.39.5`.
pub async fn version(runner: &dyn GitRunner) -> Result<String> {
    let out = runner
        .run_string(&GitCommand::subcommand("--version"), None, None)
        .await?;
    parse_version(&out)
}

fn parse_version(output: &str) -> Result<String> {
    output
        .trim()
        .strip_prefix("git version ")
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string)
        .ok_or_else(|| GitError::Parse(format!("unrecognized version output '{}'", output.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::testing::FakeRunner;
    use tempfile::TempDir;

    #[tokio::test]
    async fn clone_creates_missing_parent_directories() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("deep/nested/repo");
        let runner = FakeRunner::new();

        clone(
            &runner,
            "https://example.com/a.git",
            &target,
            &CloneOptions {
                mirror: true,
                quiet: true,
                timeout: Some(Duration::from_secs(30)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(target.parent().unwrap().is_dir());
        assert!(!target.exists());
        let calls = runner.calls();
        assert_eq!(
            calls[0].command,
            format!(
                "git clone --mirror --quiet https://example.com/a.git {}",
                target.display()
            )
        );
        assert_eq!(calls[0].dir, None);
        assert_eq!(calls[0].timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn zero_timeout_is_passed_as_none() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();

        fetch(
            &runner,
            temp.path(),
            &FetchOptions {
                prune: true,
                timeout: Some(Duration::ZERO),
            },
        )
        .await
        .unwrap();
        pull(
            &runner,
            temp.path(),
            &PullOptions {
                timeout: Some(Duration::ZERO),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].command, "git fetch --prune");
        assert!(calls.iter().all(|c| c.timeout.is_none()));
        assert_eq!(calls[0].dir.as_deref(), Some(temp.path()));
    }

    #[tokio::test]
    async fn pull_passes_remote_and_branch() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();

        pull(
            &runner,
            temp.path(),
            &PullOptions {
                all: true,
                rebase: true,
                remote: Some("origin".to_string()),
                branch: Some("main".to_string()),
                timeout: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(runner.commands(), vec!["git pull --all --rebase origin main"]);
    }

    #[tokio::test]
    async fn builds_remaining_commands() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let runner = FakeRunner::new();

        rebase(&runner, dir, &RebaseOptions::default()).await.unwrap();
        rebase(
            &runner,
            dir,
            &RebaseOptions {
                branch: Some("origin/main".to_string()),
                timeout: None,
            },
        )
        .await
        .unwrap();
        push(&runner, dir, "origin", "main", &PushOptions { force: true, timeout: None })
            .await
            .unwrap();
        reset_head(&runner, dir, "HEAD~1", &ResetOptions { hard: true, timeout: None })
            .await
            .unwrap();
        checkout(&runner, dir, "v1.0").await.unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                "git rebase",
                "git rebase origin/main",
                "git push --force origin main",
                "git reset --hard HEAD~1",
                "git checkout v1.0",
            ]
        );
    }

    #[tokio::test]
    async fn failure_is_propagated_with_stderr() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        runner.push_failure("error: pathspec 'nope' did not match");

        let err = checkout(&runner, temp.path(), "nope").await.unwrap_err();
        assert_eq!(err.stderr(), Some("error: pathspec 'nope' did not match"));
    }

    #[test]
    fn parses_version_strings() {
        assert_eq!(parse_version("git version 2.39.5\n").unwrap(), "2.39.5");
        assert_eq!(
            parse_version("git version 2.39.3 (Apple Git-146)").unwrap(),
            "2.39.3"
        );
        assert!(parse_version("hg 6.0").is_err());
    }
}
