//! Subprocess execution for git commands.
//!
//! `GitRunner` is the seam every operation goes through, so tests can swap
//! in a scripted runner. `SystemGit` spawns the real binary with tokio and
//! enforces the optional deadline: on expiry the child gets SIGTERM, a
//! short grace period, and then SIGKILL.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{GitError, Result};
use crate::git::command::GitCommand;

pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

/// Treat a zero timeout as "no timeout".
pub fn effective_timeout(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}

/// Convert a signed number of seconds into a timeout. Zero and negative
/// values mean "no timeout".
pub fn timeout_from_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs)
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
}

#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `cmd`, optionally inside `dir` and bounded by `timeout`, and
    /// return its stdout.
    async fn run(
        &self,
        cmd: &GitCommand,
        dir: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>>;

    async fn run_in_dir(&self, cmd: &GitCommand, dir: &Path) -> Result<Vec<u8>> {
        self.run(cmd, Some(dir), None).await
    }

    async fn run_timeout(&self, cmd: &GitCommand, timeout: Option<Duration>) -> Result<Vec<u8>> {
        self.run(cmd, None, timeout).await
    }

    /// Like `run`, but decodes stdout as UTF-8.
    async fn run_string(
        &self,
        cmd: &GitCommand,
        dir: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let out = self.run(cmd, dir, timeout).await?;
        String::from_utf8(out).map_err(|e| {
            GitError::Parse(format!("'{}' produced non UTF-8 output: {}", cmd, e))
        })
    }
}

/// Runs the git binary found on `PATH` (or an explicit program path).
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: PathBuf,
    envs: Vec<(String, String)>,
    kill_grace: Duration,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
            envs: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }
}

impl SystemGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Environment variable applied to every invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn spawn_error(&self, command: &str, source: std::io::Error) -> GitError {
        if source.kind() == std::io::ErrorKind::NotFound {
            GitError::ToolNotFound {
                program: self.program.display().to_string(),
                source,
            }
        } else {
            GitError::Spawn {
                command: command.to_string(),
                source,
            }
        }
    }

    /// Ask the child to exit, then kill it if it ignores the request.
    async fn terminate(&self, child: &mut Child) {
        if send_sigterm(child) {
            if let Ok(Ok(status)) = tokio::time::timeout(self.kill_grace, child.wait()).await {
                debug!(%status, "git exited after SIGTERM");
                return;
            }
        }
        if let Err(e) = child.kill().await {
            warn!("Failed to kill git process: {}", e);
        }
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(
        &self,
        cmd: &GitCommand,
        dir: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let timeout = effective_timeout(timeout);
        let label = cmd.to_string();

        // A missing working directory would otherwise surface as a
        // NotFound spawn error, indistinguishable from a missing binary.
        if let Some(dir) = dir {
            if !dir.is_dir() {
                return Err(GitError::PathNotFound(dir.to_path_buf()));
            }
        }

        let mut command = Command::new(&self.program);
        command.args(cmd.get_args());
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        for (key, value) in cmd.get_envs() {
            command.env(key, value);
        }
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %label, dir = ?dir, timeout = ?timeout, "spawning git");

        let mut child = command
            .spawn()
            .map_err(|e| self.spawn_error(&label, e))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = {
            let collect = async {
                tokio::join!(child.wait(), read_all(stdout), read_all(stderr))
            };
            match timeout {
                Some(limit) => tokio::time::timeout(limit, collect).await.ok(),
                None => Some(collect.await),
            }
        };

        let Some((status, out, err)) = outcome else {
            let limit = timeout.unwrap_or_default();
            warn!(command = %label, ?limit, "git timed out, terminating");
            self.terminate(&mut child).await;
            return Err(GitError::Timeout {
                command: label,
                timeout: limit,
            });
        };

        let status = status.map_err(|e| GitError::io(format!("waiting for '{}'", label), e))?;
        let out = out.map_err(|e| GitError::io(format!("reading stdout of '{}'", label), e))?;
        let err = err.map_err(|e| GitError::io(format!("reading stderr of '{}'", label), e))?;

        check_status(label, status, &err)?;
        Ok(out)
    }
}

fn check_status(command: String, status: ExitStatus, stderr: &[u8]) -> Result<()> {
    if status.success() {
        debug!(%command, "git succeeded");
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    debug!(%command, %status, %stderr, "git failed");
    Err(GitError::CommandFailed {
        command,
        code: status.code(),
        stderr,
    })
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> bool {
    match child.id() {
        // SAFETY: the pid belongs to a child we spawned and have not reaped.
        Some(pid) => unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 },
        None => false,
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> bool {
    false
}

/// Scripted runner for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Invocation {
        pub command: String,
        pub dir: Option<PathBuf>,
        pub timeout: Option<Duration>,
    }

    /// Replays queued responses in order and records every call. Once the
    /// queue is empty each call succeeds with no output.
    #[derive(Default)]
    pub struct FakeRunner {
        responses: Mutex<VecDeque<Result<Vec<u8>>>>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_ok(&self, stdout: impl Into<Vec<u8>>) -> &Self {
            self.responses.lock().unwrap().push_back(Ok(stdout.into()));
            self
        }

        pub fn push_err(&self, err: GitError) -> &Self {
            self.responses.lock().unwrap().push_back(Err(err));
            self
        }

        pub fn push_failure(&self, stderr: &str) -> &Self {
            self.push_err(GitError::CommandFailed {
                command: "git".to_string(),
                code: Some(128),
                stderr: stderr.to_string(),
            })
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        pub fn commands(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.command).collect()
        }
    }

    #[async_trait]
    impl GitRunner for FakeRunner {
        async fn run(
            &self,
            cmd: &GitCommand,
            dir: Option<&Path>,
            timeout: Option<Duration>,
        ) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(Invocation {
                command: cmd.to_string(),
                dir: dir.map(Path::to_path_buf),
                timeout: effective_timeout(timeout),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }
}
