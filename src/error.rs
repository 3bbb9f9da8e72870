//! Error types for git invocations.
//!
//! Defines `GitError` for every failure a caller may want to tell apart:
//! - `PathNotFound`, `NotADirectory` → bad repository path
//! - `ToolNotFound`, `Spawn` → the git binary could not be started
//! - `CommandFailed` → git ran and exited non-zero (stderr attached)
//! - `Timeout` → git was terminated after its deadline
//! - `Parse`, `ObjectNotFound` → output could not be turned into a value

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Git executable not found: {program}")]
    ToolNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed ({}): {stderr}", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("{kind} not found: {id}")]
    ObjectNotFound { kind: &'static str, id: String },

    #[error("Unexpected git output: {0}")]
    Parse(String),

    #[error("IO error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "killed by signal".to_string(),
    }
}

impl GitError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        GitError::Io {
            operation: operation.into(),
            source,
        }
    }

    /// True when the process was stopped because it ran past its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, GitError::Timeout { .. })
    }

    /// True for missing paths and unresolvable object ids.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GitError::PathNotFound(_) | GitError::ObjectNotFound { .. }
        )
    }

    /// Stderr text reported by git, if this error came from a failed run.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            GitError::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitError>;
