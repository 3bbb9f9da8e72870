//! TOML configuration for the runner, caches and default timeouts.
//!
//! ```toml
//! [git]
//! program = "/usr/bin/git"
//! kill_grace_ms = 2000
//! env = { GIT_SSH_COMMAND = "ssh -o BatchMode=yes" }
//!
//! [cache]
//! capacity = 1024
//!
//! [timeouts]
//! clone_secs = 600
//! fetch_secs = 120
//! pull_secs = -1   # <= 0 disables the timeout
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::git::cache::DEFAULT_CACHE_CAPACITY;
use crate::git::runner::{DEFAULT_KILL_GRACE, SystemGit, timeout_from_secs};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub git: GitConfig,
    pub cache: CacheConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub program: PathBuf,
    pub kill_grace_ms: u64,
    pub env: BTreeMap<String, String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
            kill_grace_ms: DEFAULT_KILL_GRACE.as_millis() as u64,
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Default timeouts in seconds; zero or negative means none.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub clone_secs: i64,
    pub pull_secs: i64,
    pub fetch_secs: i64,
}

impl TimeoutConfig {
    pub fn clone_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.clone_secs)
    }

    pub fn pull_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.pull_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.fetch_secs)
    }
}

impl Config {
    /// Build the runner described by the `[git]` section.
    pub fn runner(&self) -> SystemGit {
        self.git.env.iter().fold(
            SystemGit::new()
                .with_program(&self.git.program)
                .with_kill_grace(Duration::from_millis(self.git.kill_grace_ms)),
            |runner, (key, value)| runner.with_env(key, value),
        )
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    anyhow::ensure!(
        !config.git.program.as_os_str().is_empty(),
        "git.program must not be empty"
    );
    Ok(())
}
