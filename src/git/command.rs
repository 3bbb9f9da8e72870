//! Argument builder for a single git invocation.
//!
//! A `GitCommand` is a subcommand name plus its arguments, passed to the
//! runner verbatim. Nothing here validates or escapes arguments.

use std::ffi::OsString;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl GitCommand {
    /// Start a command with `subcommand` followed by `args`.
    pub fn new<I, S>(subcommand: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut cmd = Self {
            args: vec![subcommand.into()],
            envs: Vec::new(),
        };
        cmd.args.extend(args.into_iter().map(Into::into));
        cmd
    }

    /// Start a command with no arguments besides the subcommand.
    pub fn subcommand(name: impl Into<OsString>) -> Self {
        Self::new(name, std::iter::empty::<OsString>())
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `flag` only when `enabled` is set.
    pub fn flag(&mut self, enabled: bool, flag: &str) -> &mut Self {
        if enabled {
            self.args.push(flag.into());
        }
        self
    }

    /// Environment variable set for this invocation only.
    pub fn env(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> &mut Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(OsString, OsString)] {
        &self.envs
    }

    pub fn subcommand_name(&self) -> String {
        self.args
            .first()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("git")?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
