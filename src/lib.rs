//! Typed wrapper around the `git` command-line tool.
//!
//! Every operation builds a `GitCommand`, runs it through a `GitRunner`
//! (the real binary, or a fake in tests) and parses the text output.
//! `Repository` handles memoize parsed commits and tags.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gitwrap::{Repository, SystemGit};
//!
//! # async fn demo() -> gitwrap::Result<()> {
//! let repo = Repository::open(".", Arc::new(SystemGit::new()))?;
//! for commit in repo.log("HEAD", &Default::default()).await? {
//!     println!("{} {}", commit.short_id(), commit.summary());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod git;
pub mod models;

pub use error::{GitError, Result};
pub use git::operations::{checkout, clone, fetch, init, pull, push, rebase, reset_head, version};
pub use git::{
    CloneOptions, FetchOptions, GitCommand, GitRunner, LogOptions, PullOptions, PushOptions,
    RebaseOptions, Repository, ResetOptions, SystemGit,
};
pub use models::{Commit, Signature, Tag, TagKind};
