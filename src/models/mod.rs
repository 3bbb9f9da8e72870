//! Values parsed out of git output.
//!
//! These structs are plain data and serialize to JSON for the CLI.
//! - `commit`: Commit, Signature, CommitInfo
//! - `tag`: Tag, TagKind

pub mod commit;
pub mod tag;

pub use commit::*;
pub use tag::*;
