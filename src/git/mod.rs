pub mod cache;
pub mod command;
pub mod history;
pub mod operations;
pub mod refs;
pub mod repository;
pub mod runner;

pub use command::GitCommand;
pub use history::LogOptions;
pub use operations::{
    CloneOptions, FetchOptions, PullOptions, PushOptions, RebaseOptions, ResetOptions,
};
pub use repository::Repository;
pub use runner::{GitRunner, SystemGit};
