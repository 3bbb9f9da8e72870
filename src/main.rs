//! gitwrap - typed git operations from the command line
//!
//! # Usage
//! ```bash
//! gitwrap clone https://host/repo.git ./work/repo --timeout 600
//! gitwrap -C ./work/repo fetch --prune
//! gitwrap -C ./work/repo log -n 10
//! gitwrap -C ./work/repo show v1.0 --json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitwrap::config::{Config, load_config};
use gitwrap::git::repository::commit_to_info;
use gitwrap::git::runner::timeout_from_secs;
use gitwrap::{
    CloneOptions, FetchOptions, GitRunner, LogOptions, PullOptions, PushOptions, RebaseOptions,
    Repository, ResetOptions,
};

/// Typed wrapper around the git command-line tool
#[derive(Parser)]
#[command(name = "gitwrap")]
#[command(about = "Run git repository operations with timeouts and cached lookups", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository working directory
    #[arg(short = 'C', long = "repo", global = true, default_value = ".")]
    repo: PathBuf,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Git executable to run instead of the configured one
    #[arg(long, global = true)]
    git: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new repository
    Init {
        path: PathBuf,
        #[arg(long)]
        bare: bool,
    },
    /// Clone a repository, creating parent directories as needed
    Clone {
        from: String,
        to: PathBuf,
        #[arg(long)]
        mirror: bool,
        #[arg(long)]
        bare: bool,
        #[arg(short, long)]
        quiet: bool,
        /// Seconds; zero or negative disables the timeout
        #[arg(long, allow_negative_numbers = true)]
        timeout: Option<i64>,
    },
    /// Pull changes from remotes
    Pull {
        remote: Option<String>,
        branch: Option<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        rebase: bool,
        #[arg(long, allow_negative_numbers = true)]
        timeout: Option<i64>,
    },
    /// Fetch changes from remotes
    Fetch {
        #[arg(long)]
        prune: bool,
        #[arg(long, allow_negative_numbers = true)]
        timeout: Option<i64>,
    },
    /// Rebase local commits onto a branch
    Rebase { branch: Option<String> },
    /// Push a branch to a remote
    Push {
        remote: String,
        branch: String,
        #[arg(short, long)]
        force: bool,
    },
    /// Reset HEAD to a revision
    Reset {
        revision: String,
        #[arg(long)]
        hard: bool,
    },
    /// Check out a revision
    Checkout { revision: String },
    /// List commits reachable from a revision
    Log {
        #[arg(default_value = "HEAD")]
        revision: String,
        #[arg(short = 'n', long, default_value = "20")]
        max_count: usize,
        #[arg(long)]
        skip: Option<usize>,
        /// Only commits touching this path
        #[arg(long)]
        path: Option<String>,
    },
    /// Show one commit, or the commit a tag points at
    Show {
        #[arg(default_value = "HEAD")]
        revision: String,
    },
    /// List tags, or show one tag
    Tag { name: Option<String> },
    /// List local branches
    Branches,
    /// Print the git version
    Version,
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_repo(path: &Path, runner: &Arc<dyn GitRunner>, config: &Config) -> gitwrap::Result<Repository> {
    Repository::open_with_capacity(path, Arc::clone(runner), config.cache.capacity)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let mut system_git = config.runner();
    if let Some(program) = &cli.git {
        system_git = system_git.with_program(program);
    }
    let runner: Arc<dyn GitRunner> = Arc::new(system_git);
    let repo_path = cli.repo.as_path();

    match cli.command {
        Commands::Init { path, bare } => {
            let repo = Repository::init(&path, bare, runner).await?;
            println!("✓ Initialized {}", repo.path().display());
        }
        Commands::Clone {
            from,
            to,
            mirror,
            bare,
            quiet,
            timeout,
        } => {
            let opts = CloneOptions {
                mirror,
                bare,
                quiet,
                timeout: timeout.map_or(config.timeouts.clone_timeout(), timeout_from_secs),
            };
            gitwrap::clone(runner.as_ref(), &from, &to, &opts).await?;
            println!("✓ Cloned {} into {}", from, to.display());
        }
        Commands::Pull {
            remote,
            branch,
            all,
            rebase,
            timeout,
        } => {
            let opts = PullOptions {
                all,
                rebase,
                remote,
                branch,
                timeout: timeout.map_or(config.timeouts.pull_timeout(), timeout_from_secs),
            };
            gitwrap::pull(runner.as_ref(), repo_path, &opts).await?;
        }
        Commands::Fetch { prune, timeout } => {
            let opts = FetchOptions {
                prune,
                timeout: timeout.map_or(config.timeouts.fetch_timeout(), timeout_from_secs),
            };
            gitwrap::fetch(runner.as_ref(), repo_path, &opts).await?;
        }
        Commands::Rebase { branch } => {
            let opts = RebaseOptions {
                branch,
                timeout: None,
            };
            gitwrap::rebase(runner.as_ref(), repo_path, &opts).await?;
        }
        Commands::Push {
            remote,
            branch,
            force,
        } => {
            let opts = PushOptions {
                force,
                timeout: None,
            };
            gitwrap::push(runner.as_ref(), repo_path, &remote, &branch, &opts).await?;
        }
        Commands::Reset { revision, hard } => {
            let opts = ResetOptions {
                hard,
                timeout: None,
            };
            gitwrap::reset_head(runner.as_ref(), repo_path, &revision, &opts).await?;
        }
        Commands::Checkout { revision } => {
            gitwrap::checkout(runner.as_ref(), repo_path, &revision).await?;
        }
        Commands::Log {
            revision,
            max_count,
            skip,
            path,
        } => {
            let repo = open_repo(repo_path, &runner, &config)?;
            let opts = LogOptions {
                max_count: Some(max_count),
                skip,
                path,
            };
            let commits = repo.log(&revision, &opts).await?;
            if cli.json {
                let infos: Vec<_> = commits.iter().map(|c| commit_to_info(c)).collect();
                print_json(&infos)?;
            } else {
                for commit in &commits {
                    let info = commit_to_info(commit);
                    println!(
                        "{}  {:<16}  {:<20}  {}",
                        commit.short_id(),
                        info.relative_time,
                        info.author,
                        info.summary
                    );
                }
            }
            tracing::debug!(stats = ?repo.cache_stats(), "log finished");
        }
        Commands::Show { revision } => {
            let repo = open_repo(repo_path, &runner, &config)?;
            let commit = if repo.has_tag(&revision).await? {
                repo.tag_commit(&revision).await?
            } else {
                repo.get_commit(&revision).await?
            };
            if cli.json {
                print_json(commit.as_ref())?;
            } else {
                println!("commit {}", commit.id);
                for parent in &commit.parents {
                    println!("parent {}", parent);
                }
                println!(
                    "Author: {} <{}>  {}",
                    commit.author.name,
                    commit.author.email,
                    commit.author.when.to_rfc2822()
                );
                println!();
                for line in commit.message.lines() {
                    println!("    {}", line);
                }
            }
        }
        Commands::Tag { name } => {
            let repo = open_repo(repo_path, &runner, &config)?;
            match name {
                Some(name) => {
                    let tag = repo.get_tag(&name).await?;
                    if cli.json {
                        print_json(tag.as_ref())?;
                    } else {
                        println!("{} -> {} ({:?})", tag.name, tag.target, tag.kind);
                        if let Some(message) = &tag.message {
                            println!("{}", message);
                        }
                    }
                }
                None => {
                    let tags = repo.tags().await?;
                    if cli.json {
                        print_json(&tags)?;
                    } else {
                        tags.iter().for_each(|t| println!("{}", t));
                    }
                }
            }
        }
        Commands::Branches => {
            let repo = open_repo(repo_path, &runner, &config)?;
            let branches = repo.branches().await?;
            if cli.json {
                print_json(&branches)?;
            } else {
                branches.iter().for_each(|b| println!("{}", b));
            }
        }
        Commands::Version => {
            println!("{}", gitwrap::version(runner.as_ref()).await?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("✗ {:#}", e);
        let timed_out = e
            .downcast_ref::<gitwrap::GitError>()
            .is_some_and(gitwrap::GitError::is_timeout);
        std::process::exit(if timed_out { 124 } else { 1 });
    }
}
