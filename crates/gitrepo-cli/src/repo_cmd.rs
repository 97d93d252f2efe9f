//! CLI repository subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Subcommand;
use tracing::warn;

use gitrepo_core::config::Config;
use gitrepo_core::workflow;
use gitrepo_core::{GitRepo, Operation, OutputLog};

/// Repository actions.
#[derive(Subcommand, Debug)]
pub enum RepoAction {
    /// Create the repository
    Init,
    /// Clone a remote into the repository path
    Clone {
        /// Remote URL
        url: String,
        /// Branch to check out (defaults to the configured default branch)
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Register a remote
    RemoteAdd {
        /// Remote name
        name: String,
        /// Remote URL
        url: String,
    },
    /// Stage a path relative to the working tree
    Add {
        /// Path to stage
        path: PathBuf,
    },
    /// Move a file into the working tree and stage it
    AddFrom {
        /// File to move
        source: PathBuf,
        /// Destination relative to the working tree
        target: PathBuf,
    },
    /// Record staged changes
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
    /// Fetch and merge from a remote
    Pull {
        /// Remote name (defaults to the configured remote)
        remote: Option<String>,
        /// Branch or refspec (defaults to the configured branch)
        branch: Option<String>,
    },
    /// Push to a remote
    Push {
        /// Remote name (defaults to the configured remote)
        remote: Option<String>,
        /// Branch or refspec (defaults to the configured branch)
        branch: Option<String>,
    },
    /// Initialize and update submodules recursively
    Submodules,
    /// List local branches
    Branches {
        /// Also show each branch's tip commit
        #[arg(short, long)]
        verbose: bool,
    },
    /// Clone (or pull if already cloned), move a file in, commit and push
    Publish {
        /// File to move into the working tree
        source: PathBuf,
        /// Destination relative to the working tree
        target: PathBuf,
        /// Commit message
        #[arg(short, long)]
        message: String,
        /// Remote URL to clone from when the checkout does not exist yet
        #[arg(long)]
        url: String,
    },
}

/// Execute a repository action.
pub async fn run(
    git: &GitRepo,
    config: &Config,
    action: RepoAction,
    timeout: Option<Duration>,
) -> anyhow::Result<()> {
    let mut out = io::stdout();
    let remote = |r: Option<String>| r.unwrap_or_else(|| config.defaults.remote.clone());
    let branch = |b: Option<String>| b.unwrap_or_else(|| config.defaults.branch.clone());

    let log = match action {
        RepoAction::Init => run_op(git, &Operation::Init, timeout).await?,
        RepoAction::Clone { url, branch: b } => {
            let op = Operation::Clone {
                url,
                branch: branch(b),
            };
            run_op(git, &op, timeout).await?
        }
        RepoAction::RemoteAdd { name, url } => {
            run_op(git, &Operation::AddRemote { name, url }, timeout).await?
        }
        RepoAction::Add { path } => run_op(git, &Operation::Add { path }, timeout).await?,
        RepoAction::AddFrom { source, target } => git.add_from(&source, &target).await?,
        RepoAction::Commit { message } => {
            run_op(git, &Operation::Commit { message }, timeout).await?
        }
        RepoAction::Pull { remote: r, branch: b } => {
            let op = Operation::Pull {
                remote: remote(r),
                refspec: branch(b),
            };
            run_op(git, &op, timeout).await?
        }
        RepoAction::Push { remote: r, branch: b } => {
            let op = Operation::Push {
                remote: remote(r),
                refspec: branch(b),
            };
            run_op(git, &op, timeout).await?
        }
        RepoAction::Submodules => run_op(git, &Operation::UpdateSubmodules, timeout).await?,
        RepoAction::Branches { verbose: false } => {
            let log = run_op(git, &Operation::ListBranches, timeout).await?;
            for name in gitrepo_core::parse::parse_branches(&log) {
                writeln!(out, "{name}")?;
            }
            return Ok(());
        }
        RepoAction::Branches { verbose: true } => {
            let log = run_op(git, &Operation::ListBranchesAndTipCommits, timeout).await?;
            let tips = gitrepo_core::parse::parse_branches_with_tips(&log);
            let width = tips.keys().map(String::len).max().unwrap_or(0);
            for (name, tip) in &tips {
                writeln!(out, "{name:<width$}  {tip}")?;
            }
            return Ok(());
        }
        RepoAction::Publish {
            source,
            target,
            message,
            url,
        } => {
            let (remote, branch) = (remote(None), branch(None));
            workflow::clone_or_pull(git, &url, &branch, &remote).await?;
            workflow::publish_file(git, &source, &target, &message, &remote, &branch).await?
        }
    };

    write_log(&mut out, &log)?;
    Ok(())
}

/// Run a single operation, terminating it if it outlives `timeout`.
async fn run_op(
    git: &GitRepo,
    op: &Operation,
    timeout: Option<Duration>,
) -> gitrepo_core::Result<OutputLog> {
    let mut execution = git.start(op);
    let Some(limit) = timeout else {
        return execution.completion.await;
    };
    match tokio::time::timeout(limit, &mut execution.completion).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                op = op.name(),
                timeout_secs = limit.as_secs(),
                "Operation timed out, terminating"
            );
            execution.handle.terminate();
            execution.completion.await
        }
    }
}

fn write_log(out: &mut impl Write, log: &OutputLog) -> io::Result<()> {
    for chunk in log.chunks() {
        writeln!(out, "{}", chunk.text)?;
    }
    Ok(())
}
