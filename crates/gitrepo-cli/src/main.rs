//! gitrepo CLI
//!
//! Drives a local git repository through the `git` executable: one
//! subcommand per operation plus a publish workflow.

mod repo_cmd;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use gitrepo_core::config::load_config;
use gitrepo_core::tracing_init::init_tracing;
use gitrepo_core::{GitRepo, Repository};

use crate::repo_cmd::RepoAction;

#[derive(Parser, Debug)]
#[command(name = "gitrepo")]
#[command(version, about = "Drive a local git repository", long_about = None)]
struct Cli {
    /// Repository path (working tree, or metadata directory with --bare)
    #[arg(short, long, default_value = ".", env = "GITREPO_PATH", global = true)]
    repo: PathBuf,

    /// Treat the repository as bare
    #[arg(long, global = true)]
    bare: bool,

    /// Path to the git binary (overrides configuration)
    #[arg(long, env = "GITREPO_GIT_BIN", global = true)]
    git_bin: Option<PathBuf>,

    /// Terminate single git operations that run longer than this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "GITREPO_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    action: RepoAction,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let repository = Repository::new(&cli.repo, cli.bare)?;
    let project_dir = repository.tree_dir().map(std::path::Path::to_path_buf);
    let mut config = load_config(project_dir.as_deref())?;
    if let Some(bin) = cli.git_bin {
        config.git.binary = bin;
    }

    init_tracing(
        &format!("gitrepo_core={0},gitrepo={0}", config.log.level),
        cli.log_json || config.log.json,
    );
    info!(
        version = env!("CARGO_PKG_VERSION"),
        repo = %repository.working_dir().display(),
        bare = repository.is_bare(),
        "Starting gitrepo"
    );

    let git = GitRepo::from_config(repository, &config);
    repo_cmd::run(&git, &config, cli.action, cli.timeout.map(Duration::from_secs)).await
}
