//! Caller-facing git operations on one repository.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::command::{DEFAULT_CLONE_BRANCH, GitCommand, Operation};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{Execution, Executor, OutputLog, ProcessHandle};
use crate::parse;
use crate::repo::Repository;

/// A repository handle bound to the executor that drives it.
///
/// Holds no mutable state: every operation owns its own subprocess and
/// output log. Operations issued concurrently against the same working tree
/// are not serialized here; chain them by awaiting each in turn.
#[derive(Debug, Clone)]
pub struct GitRepo {
    repo: Repository,
    executor: Executor,
    envs: BTreeMap<String, String>,
}

impl GitRepo {
    pub fn new(repo: Repository, executor: Executor) -> Self {
        Self {
            repo,
            executor,
            envs: BTreeMap::new(),
        }
    }

    /// Bind `repo` to the git binary and environment from `config`.
    pub fn from_config(repo: Repository, config: &Config) -> Self {
        Self::new(repo, config.git.executor()).with_envs(config.git.env.clone())
    }

    /// Extra environment passed to every invocation.
    #[must_use]
    pub fn with_envs<K, V>(mut self, envs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub const fn repository(&self) -> &Repository {
        &self.repo
    }

    pub const fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The exact invocation `op` would run.
    pub fn command(&self, op: &Operation) -> GitCommand {
        op.build(&self.repo).with_envs(self.envs.clone())
    }

    /// Start `op` and hand back the live process with its completion.
    pub fn start(&self, op: &Operation) -> Execution {
        debug!(op = op.name(), repo = %self.repo.working_dir().display(), "Starting operation");
        self.executor.spawn(self.command(op))
    }

    /// Start `op` and call `handler` exactly once with its outcome.
    pub fn start_with_handler<F>(&self, op: &Operation, handler: F) -> ProcessHandle
    where
        F: FnOnce(Result<OutputLog>) + Send + 'static,
    {
        self.executor.spawn_with_handler(self.command(op), handler)
    }

    /// Run `op` to completion.
    pub async fn run(&self, op: &Operation) -> Result<OutputLog> {
        self.start(op).wait().await
    }

    pub async fn init(&self) -> Result<OutputLog> {
        self.run(&Operation::Init).await
    }

    /// Clone `url` into this repository's location, checking out `branch`
    /// (`master` when `None`).
    pub async fn clone_from(&self, url: &str, branch: Option<&str>) -> Result<OutputLog> {
        self.run(&Operation::Clone {
            url: url.to_string(),
            branch: branch.unwrap_or(DEFAULT_CLONE_BRANCH).to_string(),
        })
        .await
    }

    pub async fn add_remote(&self, name: &str, url: &str) -> Result<OutputLog> {
        self.run(&Operation::AddRemote {
            name: name.to_string(),
            url: url.to_string(),
        })
        .await
    }

    /// Stage `target`, a path relative to the working tree.
    pub async fn add(&self, target: impl AsRef<Path>) -> Result<OutputLog> {
        self.run(&Operation::Add {
            path: target.as_ref().to_path_buf(),
        })
        .await
    }

    /// Move the file at `source` into the working tree at `target`, then
    /// stage it.
    ///
    /// If the move fails git is never invoked and the move error is returned.
    pub async fn add_from(
        &self,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
    ) -> Result<OutputLog> {
        let tree_dir = self.repo.tree_dir().ok_or_else(|| Error::NoWorkTree {
            git_dir: self.repo.git_dir().to_path_buf(),
        })?;
        let from = source.as_ref();
        let to = tree_dir.join(target.as_ref());

        tokio::fs::rename(from, &to)
            .await
            .map_err(|e| Error::Move {
                from: from.to_path_buf(),
                to: to.clone(),
                source: e,
            })?;
        debug!(from = %from.display(), to = %to.display(), "Moved file into working tree");

        self.add(target).await
    }

    pub async fn commit(&self, message: &str) -> Result<OutputLog> {
        self.run(&Operation::Commit {
            message: message.to_string(),
        })
        .await
    }

    pub async fn pull(&self, remote: &str, refspec: &str) -> Result<OutputLog> {
        self.run(&Operation::Pull {
            remote: remote.to_string(),
            refspec: refspec.to_string(),
        })
        .await
    }

    pub async fn push(&self, remote: &str, refspec: &str) -> Result<OutputLog> {
        self.run(&Operation::Push {
            remote: remote.to_string(),
            refspec: refspec.to_string(),
        })
        .await
    }

    pub async fn update_submodules(&self) -> Result<OutputLog> {
        self.run(&Operation::UpdateSubmodules).await
    }

    /// Local branch names in `git branch` order.
    pub async fn list_branches(&self) -> Result<Vec<String>> {
        let log = self.run(&Operation::ListBranches).await?;
        Ok(parse::parse_branches(&log))
    }

    /// Local branch name to tip-commit short hash.
    pub async fn list_branches_and_tip_commits(&self) -> Result<BTreeMap<String, String>> {
        let log = self.run(&Operation::ListBranchesAndTipCommits).await?;
        Ok(parse::parse_branches_with_tips(&log))
    }
}
