//! Command builder: operation + parameters to git argument vector.
//!
//! Building depends only on the operation, the repository handle and the
//! explicit environment. The one filesystem lookup is locating where `init`
//! and `clone` can start from. Argument values are always discrete vector
//! elements; no shell ever sees them.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::repo::Repository;

/// Branch checked out by `clone` when the caller does not name one.
pub const DEFAULT_CLONE_BRANCH: &str = "master";

/// A git operation with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create the repository (`--bare` for bare handles).
    Init,
    /// Clone `url` into the repository location, checking out `branch`.
    Clone { url: String, branch: String },
    /// Register a remote.
    AddRemote { name: String, url: String },
    /// Stage a path relative to the working tree.
    Add { path: PathBuf },
    /// Record staged changes.
    Commit { message: String },
    /// Fetch and merge `refspec` from `remote`.
    Pull { remote: String, refspec: String },
    /// Push `refspec` to `remote`.
    Push { remote: String, refspec: String },
    /// Initialize and update all submodules recursively.
    UpdateSubmodules,
    /// `git branch`
    ListBranches,
    /// `git branch -v`
    ListBranchesAndTipCommits,
}

impl Operation {
    /// `clone` with the default branch.
    pub fn clone_default(url: impl Into<String>) -> Self {
        Self::Clone {
            url: url.into(),
            branch: DEFAULT_CLONE_BRANCH.to_string(),
        }
    }

    /// Short name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Clone { .. } => "clone",
            Self::AddRemote { .. } => "add_remote",
            Self::Add { .. } => "add",
            Self::Commit { .. } => "commit",
            Self::Pull { .. } => "pull",
            Self::Push { .. } => "push",
            Self::UpdateSubmodules => "update_submodules",
            Self::ListBranches => "list_branches",
            Self::ListBranchesAndTipCommits => "list_branches_and_tip_commits",
        }
    }

    /// Build the command that performs this operation on `repo`.
    pub fn build(&self, repo: &Repository) -> GitCommand {
        let mut args: Vec<OsString> = Vec::new();
        let mut cwd = repo.working_dir().to_path_buf();

        match self {
            Self::Init => {
                args.push("init".into());
                if repo.is_bare() {
                    args.push("--bare".into());
                }
                args.push(repo.working_dir().into());
                cwd = creation_dir(repo.working_dir());
            }
            Self::Clone { url, branch } => {
                args.push("clone".into());
                if repo.is_bare() {
                    args.push("--bare".into());
                }
                args.push(url.into());
                args.push(repo.working_dir().into());
                args.push("-b".into());
                args.push(branch.into());
                cwd = creation_dir(repo.working_dir());
            }
            Self::AddRemote { name, url } => {
                args = vec!["remote".into(), "add".into(), name.into(), url.into()];
            }
            Self::Add { path } => args = vec!["add".into(), path.into()],
            Self::Commit { message } => {
                args = vec!["commit".into(), "-m".into(), message.into()];
            }
            Self::Pull { remote, refspec } => {
                args = vec!["pull".into(), remote.into(), refspec.into()];
            }
            Self::Push { remote, refspec } => {
                args = vec!["push".into(), remote.into(), refspec.into()];
            }
            Self::UpdateSubmodules => {
                args = ["submodule", "update", "--init", "--recursive"]
                    .map(OsString::from)
                    .to_vec();
            }
            Self::ListBranches => args.push("branch".into()),
            Self::ListBranchesAndTipCommits => args = vec!["branch".into(), "-v".into()],
        }

        GitCommand {
            args,
            cwd,
            envs: BTreeMap::new(),
        }
    }
}

/// `init` and `clone` create their target and any missing leading
/// directories, so they run from the nearest ancestor that already exists.
/// The target itself is passed as an absolute path.
fn creation_dir(target: &Path) -> PathBuf {
    target
        .ancestors()
        .skip(1)
        .find(|dir| dir.is_dir())
        .map_or_else(|| target.to_path_buf(), Path::to_path_buf)
}

/// A fully built git invocation: what to pass, where, with which environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    /// Arguments after the program name.
    pub args: Vec<OsString>,
    /// Working directory of the subprocess.
    pub cwd: PathBuf,
    /// Extra environment variables layered over the inherited environment.
    pub envs: BTreeMap<String, String>,
}

impl GitCommand {
    /// Layer extra environment variables onto the command.
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

    /// Arguments as displayable text, for logging.
    pub fn display_args(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(cmd: &GitCommand) -> Vec<&str> {
        cmd.args.iter().map(|a| a.to_str().unwrap()).collect()
    }

    fn tree() -> Repository {
        Repository::work_tree("/tmp/gitolite-admin").unwrap()
    }

    #[test]
    fn init_work_tree() {
        let cmd = Operation::Init.build(&tree());
        assert_eq!(args(&cmd), ["init", "/tmp/gitolite-admin"]);
        assert_eq!(cmd.cwd, PathBuf::from("/tmp"));
    }

    #[test]
    fn init_bare_targets_git_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let git_dir = dir.path().join("admin.git");
        let repo = Repository::bare(&git_dir).unwrap();
        let cmd = Operation::Init.build(&repo);
        assert_eq!(args(&cmd), ["init", "--bare", git_dir.to_str().unwrap()]);
        assert_eq!(cmd.cwd, dir.path());
    }

    #[test]
    fn creation_skips_missing_leading_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("a").join("b").join("repo");
        let repo = Repository::work_tree(&target).unwrap();
        for op in [Operation::Init, Operation::clone_default("url")] {
            let cmd = op.build(&repo);
            assert_eq!(cmd.cwd, dir.path(), "{}", op.name());
            assert!(args(&cmd).contains(&target.to_str().unwrap()));
        }
    }

    #[test]
    fn clone_with_branch() {
        let op = Operation::Clone {
            url: "url".into(),
            branch: "dev".into(),
        };
        let cmd = op.build(&tree());
        assert_eq!(args(&cmd), ["clone", "url", "/tmp/gitolite-admin", "-b", "dev"]);
    }

    #[test]
    fn clone_defaults_to_master() {
        let cmd = Operation::clone_default("url").build(&tree());
        assert_eq!(args(&cmd), ["clone", "url", "/tmp/gitolite-admin", "-b", "master"]);
    }

    #[test]
    fn tree_operations_run_in_tree_dir() {
        let repo = tree();
        let cases: Vec<(Operation, Vec<&str>)> = vec![
            (
                Operation::AddRemote {
                    name: "origin".into(),
                    url: "gitrepos:gitolite-admin".into(),
                },
                vec!["remote", "add", "origin", "gitrepos:gitolite-admin"],
            ),
            (
                Operation::Add {
                    path: "keydir/alice.pub".into(),
                },
                vec!["add", "keydir/alice.pub"],
            ),
            (
                Operation::Commit {
                    message: "add key; rm -rf / \"quoted\"".into(),
                },
                vec!["commit", "-m", "add key; rm -rf / \"quoted\""],
            ),
            (
                Operation::Pull {
                    remote: "origin".into(),
                    refspec: "master".into(),
                },
                vec!["pull", "origin", "master"],
            ),
            (
                Operation::Push {
                    remote: "origin".into(),
                    refspec: "master:master".into(),
                },
                vec!["push", "origin", "master:master"],
            ),
            (
                Operation::UpdateSubmodules,
                vec!["submodule", "update", "--init", "--recursive"],
            ),
            (Operation::ListBranches, vec!["branch"]),
            (Operation::ListBranchesAndTipCommits, vec!["branch", "-v"]),
        ];
        for (op, expected) in cases {
            let cmd = op.build(&repo);
            assert_eq!(args(&cmd), expected, "{}", op.name());
            assert_eq!(cmd.cwd, PathBuf::from("/tmp/gitolite-admin"));
            assert!(!args(&cmd).iter().any(|a| a.starts_with("--git-dir")));
        }
    }

    #[test]
    fn bare_repo_runs_in_git_dir() {
        let repo = Repository::bare("/srv/admin.git").unwrap();
        let cmd = Operation::ListBranches.build(&repo);
        assert_eq!(cmd.cwd, PathBuf::from("/srv/admin.git"));
    }

    #[test]
    fn building_is_pure() {
        let repo = tree();
        let op = Operation::Commit {
            message: "msg".into(),
        };
        assert_eq!(op.build(&repo), op.build(&repo));
    }

    #[test]
    fn envs_are_layered() {
        let cmd = Operation::ListBranches
            .build(&tree())
            .with_envs([("GIT_TERMINAL_PROMPT", "0")])
            .with_envs([("LC_ALL", "C")]);
        assert_eq!(cmd.envs.len(), 2);
        assert_eq!(cmd.envs["GIT_TERMINAL_PROMPT"], "0");
        assert_eq!(cmd.display_args(), "branch");
    }
}
