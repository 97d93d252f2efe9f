//! Multi-step workflows built by chaining single operations.
//!
//! Each step starts only after the previous one completed; the core itself
//! never retries, so fallbacks live here as explicit caller-level choices.

use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::executor::OutputLog;
use crate::git::GitRepo;

/// Clone `url` into the repository; if that fails (typically because the
/// checkout already exists), pull `branch` from `remote` instead.
///
/// Returns the log of whichever step succeeded, or the pull failure.
pub async fn clone_or_pull(
    git: &GitRepo,
    url: &str,
    branch: &str,
    remote: &str,
) -> Result<OutputLog> {
    match git.clone_from(url, Some(branch)).await {
        Ok(log) => Ok(log),
        Err(e) => {
            warn!(error = %e, remote, branch, "Clone failed, pulling instead");
            git.pull(remote, branch).await
        }
    }
}

/// Move `source` into the tree at `target`, commit it with `message`, and
/// push `branch` to `remote`. Stops at the first failing step.
pub async fn publish_file(
    git: &GitRepo,
    source: &Path,
    target: &Path,
    message: &str,
    remote: &str,
    branch: &str,
) -> Result<OutputLog> {
    git.add_from(source, target).await?;
    git.commit(message).await?;
    let log = git.push(remote, branch).await?;
    info!(target = %target.display(), remote, branch, "Published file");
    Ok(log)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::error::Error;
    use crate::executor::Executor;
    use crate::repo::Repository;

    #[tokio::test]
    async fn publish_stops_at_failed_move() {
        let dir = TempDir::new().unwrap();
        let git = GitRepo::new(
            Repository::work_tree(dir.path()).unwrap(),
            Executor::new("/nonexistent/bin/git-gitrepo-test"),
        );
        let err = publish_file(
            &git,
            &dir.path().join("absent"),
            Path::new("keydir/absent.pub"),
            "add key",
            "origin",
            "master",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Move { .. }));
    }

    #[tokio::test]
    async fn clone_or_pull_reports_pull_failure() {
        let dir = TempDir::new().unwrap();
        let git = GitRepo::new(
            Repository::work_tree(dir.path().join("checkout")).unwrap(),
            Executor::new("/nonexistent/bin/git-gitrepo-test"),
        );
        let err = clone_or_pull(&git, "gitrepos:gitolite-admin", "master", "origin")
            .await
            .unwrap_err();
        // The clone never created the checkout, so the pull has nowhere to run.
        assert!(matches!(err, Error::WorkingDir { .. }));
    }
}
