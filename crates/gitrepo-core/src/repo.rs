//! Repository handle: where a repository lives on disk.

use std::path::{Component, Path, PathBuf};

use crate::error::Result;

/// On-disk layout of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    /// Checked-out files at `tree_dir`, metadata at `tree_dir/.git`.
    WorkTree { tree_dir: PathBuf, git_dir: PathBuf },
    /// Metadata only.
    Bare { git_dir: PathBuf },
}

/// Identifies one working tree or bare repository.
///
/// Immutable once constructed. A handle carries no state about the repository
/// contents; everything on disk is owned by git itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    layout: Layout,
}

impl Repository {
    /// Create a handle for `path`.
    ///
    /// A non-bare repository uses `path` as its working tree and `path/.git` as
    /// its metadata directory; a bare one uses `path` as the metadata directory.
    /// Relative paths are resolved against the current directory and `.`/`..`
    /// components are normalized away.
    pub fn new(path: impl AsRef<Path>, bare: bool) -> Result<Self> {
        let path = normalize(&std::path::absolute(path.as_ref())?);
        let layout = if bare {
            Layout::Bare { git_dir: path }
        } else {
            Layout::WorkTree {
                git_dir: path.join(".git"),
                tree_dir: path,
            }
        };
        Ok(Self { layout })
    }

    /// Handle for a repository with a working tree at `path`.
    pub fn work_tree(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(path, false)
    }

    /// Handle for a bare repository at `path`.
    pub fn bare(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(path, true)
    }

    /// The checked-out files, absent for bare repositories.
    pub fn tree_dir(&self) -> Option<&Path> {
        match &self.layout {
            Layout::WorkTree { tree_dir, .. } => Some(tree_dir),
            Layout::Bare { .. } => None,
        }
    }

    /// The metadata directory.
    pub fn git_dir(&self) -> &Path {
        match &self.layout {
            Layout::WorkTree { git_dir, .. } | Layout::Bare { git_dir } => git_dir,
        }
    }

    pub const fn is_bare(&self) -> bool {
        matches!(self.layout, Layout::Bare { .. })
    }

    /// The working tree if there is one, else the metadata directory.
    ///
    /// This is the directory git runs in, so no `--git-dir`/`--work-tree`
    /// flags are ever needed.
    pub fn working_dir(&self) -> &Path {
        self.tree_dir().unwrap_or_else(|| self.git_dir())
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
