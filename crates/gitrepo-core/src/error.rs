//! Error types for the `gitrepo` core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::executor::OutputLog;

/// Result type alias using the `gitrepo` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a git operation.
///
/// Every variant reaches the caller through the operation's completion,
/// never synchronously from the call that started it.
#[derive(Debug, Error)]
pub enum Error {
    /// The subprocess could not be started (missing binary, permission denied).
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess could not be started because its working directory is
    /// missing. Kept apart from [`Error::Launch`], which means the program
    /// itself was not found or not runnable.
    #[error("Working directory {} is not available: {source}", cwd.display())]
    WorkingDir {
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess exited unsuccessfully.
    ///
    /// `message` is the last captured output line, which is where git puts its
    /// final error summary. When stdout and stderr interleave it may instead be
    /// an unrelated trailing line.
    #[error("{message}")]
    Exit {
        code: Option<i32>,
        message: String,
        log: OutputLog,
    },

    /// Moving a file into the working tree failed before git was invoked.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operation needs a working tree but the repository is bare.
    #[error("Repository at {} has no working tree", git_dir.display())]
    NoWorkTree { git_dir: PathBuf },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Captured output accompanying the failure, if the subprocess ran.
    pub const fn log(&self) -> Option<&OutputLog> {
        match self {
            Self::Exit { log, .. } => Some(log),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn exit_error_displays_last_line_only() {
        let err = Error::Exit {
            code: Some(128),
            message: "fatal: not a git repository".into(),
            log: OutputLog::default(),
        };
        assert_eq!(err.to_string(), "fatal: not a git repository");
        assert!(err.log().is_some());
    }

    #[test]
    fn move_error_names_both_paths() {
        let err = Error::Move {
            from: PathBuf::from("/tmp/a"),
            to: PathBuf::from("/repo/b"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let text = err.to_string();
        assert!(text.contains("/tmp/a"));
        assert!(text.contains("/repo/b"));
        assert!(err.log().is_none());
    }
}
