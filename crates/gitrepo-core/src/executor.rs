//! Git subprocess executor.
//!
//! Spawns the git binary for a built [`GitCommand`], streams both output
//! pipes into one ordered log and resolves a [`Completion`] once the process
//! has exited *and* both pipes have reached end-of-stream. Waiting on both
//! signals guarantees the final lines of output are in the log before the
//! caller observes it.
//!
//! After a requested termination the pipes get [`TERMINATE_DRAIN_GRACE`] to
//! close. A descendant that inherited them (an ssh transport, a credential
//! helper) can hold them open indefinitely; the completion then resolves
//! with whatever was captured.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::GitCommand;
use crate::error::{Error, Result};

/// How long output is still collected once termination has been requested.
pub const TERMINATE_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Which pipe a chunk of output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// One captured line of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: Stream,
    /// Line text without its trailing newline.
    pub text: String,
}

impl OutputChunk {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: Stream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: Stream::Stderr,
            text: text.into(),
        }
    }
}

/// Everything a subprocess printed, stdout and stderr interleaved in
/// arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLog {
    chunks: Vec<OutputChunk>,
}

impl OutputLog {
    pub fn push(&mut self, chunk: OutputChunk) {
        self.chunks.push(chunk);
    }

    pub fn chunks(&self) -> &[OutputChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The most recently captured line.
    pub fn last_line(&self) -> Option<&str> {
        self.chunks.last().map(|c| c.text.as_str())
    }

    /// All chunks joined into one newline-separated text.
    pub fn joined(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<OutputChunk> for OutputLog {
    fn from_iter<I: IntoIterator<Item = OutputChunk>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}

/// Handle to a running (or finished) git subprocess.
///
/// Cloneable; every clone refers to the same process. The executor never
/// terminates a process on its own; that is the holder's decision.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    id: Uuid,
    pid: Option<u32>,
    cancel: CancellationToken,
}

impl ProcessHandle {
    /// Unique identifier of this execution, as seen in the logs.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// OS process id; `None` if the process never started.
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Kill the subprocess. The completion still resolves, with a failure
    /// reflecting the abnormal exit. No-op once the process has exited.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }
}

/// Resolves exactly once with the outcome of an execution.
///
/// Dropping it does not stop the process; the result is then discarded.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<OutputLog>>,
}

impl Future for Completion {
    type Output = Result<OutputLog>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(Error::Io(std::io::Error::other(
                    "execution task ended without reporting a result",
                )))
            })
        })
    }
}

/// A started execution: the live process handle plus its completion.
#[derive(Debug)]
pub struct Execution {
    pub handle: ProcessHandle,
    pub completion: Completion,
}

impl Execution {
    /// Wait for the process to finish, discarding the handle.
    pub async fn wait(self) -> Result<OutputLog> {
        self.completion.await
    }
}

/// Runs git subprocesses.
#[derive(Debug, Clone)]
pub struct Executor {
    program: PathBuf,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new("git")
    }
}

impl Executor {
    /// Executor running `program` (normally `git`, or a path to it).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Start `command` in the background.
    ///
    /// Never fails synchronously: a process that cannot be launched yields an
    /// execution whose completion is already resolved with [`Error::Launch`].
    /// Must be called from within a Tokio runtime.
    pub fn spawn(&self, command: GitCommand) -> Execution {
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();

        info!(
            op_id = %id,
            program = %self.program.display(),
            args = %command.display_args(),
            cwd = %command.cwd.display(),
            "Spawning subprocess"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .envs(&command.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let pid = match cmd.spawn() {
            Ok(child) => {
                let pid = child.id();
                tokio::spawn(supervise(id, child, cancel.clone(), tx));
                pid
            }
            Err(source) => {
                warn!(op_id = %id, error = %source, "Failed to launch subprocess");
                // Spawn reports a missing cwd with the same NotFound as a
                // missing program; tell them apart here.
                let err = if command.cwd.is_dir() {
                    Error::Launch {
                        program: self.program.display().to_string(),
                        source,
                    }
                } else {
                    Error::WorkingDir {
                        cwd: command.cwd,
                        source,
                    }
                };
                // The receiver is still held locally, so this cannot fail.
                let _ = tx.send(Err(err));
                None
            }
        };

        Execution {
            handle: ProcessHandle { id, pid, cancel },
            completion: Completion { rx },
        }
    }

    /// Start `command` and call `handler` exactly once with its outcome.
    pub fn spawn_with_handler<F>(&self, command: GitCommand, handler: F) -> ProcessHandle
    where
        F: FnOnce(Result<OutputLog>) + Send + 'static,
    {
        let Execution { handle, completion } = self.spawn(command);
        tokio::spawn(async move {
            handler(completion.await);
        });
        handle
    }
}

/// Own the child until it exits and both pipes are drained, then report.
async fn supervise(
    id: Uuid,
    mut child: Child,
    cancel: CancellationToken,
    tx: oneshot::Sender<Result<OutputLog>>,
) {
    let (chunk_tx, mut chunk_rx) = mpsc::channel::<OutputChunk>(64);

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(read_stream(stdout, Stream::Stdout, chunk_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(read_stream(stderr, Stream::Stderr, chunk_tx.clone()));
    }
    // Readers hold the only remaining senders; the channel closes once both
    // have hit end-of-stream.
    drop(chunk_tx);

    let (log, status) = tokio::join!(
        collect(id, chunk_rx, &cancel),
        wait_for_exit(id, &mut child, &cancel)
    );

    let result = match status {
        Ok(status) if status.success() => {
            info!(op_id = %id, lines = log.len(), "Subprocess finished");
            Ok(log)
        }
        Ok(status) => {
            let message = log
                .last_line()
                .map_or_else(|| format!("process exited with {status}"), str::to_owned);
            warn!(op_id = %id, %status, %message, "Subprocess failed");
            Err(Error::Exit {
                code: status.code(),
                message,
                log,
            })
        }
        Err(e) => {
            warn!(op_id = %id, error = %e, "Error waiting for subprocess");
            Err(Error::Io(e))
        }
    };

    if tx.send(result).is_err() {
        debug!(op_id = %id, "Completion dropped, result discarded");
    }
}

/// Gather chunks until both pipes close, or until the drain grace runs out
/// after a termination request.
async fn collect(
    id: Uuid,
    mut chunk_rx: mpsc::Receiver<OutputChunk>,
    cancel: &CancellationToken,
) -> OutputLog {
    let mut log = OutputLog::default();
    let give_up = async {
        cancel.cancelled().await;
        tokio::time::sleep(TERMINATE_DRAIN_GRACE).await;
    };
    tokio::pin!(give_up);

    loop {
        tokio::select! {
            chunk = chunk_rx.recv() => match chunk {
                Some(chunk) => {
                    debug!(op_id = %id, stream = ?chunk.stream, "{}", chunk.text);
                    log.push(chunk);
                }
                None => break,
            },
            () = &mut give_up => {
                warn!(
                    op_id = %id,
                    lines = log.len(),
                    "Output still open after termination, resolving with partial log"
                );
                break;
            }
        }
    }
    log
}

async fn wait_for_exit(
    id: Uuid,
    child: &mut Child,
    cancel: &CancellationToken,
) -> std::io::Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => status,
        () = cancel.cancelled() => {
            info!(op_id = %id, "Terminating subprocess on request");
            if let Err(e) = child.start_kill() {
                warn!(op_id = %id, error = %e, "Failed to kill subprocess");
            }
            child.wait().await
        }
    }
}

async fn read_stream<R>(reader: R, stream: Stream, tx: mpsc::Sender<OutputChunk>)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(mut bytes)) => {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                let chunk = OutputChunk {
                    stream,
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(?stream, error = %e, "Failed to read subprocess output");
                break;
            }
        }
    }
}
