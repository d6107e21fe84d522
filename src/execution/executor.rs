//! Command executor - launches a step's shell command and streams its output

use crate::core::StreamKind;
use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// The command could not be started
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to spawn `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// What the handler wants after seeing a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAction {
    Continue,
    /// Kill the process and stop reading
    Abort,
}

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandExit {
    /// Process exited on its own; `-1` when terminated by a signal
    Exited(i32),
    /// Handler asked to abort; the process was killed
    Aborted,
}

/// Receives output chunks as they arrive
pub trait ChunkHandler: Send + Sync {
    fn on_chunk(&self, stream: StreamKind, chunk: &str) -> ChunkAction;
}

/// Runs shell commands - allows for different implementations
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` in `cwd`, feeding output to `handler` until exit or abort
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        handler: &dyn ChunkHandler,
    ) -> Result<CommandExit, SpawnError>;
}

/// Runs commands through the platform shell
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        handler: &dyn ChunkHandler,
    ) -> Result<CommandExit, SpawnError> {
        debug!("Spawning `{}` in {}", command, cwd.display());

        let mut cmd = Self::command(command);
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| SpawnError::Io {
            command: command.to_string(),
            source,
        })?;
        let mut group = ProcessGroup::new(&child);

        let mut stdout = child.stdout.take().map(ChunkReader::new);
        let mut stderr = child.stderr.take().map(ChunkReader::new);

        // The step ends when the shell exits, even if a background job still holds the pipes
        let status = loop {
            let event = tokio::select! {
                chunk = next_chunk(&mut stdout), if stdout.is_some() => Event::Chunk(StreamKind::Stdout, chunk),
                chunk = next_chunk(&mut stderr), if stderr.is_some() => Event::Chunk(StreamKind::Stderr, chunk),
                status = child.wait() => Event::Exited(status),
            };

            match event {
                Event::Chunk(stream, Some(text)) => {
                    if handler.on_chunk(stream, &text) == ChunkAction::Abort {
                        debug!("Aborting `{}` on handler request", command);
                        group.terminate(&mut child).await;
                        return Ok(CommandExit::Aborted);
                    }
                }
                Event::Chunk(StreamKind::Stdout, None) => stdout = None,
                Event::Chunk(StreamKind::Stderr, None) => stderr = None,
                Event::Exited(status) => {
                    break status.map_err(|source| SpawnError::Wait {
                        command: command.to_string(),
                        source,
                    })?;
                }
            }
        };

        let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
        while stdout.is_some() || stderr.is_some() {
            let next = tokio::time::timeout_at(deadline, async {
                tokio::select! {
                    chunk = next_chunk(&mut stdout), if stdout.is_some() => (StreamKind::Stdout, chunk),
                    chunk = next_chunk(&mut stderr), if stderr.is_some() => (StreamKind::Stderr, chunk),
                }
            })
            .await;

            match next {
                Ok((stream, Some(text))) => {
                    if handler.on_chunk(stream, &text) == ChunkAction::Abort {
                        debug!("Aborting `{}` after exit on handler request", command);
                        group.terminate(&mut child).await;
                        return Ok(CommandExit::Aborted);
                    }
                }
                Ok((StreamKind::Stdout, None)) => stdout = None,
                Ok((StreamKind::Stderr, None)) => stderr = None,
                Err(_) => {
                    debug!("`{}` exited; output pipes still held open by a background job", command);
                    break;
                }
            }
        }

        group.release();
        let code = status.code().unwrap_or(-1);
        debug!("`{}` exited with {}", command, code);
        Ok(CommandExit::Exited(code))
    }
}

/// How long to keep reading pipes after the shell has exited
const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

enum Event {
    Chunk(StreamKind, Option<String>),
    Exited(std::io::Result<ExitStatus>),
}

/// The step's process group; killed when dropped unless released
///
/// On Unix the shell leads its own group, so killing the group also stops
/// anything it started. Elsewhere only the shell itself is killed.
struct ProcessGroup {
    pid: Option<u32>,
}

impl ProcessGroup {
    fn new(child: &Child) -> Self {
        Self { pid: child.id() }
    }

    /// The shell exited normally; leave its background jobs alone
    fn release(&mut self) {
        self.pid = None;
    }

    async fn terminate(&mut self, child: &mut Child) {
        if self.kill_group() {
            let _ = child.wait().await;
        } else if let Err(e) = child.kill().await {
            warn!("Failed to kill step process: {}", e);
        }
        self.pid = None;
    }

    #[cfg(unix)]
    fn kill_group(&self) -> bool {
        let Some(pid) = self.pid else {
            return false;
        };
        // SAFETY: killpg only sends a signal; the group id came from our own child
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ESRCH) {
                debug!("Process group {} already gone", pid);
            } else {
                warn!("Failed to kill process group {}: {}", pid, err);
            }
        }
        rc == 0
    }

    #[cfg(not(unix))]
    fn kill_group(&self) -> bool {
        false
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if self.pid.is_some() {
            self.kill_group();
        }
    }
}

async fn next_chunk<R: AsyncRead + Unpin>(reader: &mut Option<ChunkReader<R>>) -> Option<String> {
    match reader {
        Some(reader) => reader.next_chunk().await,
        None => None,
    }
}

/// Reads a pipe in chunks, decoding UTF-8 without splitting characters
struct ChunkReader<R> {
    reader: R,
    decoder: Utf8ChunkDecoder,
    done: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: Utf8ChunkDecoder::default(),
            done: false,
        }
    }

    /// Next decoded chunk, `None` at end of stream
    async fn next_chunk(&mut self) -> Option<String> {
        let mut buf = [0u8; 8192];
        loop {
            if self.done {
                return None;
            }
            match self.reader.read(&mut buf).await {
                Ok(0) => {
                    self.done = true;
                    let rest = self.decoder.finish();
                    if !rest.is_empty() {
                        return Some(rest);
                    }
                }
                Ok(n) => {
                    let text = self.decoder.push(&buf[..n]);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
                Err(e) => {
                    warn!("Error reading command output: {}", e);
                    self.done = true;
                }
            }
        }
    }
}

/// Incremental UTF-8 decoder that holds back incomplete trailing sequences
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Decode as much of `bytes` (plus held-back bytes) as is complete
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is held back at end of stream
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
