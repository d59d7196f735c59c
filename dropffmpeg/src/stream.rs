//! Live HLS encoding with an ffmpeg child process
//!
//! [`HlsStream::spawn`] starts ffmpeg on an input file and returns the
//! process handle together with the receiving end of the progress channel.
//! Each parsed `-progress` report is sent on the channel; the channel is
//! closed when ffmpeg closes its stdout. Only the tail of stderr is kept
//! for the error report.

use crate::error::HlsStreamError;
use crate::options::{HlsStreamArgs, HlsStreamOptions};
use crate::progress::{HlsStreamProgress, ProgressReader};
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the progress channel
const PROGRESS_CHANNEL_SIZE: usize = 64;

/// Bytes of stderr kept for [`HlsStreamError::Exit`]
const STDERR_TAIL_SIZE: usize = 64 * 1024;

/// A running ffmpeg HLS encoder
///
/// The child process is killed when the handle is dropped.
pub struct HlsStream {
    child: Child,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<String>,
}

impl HlsStream {
    /// Starts ffmpeg on `input`, writing HLS files into `working_directory`
    pub fn spawn(
        input: &Path,
        working_directory: &Path,
        options: &HlsStreamOptions,
    ) -> Result<(Self, mpsc::Receiver<HlsStreamProgress>), HlsStreamError> {
        Self::spawn_program("ffmpeg", input, working_directory, options)
    }

    /// Same as [`HlsStream::spawn`] with another encoder executable
    pub fn spawn_program(
        program: impl AsRef<OsStr>,
        input: &Path,
        working_directory: &Path,
        options: &HlsStreamOptions,
    ) -> Result<(Self, mpsc::Receiver<HlsStreamProgress>), HlsStreamError> {
        let program = program.as_ref();
        let args = HlsStreamArgs::from(options).command_line(input);
        debug!(?program, ?args, "Spawning HLS encoder");

        let mut child = Command::new(program)
            .args(&args)
            .current_dir(working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(HlsStreamError::Spawn)?;

        info!(pid = child.id(), input=%input.display(), "🎙️ HLS encoder started");

        let stdout = child.stdout.take().ok_or_else(|| {
            HlsStreamError::Io(std::io::Error::other("ffmpeg stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            HlsStreamError::Io(std::io::Error::other("ffmpeg stderr not captured"))
        })?;

        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_SIZE);

        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut reader = ProgressReader::new();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(report) = reader.push_line(&line) {
                            if tx.send(report).await.is_err() {
                                debug!("Progress receiver dropped, ignoring further reports");
                                break;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read ffmpeg progress output: {}", e);
                        break;
                    }
                }
            }
        });

        let stderr_task = tokio::spawn(read_tail(stderr, STDERR_TAIL_SIZE));

        Ok((
            Self {
                child,
                stdout_task,
                stderr_task,
            },
            rx,
        ))
    }

    /// Kills the encoder if it is still running
    pub async fn kill(&mut self) -> Result<(), HlsStreamError> {
        if self.child.try_wait()?.is_none() {
            info!(pid = self.child.id(), "Killing HLS encoder");
            self.child.kill().await?;
        }
        Ok(())
    }

    /// Waits for the encoder to exit
    ///
    /// Succeeds only on a zero exit code.
    pub async fn wait(mut self) -> Result<(), HlsStreamError> {
        let status = self.child.wait().await?;
        let _ = (&mut self.stdout_task).await;
        let stderr = (&mut self.stderr_task).await.unwrap_or_default();
        exit_result(status, stderr)
    }
}

/// Reads `reader` to the end, keeping only its last `capacity` bytes
async fn read_tail<R: AsyncRead + Unpin>(mut reader: R, capacity: usize) -> String {
    let mut tail = VecDeque::with_capacity(capacity);
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let overflow = (tail.len() + n).saturating_sub(capacity);
                tail.drain(..overflow.min(tail.len()));
                let skip = n.saturating_sub(capacity);
                tail.extend(&chunk[skip..n]);
            }
            Err(e) => {
                warn!("Failed to read ffmpeg stderr: {}", e);
                break;
            }
        }
    }
    String::from_utf8_lossy(tail.make_contiguous()).into_owned()
}

fn exit_result(status: ExitStatus, stderr: String) -> Result<(), HlsStreamError> {
    match status.code() {
        Some(0) => {
            info!("HLS encoder completed");
            Ok(())
        }
        Some(code) => Err(HlsStreamError::Exit { code, stderr }),
        None => Err(HlsStreamError::Signal(signal_of(&status))),
    }
}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &ExitStatus) -> Option<i32> {
    None
}
