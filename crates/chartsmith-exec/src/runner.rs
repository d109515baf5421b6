//! Process execution
//!
//! Both output pipes are drained by their own task for the whole lifetime of
//! the child. A child blocked on a full stdout/stderr pipe while we block on
//! its exit would never finish.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{ExecError, Result};
use crate::sink::{OutputSink, Redactor, TracingSink};

/// Runs [`Command`]s and streams their output to an [`OutputSink`]
#[derive(Clone)]
pub struct CommandRunner {
    sink: Arc<dyn OutputSink>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner").finish_non_exhaustive()
    }
}

impl CommandRunner {
    /// Runner logging through `tracing`
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink::new()))
    }

    pub fn with_sink(sink: Arc<dyn OutputSink>) -> Self {
        Self { sink }
    }

    /// Run `cmd` to completion
    ///
    /// A non-zero exit fails with `on_failure` as the message. There is no
    /// timeout; callers wanting one wrap this future.
    pub async fn execute(&self, cmd: &Command, on_failure: &str) -> Result<()> {
        let rendered = cmd.to_string();
        debug!(command = %rendered, "executing");

        let mut child = tokio::process::Command::new(cmd.executable())
            .args(cmd.render())
            .stdin(if cmd.stdin_input().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        let redactor = Arc::new(Redactor::new(cmd.secrets()));

        let readers: Vec<JoinHandle<()>> = [
            child
                .stdout
                .take()
                .map(|out| self.spawn_reader(out, Stream::Stdout, redactor.clone())),
            child
                .stderr
                .take()
                .map(|err| self.spawn_reader(err, Stream::Stderr, redactor.clone())),
        ]
        .into_iter()
        .flatten()
        .collect();

        if let (Some(input), Some(mut stdin)) = (cmd.stdin_input(), child.stdin.take()) {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                warn!(command = %rendered, error = %e, "failed to write process stdin");
            }
            // dropping closes the pipe so the child sees EOF
            drop(stdin);
        }

        let status = child.wait().await.map_err(|source| ExecError::Wait {
            command: rendered.clone(),
            source,
        })?;

        for reader in readers {
            if let Err(e) = reader.await {
                warn!(command = %rendered, error = %e, "output reader task failed");
            }
        }

        if !status.success() {
            debug!(command = %rendered, %status, "command failed");
            return Err(ExecError::Failed {
                message: on_failure.to_string(),
                command: rendered,
                status,
            });
        }

        Ok(())
    }

    fn spawn_reader<R>(&self, reader: R, stream: Stream, redactor: Arc<Redactor>) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = self.sink.clone();
        tokio::spawn(drain(reader, stream, sink, redactor))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "stdout"),
            Stream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Forward every line of `reader` to the sink until EOF
///
/// Invalid UTF-8 is replaced rather than treated as an error so the pipe
/// keeps being drained.
async fn drain<R>(reader: R, stream: Stream, sink: Arc<dyn OutputSink>, redactor: Arc<Redactor>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let raw = String::from_utf8_lossy(&buf);
                let line = redactor.redact(raw.trim_end_matches(['\n', '\r']));
                match stream {
                    Stream::Stdout => sink.stdout_line(&line),
                    Stream::Stderr => sink.stderr_line(&line),
                }
            }
            Err(e) => {
                warn!(%stream, error = %e, "failed reading process output");
                break;
            }
        }
    }
}
