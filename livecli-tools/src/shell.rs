//! Shell command runner with streaming output.

use async_trait::async_trait;
use livecli_core::error::ExecutionError;
use livecli_core::process::{CommandRunner, ShellSpec};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Which child stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of child output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
}

/// Where streamed lines go.
#[derive(Clone)]
enum OutputSink {
    /// Print to the terminal as lines arrive; stderr in red.
    Terminal,
    Channel(mpsc::UnboundedSender<OutputLine>),
}

impl OutputSink {
    fn emit(&self, stream: OutputStream, line: String) {
        match self {
            OutputSink::Terminal => match stream {
                OutputStream::Stdout => println!("{}", line),
                OutputStream::Stderr => eprintln!("\x1b[31m{}\x1b[0m", line),
            },
            OutputSink::Channel(tx) => {
                let _ = tx.send(OutputLine { stream, line });
            }
        }
    }
}

/// Runs commands through a shell, streaming stdout and stderr line by line.
///
/// Standard input is inherited so commands that prompt (e.g. `sudo`) can
/// still read from the terminal.
pub struct ShellRunner {
    sink: OutputSink,
}

impl ShellRunner {
    /// A runner that prints child output to the terminal.
    pub fn new() -> Self {
        Self {
            sink: OutputSink::Terminal,
        }
    }

    /// A runner that sends child output lines to `tx` instead of printing.
    pub fn with_progress(tx: mpsc::UnboundedSender<OutputLine>) -> Self {
        Self {
            sink: OutputSink::Channel(tx),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward every line of `pipe` to `sink`. Invalid UTF-8 is replaced.
async fn forward_lines<R>(pipe: Option<R>, stream: OutputStream, sink: OutputSink)
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return;
    };
    let mut segments = BufReader::new(pipe).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                sink.emit(stream, line.trim_end_matches('\r').to_string());
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, ?stream, "Stopped reading child output");
                break;
            }
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        shell: &ShellSpec,
        working_dir: &Path,
        command: &str,
    ) -> Result<(), ExecutionError> {
        debug!(shell = %shell, cwd = %working_dir.display(), command, "Spawning command");

        let mut child = Command::new(&shell.program)
            .arg(&shell.flag)
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionError::Spawn {
                shell: shell.program.clone(),
                message: e.to_string(),
            })?;

        let stdout_task = tokio::spawn(forward_lines(
            child.stdout.take(),
            OutputStream::Stdout,
            self.sink.clone(),
        ));
        let stderr_task = tokio::spawn(forward_lines(
            child.stderr.take(),
            OutputStream::Stderr,
            self.sink.clone(),
        ));

        let status = child.wait().await.map_err(|e| ExecutionError::Spawn {
            shell: shell.program.clone(),
            message: format!("failed to wait for command: {}", e),
        })?;

        // Both readers drain before the step is considered finished.
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        if status.success() {
            return Ok(());
        }

        let code = status.code().unwrap_or(-1);
        warn!(command, exit_code = code, "Command exited with non-zero status");
        Err(ExecutionError::NonZeroExit { code })
    }
}
