use crate::trace::TraceWriter;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Error type for non-zero process exit codes.
///
/// Carries only the program name: arguments may contain one-time tokens.
#[derive(Debug, thiserror::Error)]
#[error("Exit code {exit_code} returned from process '{file_name}'.")]
pub struct ProcessExitCodeError {
    pub exit_code: i32,
    pub file_name: String,
}

/// Which stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A single line written by the child process.
#[derive(Debug, Clone)]
pub struct ProcessDataReceivedEventArgs {
    pub stream: OutputStream,
    pub data: String,
}

/// Exit status plus everything the child printed, in arrival order.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub lines: Vec<ProcessDataReceivedEventArgs>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether any captured line contains `needle` (case-insensitive).
    pub fn any_line_contains(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.lines
            .iter()
            .any(|l| l.data.to_lowercase().contains(&needle))
    }

    /// Turn a non-zero exit into a `ProcessExitCodeError`.
    pub fn ensure_success(&self, file_name: &str) -> Result<(), ProcessExitCodeError> {
        if self.success() {
            Ok(())
        } else {
            Err(ProcessExitCodeError {
                exit_code: self.exit_code,
                file_name: file_name.to_string(),
            })
        }
    }
}

/// Spawns a child process, streams its stdout/stderr line by line, and waits
/// for it to exit.
///
/// stdin is inherited so that an elevation helper such as `sudo` can prompt
/// on the operator's terminal.
pub struct ProcessInvoker {
    trace: Arc<dyn TraceWriter>,
}

impl ProcessInvoker {
    /// Create a new `ProcessInvoker` with the given trace writer.
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self { trace }
    }

    /// Run `file_name` with `arguments` in `working_directory`.
    ///
    /// `on_line` is called for every output line as it arrives. Spawn
    /// failures are returned as the underlying `io::Error` so callers can
    /// inspect its kind.
    pub async fn execute(
        &self,
        working_directory: &Path,
        file_name: &str,
        arguments: &[String],
        on_line: &mut (dyn FnMut(&ProcessDataReceivedEventArgs) + Send),
    ) -> io::Result<ProcessOutput> {
        assert!(!file_name.is_empty(), "file_name must not be empty");

        self.trace.info("Starting process:");
        self.trace.info(&format!("  File name: '{file_name}'"));
        self.trace
            .info(&format!("  Arguments: '{}'", arguments.join(" ")));
        self.trace.info(&format!(
            "  Working directory: '{}'",
            working_directory.display()
        ));

        let mut cmd = Command::new(file_name);
        cmd.args(arguments);
        if working_directory.is_dir() {
            cmd.current_dir(working_directory);
        }
        cmd.stdin(std::process::Stdio::inherit());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd.spawn()?;
        let pid = child.id().unwrap_or(0);
        self.trace.info(&format!(
            "Process started with process id {pid}, waiting for process exit."
        ));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let stdout_task = child
            .stdout
            .take()
            .map(|s| tokio::spawn(forward_lines(s, OutputStream::Stdout, tx.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|s| tokio::spawn(forward_lines(s, OutputStream::Stderr, tx.clone())));
        drop(tx);

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            self.trace.verbose(&line.data);
            on_line(&line);
            lines.push(line);
        }

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        let status = child.wait().await?;
        let exit_code = status.code().unwrap_or(-1);

        self.trace.info(&format!(
            "Finished process {pid} with exit code {exit_code}, and elapsed time {:.2?}.",
            start.elapsed()
        ));

        Ok(ProcessOutput { exit_code, lines })
    }
}

async fn forward_lines<R>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<ProcessDataReceivedEventArgs>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(data)) = lines.next_line().await {
        if tx.send(ProcessDataReceivedEventArgs { stream, data }).is_err() {
            break;
        }
    }
}
