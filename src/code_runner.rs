//! Runs short code snippets in a local interpreter subprocess.
//!
//! This is not a sandbox. The child runs with the server's privileges; the
//! only limits are a wall-clock deadline and a cap on combined output.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, instrument, warn};

use crate::config::CodeRunnerConfig;
use crate::models::{CodeExecutionRequest, CodeExecutionResult, exit_code};

/// Message reported when the deadline expires
pub const TIMEOUT_MESSAGE: &str = "Python execution timed out";

const READ_CHUNK_BYTES: usize = 8192;

/// How long to keep reading once the interpreter has exited
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Outcomes other than a normal exit, each with a fixed exit code
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error("Python execution timed out")]
    Timeout,

    #[error("Python interpreter not found: {interpreter}")]
    NotFound { interpreter: String },

    #[error("Permission denied when starting interpreter: {interpreter}")]
    PermissionDenied { interpreter: String },

    #[error("Output exceeded the {limit} byte limit; execution was stopped")]
    OutputOverflow { limit: usize },

    #[error("Process terminated by signal {}", describe_signal(.signal))]
    Signaled { signal: Option<i32> },

    #[error("Failed to run code: {0}")]
    Io(#[source] io::Error),

    #[error("Unexpected error during code execution: {0}")]
    Unexpected(String),
}

fn describe_signal(signal: &Option<i32>) -> String {
    signal.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}

impl RunFailure {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            RunFailure::Timeout => exit_code::TIMEOUT,
            RunFailure::NotFound { .. } => exit_code::NOT_FOUND,
            RunFailure::PermissionDenied { .. } => exit_code::PERMISSION_DENIED,
            RunFailure::Signaled { .. } => exit_code::SIGNALED,
            RunFailure::OutputOverflow { .. } | RunFailure::Io(_) | RunFailure::Unexpected(_) => {
                exit_code::FAILURE
            }
        }
    }

    /// Fold the failure and whatever was captured into the wire result.
    /// A signalled process keeps its own stderr when it wrote any.
    fn into_result(self, captured: CapturedOutput) -> CodeExecutionResult {
        let exit_code = self.exit_code();
        let (stdout, captured_stderr) = captured.into_strings();
        let stderr = match self {
            RunFailure::Signaled { .. } if !captured_stderr.is_empty() => captured_stderr,
            failure => failure.to_string(),
        };
        CodeExecutionResult::new(stdout, stderr, exit_code)
    }
}

#[derive(Debug, Default)]
struct CapturedOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl CapturedOutput {
    fn len(&self) -> usize {
        self.stdout.len() + self.stderr.len()
    }

    /// Trim to `limit` combined bytes, keeping stdout first. Never splits a
    /// UTF-8 character.
    fn truncate_to(&mut self, limit: usize) {
        self.stdout.truncate(char_boundary_at_or_below(&self.stdout, limit));
        let remaining = limit - self.stdout.len();
        self.stderr.truncate(char_boundary_at_or_below(&self.stderr, remaining));
    }

    fn into_strings(self) -> (String, String) {
        (
            String::from_utf8_lossy(&self.stdout).into_owned(),
            String::from_utf8_lossy(&self.stderr).into_owned(),
        )
    }
}

/// Largest cut point `<= limit` that does not fall inside a UTF-8 sequence
fn char_boundary_at_or_below(bytes: &[u8], limit: usize) -> usize {
    if bytes.len() <= limit {
        return bytes.len();
    }
    let mut end = limit;
    // Continuation bytes look like 0b10xx_xxxx; a sequence has at most three.
    while end > 0 && limit - end < 3 && bytes[end] & 0xC0 == 0x80 {
        end -= 1;
    }
    if bytes[end] & 0xC0 == 0x80 { limit } else { end }
}

/// Interpreter subprocess launcher
#[derive(Debug, Clone)]
pub struct CodeRunner {
    interpreter: String,
    args: Vec<String>,
    timeout: Duration,
    max_output_bytes: usize,
}

impl CodeRunner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

    /// Runner for `interpreter`, reading the program from stdin (`-u -`)
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            args: vec!["-u".to_string(), "-".to_string()],
            timeout: Self::DEFAULT_TIMEOUT,
            max_output_bytes: Self::DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    #[must_use]
    pub fn from_config(config: &CodeRunnerConfig) -> Self {
        Self::new(config.interpreter.clone())
            .with_args(config.args.iter().cloned())
            .with_timeout(config.timeout())
            .with_max_output_bytes(config.max_output_bytes)
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    #[must_use]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Execute the request. Never fails; every outcome is a
    /// [`CodeExecutionResult`].
    #[instrument(
        skip(self, request),
        fields(interpreter = %self.interpreter, source_bytes = request.source_text().len())
    )]
    pub async fn run(&self, request: &CodeExecutionRequest) -> CodeExecutionResult {
        let start_time = Instant::now();
        let runner = self.clone();
        let source = request.source_text().to_owned();

        let result = match tokio::spawn(async move { runner.execute(source).await }).await {
            Ok(result) => result,
            Err(join_error) => {
                warn!("Code execution task failed: {}", join_error);
                RunFailure::Unexpected(join_error.to_string()).into_result(CapturedOutput::default())
            }
        };

        info!(
            exit_code = result.exit_code,
            "Code execution finished in {:.3}s",
            start_time.elapsed().as_secs_f64()
        );
        result
    }

    async fn execute(&self, source: String) -> CodeExecutionResult {
        let mut child = match self.spawn() {
            Ok(child) => child,
            Err(e) => {
                let failure = self.launch_failure(e);
                warn!("Could not start interpreter: {}", failure);
                return failure.into_result(CapturedOutput::default());
            }
        };

        let mut captured = CapturedOutput::default();
        let outcome =
            match tokio::time::timeout(self.timeout, self.drive(&mut child, source, &mut captured))
                .await
            {
                Ok(outcome) => outcome,
                Err(_elapsed) => Err(RunFailure::Timeout),
            };

        match outcome {
            Ok(status) => classify_exit(status, captured),
            Err(failure) => {
                warn!("Code execution failed: {}", failure);
                if let Err(e) = child.kill().await {
                    debug!("Could not kill interpreter process: {}", e);
                }
                failure.into_result(captured)
            }
        }
    }

    fn spawn(&self) -> io::Result<Child> {
        debug!("Spawning {} {:?}", self.interpreter, self.args);
        Command::new(&self.interpreter)
            .args(&self.args)
            .env("PYTHONUNBUFFERED", "1")
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONUTF8", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }

    fn launch_failure(&self, err: io::Error) -> RunFailure {
        match err.kind() {
            io::ErrorKind::NotFound => RunFailure::NotFound {
                interpreter: self.interpreter.clone(),
            },
            io::ErrorKind::PermissionDenied => RunFailure::PermissionDenied {
                interpreter: self.interpreter.clone(),
            },
            _ => RunFailure::Io(err),
        }
    }

    /// Feed stdin while draining both pipes and reaping the child
    async fn drive(
        &self,
        child: &mut Child,
        source: String,
        captured: &mut CapturedOutput,
    ) -> Result<ExitStatus, RunFailure> {
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunFailure::Unexpected("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunFailure::Unexpected("stderr was not captured".to_string()))?;

        let ((), outcome) = tokio::join!(
            feed_stdin(stdin, source),
            self.reap(child, stdout, stderr, captured)
        );
        outcome
    }

    /// Collect output until the pipes close or the interpreter exits,
    /// whichever comes first, and return the real exit status.
    async fn reap(
        &self,
        child: &mut Child,
        stdout: ChildStdout,
        stderr: ChildStderr,
        captured: &mut CapturedOutput,
    ) -> Result<ExitStatus, RunFailure> {
        let collect = collect_output(stdout, stderr, self.max_output_bytes, captured);
        tokio::pin!(collect);

        tokio::select! {
            collected = &mut collect => {
                collected?;
                child.wait().await.map_err(RunFailure::Io)
            }
            status = child.wait() => {
                let status = status.map_err(RunFailure::Io)?;
                // Background processes can hold the pipes open after the interpreter exits.
                match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut collect).await {
                    Ok(collected) => collected?,
                    Err(_elapsed) => debug!("Output pipes still open after interpreter exit"),
                }
                Ok(status)
            }
        }
    }
}

async fn feed_stdin(stdin: Option<ChildStdin>, source: String) {
    let Some(mut stdin) = stdin else {
        return;
    };
    // The interpreter may exit before reading everything; that is its business.
    if let Err(e) = stdin.write_all(source.as_bytes()).await {
        debug!("Interpreter closed stdin early: {}", e);
    }
}

async fn collect_output<O, E>(
    mut stdout: O,
    mut stderr: E,
    limit: usize,
    captured: &mut CapturedOutput,
) -> Result<(), RunFailure>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out_chunk = vec![0u8; READ_CHUNK_BYTES];
    let mut err_chunk = vec![0u8; READ_CHUNK_BYTES];
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_chunk), if out_open => {
                let n = read.map_err(RunFailure::Io)?;
                if n == 0 {
                    out_open = false;
                } else {
                    captured.stdout.extend_from_slice(&out_chunk[..n]);
                }
            }
            read = stderr.read(&mut err_chunk), if err_open => {
                let n = read.map_err(RunFailure::Io)?;
                if n == 0 {
                    err_open = false;
                } else {
                    captured.stderr.extend_from_slice(&err_chunk[..n]);
                }
            }
        }

        if captured.len() > limit {
            captured.truncate_to(limit);
            return Err(RunFailure::OutputOverflow { limit });
        }
    }

    Ok(())
}

fn classify_exit(status: ExitStatus, captured: CapturedOutput) -> CodeExecutionResult {
    match status.code() {
        Some(code) => {
            let (stdout, stderr) = captured.into_strings();
            CodeExecutionResult::new(stdout, stderr, code)
        }
        None => RunFailure::Signaled {
            signal: termination_signal(&status),
        }
        .into_result(captured),
    }
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
