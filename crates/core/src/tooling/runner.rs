//! Tool invocation interface and shared types.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Default cap on captured stdout or stderr (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child process (current dir if `None`).
    pub working_dir: Option<PathBuf>,
    /// Wall-clock limit; the process is killed when it expires.
    pub timeout: Duration,
    /// Bytes captured per output stream. The rest is drained and dropped.
    pub max_output_bytes: usize,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    /// Program and arguments as one line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Raw stdout; binary-safe for tools that emit documents.
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("{program} timed out after {elapsed_ms}ms")]
    Timeout { program: String, elapsed_ms: u64 },

    /// Exit code is `-1` when the process was killed by a signal.
    #[error("{program} failed with exit code {exit_code}: {stderr}")]
    ExecutionFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs external commands. A non-zero exit status is an error.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
