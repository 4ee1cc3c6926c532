//! Subprocess-backed [`ToolRunner`].

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::runner::{ToolError, ToolInvocation, ToolOutput, ToolRunner};

/// Spawns the invocation as a child process with piped output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %invocation.command_line(), "Starting tool");
        let start = Instant::now();

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound(invocation.program.clone()),
            _ => ToolError::Io(e),
        })?;

        // Read both streams in tasks so `child.wait()` can borrow `child`.
        let limit = invocation.max_output_bytes;
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let stdout_task = tokio::spawn(async move { read_stream(stdout_handle, limit).await });
        let stderr_task = tokio::spawn(async move { read_stream(stderr_handle, limit).await });

        // On timeout `child` is dropped here and killed.
        let status = match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_elapsed) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                tracing::warn!(program = %invocation.program, elapsed_ms, "Tool timed out");
                return Err(ToolError::Timeout {
                    program: invocation.program,
                    elapsed_ms,
                });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr_bytes = stderr_task.await.unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
        let exit_code = status.code().unwrap_or(-1);

        if !status.success() {
            return Err(ToolError::ExecutionFailed {
                program: invocation.program,
                exit_code,
                stderr,
            });
        }

        tracing::debug!(program = %invocation.program, duration_ms, "Tool finished");
        Ok(ToolOutput {
            stdout,
            stderr,
            exit_code,
            duration_ms,
        })
    }
}

/// Read up to `limit` bytes of a stream, then drain the rest so the child
/// never blocks on a full pipe.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>, limit: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(limit as u64).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
