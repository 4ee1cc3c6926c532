//! Request PDF rendering through the platform's command line.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fds_core::tooling::{ToolInvocation, ToolRunner};
use fds_db::models::account::FoiRequestSummary;

use super::BackupError;

/// Renders a request as PDF.
#[async_trait]
pub trait PdfGenerator: Send + Sync {
    async fn generate(&self, request: &FoiRequestSummary) -> Result<Vec<u8>, BackupError>;
}

const PDF_TIMEOUT: Duration = Duration::from_secs(300);
const MAX_PDF_BYTES: usize = 512 * 1024 * 1024;

/// [`PdfGenerator`] running a command with the request id appended and
/// taking the PDF from stdout.
pub struct CommandPdfGenerator {
    program: String,
    args: Vec<String>,
    runner: Arc<dyn ToolRunner>,
}

impl CommandPdfGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            program: program.into(),
            args,
            runner,
        }
    }

    /// Split a whitespace-separated command line. `None` when empty.
    pub fn from_command_line(command: &str, runner: Arc<dyn ToolRunner>) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect(), runner))
    }

    fn invocation(&self, request: &FoiRequestSummary) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .args(self.args.iter().cloned())
            .arg(request.id.to_string())
            .timeout(PDF_TIMEOUT)
            .max_output_bytes(MAX_PDF_BYTES)
    }
}

#[async_trait]
impl PdfGenerator for CommandPdfGenerator {
    async fn generate(&self, request: &FoiRequestSummary) -> Result<Vec<u8>, BackupError> {
        let output = self.runner.run(self.invocation(request)).await?;
        if output.stdout.is_empty() {
            return Err(BackupError::EmptyPdf(request.id));
        }
        Ok(output.stdout)
    }
}
