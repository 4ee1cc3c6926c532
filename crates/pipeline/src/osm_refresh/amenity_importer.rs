//! Hand-off of the filtered amenity nodes to the platform.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use fds_core::tooling::{ToolError, ToolInvocation, ToolRunner};

/// Loads an OSM XML file of amenity nodes into the platform.
#[async_trait]
pub trait AmenityImporter: Send + Sync {
    /// `last_update` is the date of the previous successful refresh, if any;
    /// nodes untouched since then may be skipped.
    async fn import(&self, xml: &Path, last_update: Option<NaiveDate>) -> Result<(), ToolError>;
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// [`AmenityImporter`] running the platform's import command as
/// `<command> <xml> [--timestamp YYYY-MM-DD]`.
pub struct CommandAmenityImporter {
    program: String,
    args: Vec<String>,
    runner: Arc<dyn ToolRunner>,
    timeout: Duration,
}

impl CommandAmenityImporter {
    /// Split a whitespace-separated command line. `None` when empty.
    pub fn from_command_line(command: &str, runner: Arc<dyn ToolRunner>) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        Some(Self {
            program: parts.next()?,
            args: parts.collect(),
            runner,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn invocation(&self, xml: &Path, last_update: Option<NaiveDate>) -> ToolInvocation {
        let mut invocation = ToolInvocation::new(&self.program)
            .args(self.args.iter().cloned())
            .arg(xml.display().to_string())
            .timeout(self.timeout);
        if let Some(date) = last_update {
            invocation = invocation
                .arg("--timestamp")
                .arg(date.format("%Y-%m-%d").to_string());
        }
        invocation
    }
}

#[async_trait]
impl AmenityImporter for CommandAmenityImporter {
    async fn import(&self, xml: &Path, last_update: Option<NaiveDate>) -> Result<(), ToolError> {
        let output = self.runner.run(self.invocation(xml, last_update)).await?;
        tracing::info!(
            xml = %xml.display(),
            elapsed_ms = output.duration_ms,
            "Amenity import finished"
        );
        Ok(())
    }
}
