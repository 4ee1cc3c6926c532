//! Monthly OSM amenity refresh.
//!
//! Stages, in order:
//!
//! | stage              | work                                             |
//! |--------------------|--------------------------------------------------|
//! | `download`         | stream the extract into a scratch directory      |
//! | `ingest_boundaries`| link administrative boundaries to regions        |
//! | `convert_to_nodes` | `osmconvert --all-to-nodes`                      |
//! | `filter_tags`      | `osmosis` keeps nodes carrying a topic tag       |
//! | `import`           | platform import of the filtered XML              |
//! | `persist`          | record today as the last successful update       |
//!
//! The scratch directory is removed however the run ends; the last-update
//! file is only written when every stage succeeded.

pub mod amenity_importer;
pub mod boundary_importer;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use fds_cloud::{DownloadError, Downloader};
use fds_core::error::CoreError;
use fds_core::osm::{osmconvert_args, osmosis_args, AmenityTopics};
use fds_core::tooling::{ToolError, ToolInvocation, ToolRunner};

use crate::georegion::IngestError;

pub use amenity_importer::{AmenityImporter, CommandAmenityImporter};
pub use boundary_importer::{
    BoundaryImportReport, BoundaryImporter, BoundarySource, OgrBoundarySource, OsmBoundary,
    RegionBoundaryImporter,
};

pub const DEFAULT_EXTRACT_URL: &str = "https://download.geofabrik.de/europe/germany-latest.osm.pbf";
pub const LAST_UPDATE_FILENAME: &str = "amenity_last_update.txt";

const NODES_FILENAME: &str = "germany_nodes.pbf";
const OUTPUT_FILENAME: &str = "amenities.xml";
const FALLBACK_EXTRACT_FILENAME: &str = "extract.osm.pbf";
const TOOL_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStage {
    Download,
    IngestBoundaries,
    ConvertToNodes,
    FilterTags,
    Import,
    Persist,
}

impl RefreshStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::IngestBoundaries => "ingest_boundaries",
            Self::ConvertToNodes => "convert_to_nodes",
            Self::FilterTags => "filter_tags",
            Self::Import => "import",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for RefreshStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] CoreError),

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Boundary import failed: {0}")]
    Boundaries(#[from] IngestError),

    #[error("Stage {stage} failed: {source}")]
    Tool {
        stage: RefreshStage,
        #[source]
        source: ToolError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefreshError {
    /// Stage a failure happened in, where it is tied to one.
    pub fn stage(&self) -> Option<RefreshStage> {
        match self {
            Self::Config(_) | Self::Io(_) => None,
            Self::Download(_) => Some(RefreshStage::Download),
            Self::Boundaries(_) => Some(RefreshStage::IngestBoundaries),
            Self::Tool { stage, .. } => Some(*stage),
        }
    }
}

/// Settings of the refresh.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub extract_url: String,
    pub topics: AmenityTopics,
    /// Directory holding the last-update file.
    pub state_dir: PathBuf,
    pub tool_timeout: Duration,
    pub osmconvert: String,
    pub osmosis: String,
}

impl RefreshConfig {
    pub fn new(topics: AmenityTopics, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            extract_url: DEFAULT_EXTRACT_URL.to_string(),
            topics,
            state_dir: state_dir.into(),
            tool_timeout: TOOL_TIMEOUT,
            osmconvert: "osmconvert".to_string(),
            osmosis: "osmosis".to_string(),
        }
    }

    pub fn last_update_path(&self) -> PathBuf {
        self.state_dir.join(LAST_UPDATE_FILENAME)
    }

    fn extract_filename(&self) -> &str {
        self.extract_url
            .split(['?', '#'])
            .next()
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_EXTRACT_FILENAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub downloaded_bytes: u64,
    pub boundaries: BoundaryImportReport,
    pub previous_update: Option<NaiveDate>,
    pub completed_on: NaiveDate,
}

/// Runs the refresh stages over injected collaborators.
pub struct AmenityRefresh {
    config: RefreshConfig,
    downloader: Arc<dyn Downloader>,
    runner: Arc<dyn ToolRunner>,
    boundaries: Arc<dyn BoundaryImporter>,
    importer: Arc<dyn AmenityImporter>,
}

impl AmenityRefresh {
    pub fn new(
        config: RefreshConfig,
        downloader: Arc<dyn Downloader>,
        runner: Arc<dyn ToolRunner>,
        boundaries: Arc<dyn BoundaryImporter>,
        importer: Arc<dyn AmenityImporter>,
    ) -> Self {
        Self {
            config,
            downloader,
            runner,
            boundaries,
            importer,
        }
    }

    pub async fn run(&self, today: NaiveDate) -> Result<RefreshReport, RefreshError> {
        let filter = self.config.topics.tag_filter();
        let previous_update = read_last_update(&self.config.state_dir).await;

        let scratch = tempfile::Builder::new().prefix("amenities").tempdir()?;
        let extract = scratch.path().join(self.config.extract_filename());
        let nodes = scratch.path().join(NODES_FILENAME);
        let xml = scratch.path().join(OUTPUT_FILENAME);
        let osmosis = osmosis_args(&filter, &nodes, &xml)?;

        stage_started(RefreshStage::Download);
        let downloaded_bytes = self
            .downloader
            .download(&self.config.extract_url, &extract)
            .await?;
        tracing::info!(url = %self.config.extract_url, bytes = downloaded_bytes, "Downloaded extract");

        stage_started(RefreshStage::IngestBoundaries);
        let boundaries = self.boundaries.import(&extract).await?;

        stage_started(RefreshStage::ConvertToNodes);
        self.run_tool(
            RefreshStage::ConvertToNodes,
            &self.config.osmconvert,
            osmconvert_args(&extract, &nodes),
            scratch.path(),
        )
        .await?;

        stage_started(RefreshStage::FilterTags);
        self.run_tool(RefreshStage::FilterTags, &self.config.osmosis, osmosis, scratch.path())
            .await?;

        stage_started(RefreshStage::Import);
        self.importer
            .import(&xml, previous_update)
            .await
            .map_err(|source| RefreshError::Tool {
                stage: RefreshStage::Import,
                source,
            })?;

        stage_started(RefreshStage::Persist);
        write_last_update(&self.config.state_dir, today).await?;
        scratch.close()?;

        tracing::info!(%today, previous = ?previous_update, "Amenity refresh complete");
        Ok(RefreshReport {
            downloaded_bytes,
            boundaries,
            previous_update,
            completed_on: today,
        })
    }

    async fn run_tool(
        &self,
        stage: RefreshStage,
        program: &str,
        args: Vec<String>,
        working_dir: &Path,
    ) -> Result<(), RefreshError> {
        let invocation = ToolInvocation::new(program)
            .args(args)
            .working_dir(working_dir)
            .timeout(self.config.tool_timeout);
        let output = self
            .runner
            .run(invocation)
            .await
            .map_err(|source| RefreshError::Tool { stage, source })?;
        tracing::info!(%stage, program, elapsed_ms = output.duration_ms, "Tool finished");
        Ok(())
    }
}

fn stage_started(stage: RefreshStage) {
    tracing::info!(%stage, "Refresh stage started");
}

/// Date of the last successful refresh. A missing or unreadable file means
/// there was none.
pub async fn read_last_update(state_dir: &Path) -> Option<NaiveDate> {
    let raw = tokio::fs::read_to_string(state_dir.join(LAST_UPDATE_FILENAME))
        .await
        .ok()?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub async fn write_last_update(state_dir: &Path, date: NaiveDate) -> std::io::Result<()> {
    tokio::fs::write(
        state_dir.join(LAST_UPDATE_FILENAME),
        date.format("%Y-%m-%d").to_string(),
    )
    .await
}
