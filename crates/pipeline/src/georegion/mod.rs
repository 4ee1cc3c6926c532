//! Administrative boundary ingestion into the region tree.
//!
//! A [`BoundaryDataset`] yields the features of each layer, a
//! [`RegionStore`] persists them. [`GeoRegionIngester`] upserts layer by
//! layer (parents before children), sweeps regions that disappeared, and
//! finishes with a tree rebuild and the seats of administration.

pub mod dataset;
pub mod ingest;
pub mod pg_store;
pub mod placement;
pub mod store;

use chrono::{DateTime, NaiveDate, Utc};
use fds_core::error::CoreError;
use fds_core::region::feature::berlin_midnight;
use fds_core::region::RegionKind;
use fds_core::tooling::ToolError;

pub use dataset::{BoundaryDataset, OgrDataset};
pub use ingest::{GeoRegionIngester, IngestReport, LayerReport, StatsReport};
pub use pg_store::PgRegionStore;
pub use store::RegionStore;

/// Default validity date of a dataset release.
pub const DEFAULT_VALID_DATE: &str = "2021-01-01";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Dataset reader failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Invalid feature in layer {layer}: {reason}")]
    InvalidFeature { layer: String, reason: String },

    #[error("No {kind} region for {identifier} ({name})")]
    MissingRegion {
        kind: RegionKind,
        identifier: String,
        name: String,
    },
}

/// Options of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// `invalid_on` written to regions missing from the dataset.
    pub valid_date: DateTime<Utc>,
}

impl IngestOptions {
    /// Options for a release valid from `date` (midnight, Europe/Berlin).
    pub fn for_date(date: NaiveDate) -> Result<Self, CoreError> {
        let valid_date = berlin_midnight(date)
            .ok_or_else(|| CoreError::Validation(format!("No local midnight on {date}")))?;
        Ok(Self { valid_date })
    }

    /// Parse a `YYYY-MM-DD` validity date.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
            CoreError::Validation(format!("Invalid validity date '{value}': {e}"))
        })?;
        Self::for_date(date)
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            // 2021-01-01 00:00 Europe/Berlin
            valid_date: DateTime::from_timestamp(1_609_455_600, 0).unwrap_or_default(),
        }
    }
}
