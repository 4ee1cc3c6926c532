//! Region models and DTOs.

use fds_core::region::RegionKind;
use fds_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `georegion` table, without the geometry columns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeoRegion {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    pub kind: String,
    pub kind_detail: String,
    pub level: i32,
    pub region_identifier: String,
    pub global_identifier: String,
    pub population: Option<i64>,
    pub area: f64,
    pub valid_on: Option<Timestamp>,
    pub invalid_on: Option<Timestamp>,
    pub part_of_id: Option<DbId>,
    pub data: serde_json::Value,
    pub path: String,
    pub depth: i32,
    pub numchild: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GeoRegion {
    /// Identifiers this region carried in earlier dataset releases.
    pub fn former_ars(&self) -> Vec<String> {
        self.data
            .get("former_ars")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Parent link of a region, for tree rebuilds.
#[derive(Debug, Clone, FromRow)]
pub struct GeoRegionTreeRow {
    pub id: DbId,
    pub part_of_id: Option<DbId>,
    pub name: String,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Attributes written on every upsert.
#[derive(Debug, Clone)]
pub struct GeoRegionFields {
    pub name: String,
    pub slug: String,
    pub kind: RegionKind,
    pub kind_detail: String,
    pub region_identifier: String,
    pub global_identifier: String,
    /// GeoJSON geometry in WGS84; area is derived from it.
    pub geometry: Option<serde_json::Value>,
    pub valid_on: Option<Timestamp>,
    /// Merged into the stored data bag, overwriting matching keys.
    pub data: serde_json::Value,
    pub part_of_id: Option<DbId>,
}

/// Tree position for a new or moved region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePosition {
    pub path: String,
    pub depth: i32,
}
