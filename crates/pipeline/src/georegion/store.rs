//! Persistence seam of the region pipelines.

use async_trait::async_trait;
use fds_core::region::tree::{TreeNode, TreePlacement};
use fds_core::region::RegionKind;
use fds_core::types::{DbId, Timestamp};
use fds_db::models::georegion::{GeoRegion, GeoRegionFields, TreePosition};
use serde_json::Value;

/// Region persistence used by boundary ingestion and the OSM boundary
/// import. Geometry work (areas, containment) is the store's business.
#[async_trait]
pub trait RegionStore: Send + Sync {
    async fn find_by_id(&self, id: DbId) -> Result<Option<GeoRegion>, sqlx::Error>;

    async fn find_by_identifier(
        &self,
        region_identifier: &str,
        kind: RegionKind,
    ) -> Result<Option<GeoRegion>, sqlx::Error>;

    /// Region of `kind` named `name` whose identifier starts with `prefix`.
    async fn find_by_district_and_name(
        &self,
        prefix: &str,
        kind: RegionKind,
        name: &str,
    ) -> Result<Option<GeoRegion>, sqlx::Error>;

    /// Region of `kind` whose identifier starts with `prefix` and whose
    /// `former_ars` contains `former_identifier`.
    async fn find_by_former_identifier(
        &self,
        prefix: &str,
        kind: RegionKind,
        former_identifier: &str,
    ) -> Result<Option<GeoRegion>, sqlx::Error>;

    /// Region carrying `region_identifier` among `kinds` with a level below
    /// `child_level`, nearest level first.
    async fn find_parent(
        &self,
        region_identifier: &str,
        kinds: &[RegionKind],
        child_level: i32,
    ) -> Result<Option<GeoRegion>, sqlx::Error>;

    async fn find_by_slug(
        &self,
        slug: &str,
        kind: RegionKind,
    ) -> Result<Option<GeoRegion>, sqlx::Error>;

    /// Current region of `kind` whose area contains `geometry`.
    async fn find_containing(
        &self,
        kind: RegionKind,
        geometry: &Value,
    ) -> Result<Option<GeoRegion>, sqlx::Error>;

    /// Identifiers of the current regions of `kind`.
    async fn identifiers_of_kind(&self, kind: RegionKind) -> Result<Vec<String>, sqlx::Error>;

    async fn create(
        &self,
        fields: &GeoRegionFields,
        position: &TreePosition,
    ) -> Result<GeoRegion, sqlx::Error>;

    /// Overwrite attributes, merge the data bag, clear `invalid_on`, and move
    /// the region when `position` is given.
    async fn update(
        &self,
        id: DbId,
        fields: &GeoRegionFields,
        position: Option<&TreePosition>,
    ) -> Result<GeoRegion, sqlx::Error>;

    async fn increment_numchild(&self, id: DbId) -> Result<(), sqlx::Error>;

    async fn decrement_numchild(&self, id: DbId) -> Result<(), sqlx::Error>;

    async fn mark_invalid(
        &self,
        kind: RegionKind,
        identifiers: &[String],
        invalid_on: Timestamp,
    ) -> Result<u64, sqlx::Error>;

    async fn update_population(&self, id: DbId, population: i64) -> Result<(), sqlx::Error>;

    /// Set the seat of administration of every region with this identifier.
    async fn set_gov_seat(&self, region_identifier: &str, point: &Value) -> Result<u64, sqlx::Error>;

    async fn set_data_value(&self, id: DbId, key: &str, value: &Value) -> Result<(), sqlx::Error>;

    async fn path_exists(&self, path: &str) -> Result<bool, sqlx::Error>;

    /// Path of the last child of `parent_path`, or of the last root.
    async fn last_child_path(&self, parent_path: Option<&str>) -> Result<Option<String>, sqlx::Error>;

    async fn list_tree_nodes(&self) -> Result<Vec<TreeNode>, sqlx::Error>;

    /// Write a full tree rebuild atomically.
    async fn apply_tree_placements(&self, placements: &[TreePlacement]) -> Result<(), sqlx::Error>;
}
