//! [`RegionStore`] over Postgres/PostGIS.

use async_trait::async_trait;
use fds_core::region::tree::{TreeNode, TreePlacement};
use fds_core::region::RegionKind;
use fds_core::types::{DbId, Timestamp};
use fds_db::models::georegion::{GeoRegion, GeoRegionFields, TreePosition};
use fds_db::repositories::GeoRegionRepo;
use serde_json::Value;
use sqlx::PgPool;

use super::store::RegionStore;

/// Delegates to [`GeoRegionRepo`] on a shared pool.
#[derive(Clone)]
pub struct PgRegionStore {
    pool: PgPool,
}

impl PgRegionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegionStore for PgRegionStore {
    async fn find_by_id(&self, id: DbId) -> Result<Option<GeoRegion>, sqlx::Error> {
        GeoRegionRepo::find_by_id(&self.pool, id).await
    }

    async fn find_by_identifier(
        &self,
        region_identifier: &str,
        kind: RegionKind,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        GeoRegionRepo::find_by_identifier(&self.pool, region_identifier, kind).await
    }

    async fn find_by_district_and_name(
        &self,
        prefix: &str,
        kind: RegionKind,
        name: &str,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        GeoRegionRepo::find_by_district_and_name(&self.pool, prefix, kind, name).await
    }

    async fn find_by_former_identifier(
        &self,
        prefix: &str,
        kind: RegionKind,
        former_identifier: &str,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        GeoRegionRepo::find_by_former_identifier(&self.pool, prefix, kind, former_identifier).await
    }

    async fn find_parent(
        &self,
        region_identifier: &str,
        kinds: &[RegionKind],
        child_level: i32,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        GeoRegionRepo::find_parent(&self.pool, region_identifier, kinds, child_level).await
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        kind: RegionKind,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        GeoRegionRepo::find_by_slug(&self.pool, slug, kind).await
    }

    async fn find_containing(
        &self,
        kind: RegionKind,
        geometry: &Value,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        GeoRegionRepo::find_containing(&self.pool, kind, geometry).await
    }

    async fn identifiers_of_kind(&self, kind: RegionKind) -> Result<Vec<String>, sqlx::Error> {
        GeoRegionRepo::identifiers_of_kind(&self.pool, kind).await
    }

    async fn create(
        &self,
        fields: &GeoRegionFields,
        position: &TreePosition,
    ) -> Result<GeoRegion, sqlx::Error> {
        GeoRegionRepo::create(&self.pool, fields, position).await
    }

    async fn update(
        &self,
        id: DbId,
        fields: &GeoRegionFields,
        position: Option<&TreePosition>,
    ) -> Result<GeoRegion, sqlx::Error> {
        GeoRegionRepo::update(&self.pool, id, fields, position)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn increment_numchild(&self, id: DbId) -> Result<(), sqlx::Error> {
        GeoRegionRepo::increment_numchild(&self.pool, id).await
    }

    async fn decrement_numchild(&self, id: DbId) -> Result<(), sqlx::Error> {
        GeoRegionRepo::decrement_numchild(&self.pool, id).await
    }

    async fn mark_invalid(
        &self,
        kind: RegionKind,
        identifiers: &[String],
        invalid_on: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        GeoRegionRepo::mark_invalid(&self.pool, kind, identifiers, invalid_on).await
    }

    async fn update_population(&self, id: DbId, population: i64) -> Result<(), sqlx::Error> {
        if GeoRegionRepo::update_population(&self.pool, id, population).await? {
            Ok(())
        } else {
            Err(sqlx::Error::RowNotFound)
        }
    }

    async fn set_gov_seat(&self, region_identifier: &str, point: &Value) -> Result<u64, sqlx::Error> {
        GeoRegionRepo::set_gov_seat(&self.pool, region_identifier, point).await
    }

    async fn set_data_value(&self, id: DbId, key: &str, value: &Value) -> Result<(), sqlx::Error> {
        GeoRegionRepo::set_data_value(&self.pool, id, key, value).await
    }

    async fn path_exists(&self, path: &str) -> Result<bool, sqlx::Error> {
        GeoRegionRepo::path_exists(&self.pool, path).await
    }

    async fn last_child_path(&self, parent_path: Option<&str>) -> Result<Option<String>, sqlx::Error> {
        GeoRegionRepo::last_child_path(&self.pool, parent_path).await
    }

    async fn list_tree_nodes(&self) -> Result<Vec<TreeNode>, sqlx::Error> {
        let rows = GeoRegionRepo::list_tree_rows(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| TreeNode {
                id: row.id,
                parent_id: row.part_of_id,
                name: row.name,
            })
            .collect())
    }

    async fn apply_tree_placements(&self, placements: &[TreePlacement]) -> Result<(), sqlx::Error> {
        let updated = GeoRegionRepo::apply_tree_placements(&self.pool, placements).await?;
        tracing::debug!(updated, "Applied tree rebuild");
        Ok(())
    }
}
