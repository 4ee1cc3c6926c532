//! Repository for the `georegion` table.
//!
//! Geometries travel as GeoJSON text and are converted by PostGIS; areas
//! are computed on the geography type, i.e. in square metres.

use fds_core::region::tree::{depth_of, TreePlacement};
use fds_core::region::RegionKind;
use fds_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::georegion::{GeoRegion, GeoRegionFields, GeoRegionTreeRow, TreePosition};

/// Column list for `georegion` queries (geometry columns excluded).
const COLUMNS: &str = "\
    id, name, slug, kind, kind_detail, level, region_identifier, \
    global_identifier, population, area, valid_on, invalid_on, part_of_id, \
    data, path, depth, numchild, created_at, updated_at";

/// Provides reads and writes for administrative regions.
pub struct GeoRegionRepo;

impl GeoRegionRepo {
    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GeoRegion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM georegion WHERE id = $1");
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Region with this padded identifier and kind.
    pub async fn find_by_identifier(
        pool: &PgPool,
        region_identifier: &str,
        kind: RegionKind,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM georegion \
             WHERE region_identifier = $1 AND kind = $2 \
             ORDER BY id LIMIT 1"
        );
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(region_identifier)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Region of `kind` named `name` inside the district `prefix`.
    pub async fn find_by_district_and_name(
        pool: &PgPool,
        prefix: &str,
        kind: RegionKind,
        name: &str,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM georegion \
             WHERE region_identifier LIKE $1 || '%' AND kind = $2 AND name = $3 \
             ORDER BY id LIMIT 1"
        );
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(prefix)
            .bind(kind.as_str())
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Region of `kind` inside the district `prefix` that formerly carried
    /// `former_identifier`.
    pub async fn find_by_former_identifier(
        pool: &PgPool,
        prefix: &str,
        kind: RegionKind,
        former_identifier: &str,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM georegion \
             WHERE region_identifier LIKE $1 || '%' AND kind = $2 \
               AND (data -> 'former_ars') @> jsonb_build_array($3::text) \
             ORDER BY id LIMIT 1"
        );
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(prefix)
            .bind(kind.as_str())
            .bind(former_identifier)
            .fetch_optional(pool)
            .await
    }

    /// Closest-level region with this identifier among `kinds`, strictly
    /// above `child_level`.
    pub async fn find_parent(
        pool: &PgPool,
        region_identifier: &str,
        kinds: &[RegionKind],
        child_level: i32,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM georegion \
             WHERE region_identifier = $1 AND kind = ANY($2) AND level < $3 \
             ORDER BY level DESC, id LIMIT 1"
        );
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(region_identifier)
            .bind(&kinds)
            .bind(child_level)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(
        pool: &PgPool,
        slug: &str,
        kind: RegionKind,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM georegion WHERE slug = $1 AND kind = $2");
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(slug)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Current region of `kind` whose area contains the given geometry.
    pub async fn find_containing(
        pool: &PgPool,
        kind: RegionKind,
        geometry: &serde_json::Value,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM georegion \
             WHERE kind = $1 AND invalid_on IS NULL \
               AND ST_Contains(geom, ST_PointOnSurface(ST_SetSRID(ST_GeomFromGeoJSON($2::text), 4326))) \
             ORDER BY id LIMIT 1"
        );
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(kind.as_str())
            .bind(geometry.to_string())
            .fetch_optional(pool)
            .await
    }

    /// Identifiers of all current regions of `kind`.
    pub async fn identifiers_of_kind(
        pool: &PgPool,
        kind: RegionKind,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT region_identifier FROM georegion \
             WHERE kind = $1 AND invalid_on IS NULL",
        )
        .bind(kind.as_str())
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a region at `position` with no children.
    pub async fn create(
        pool: &PgPool,
        fields: &GeoRegionFields,
        position: &TreePosition,
    ) -> Result<GeoRegion, sqlx::Error> {
        let query = format!(
            "INSERT INTO georegion (\
                name, slug, kind, kind_detail, level, region_identifier, \
                global_identifier, geom, area, valid_on, invalid_on, \
                part_of_id, data, path, depth, numchild\
             ) VALUES (\
                $1, $2, $3, $4, $5, $6, $7, \
                ST_SetSRID(ST_GeomFromGeoJSON($8::text), 4326), \
                COALESCE(ST_Area(ST_SetSRID(ST_GeomFromGeoJSON($8::text), 4326)::geography), 0), \
                $9, NULL, $10, $11, $12, $13, 0\
             ) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(&fields.name)
            .bind(&fields.slug)
            .bind(fields.kind.as_str())
            .bind(&fields.kind_detail)
            .bind(fields.kind.level())
            .bind(&fields.region_identifier)
            .bind(&fields.global_identifier)
            .bind(fields.geometry.as_ref().map(|g| g.to_string()))
            .bind(fields.valid_on)
            .bind(fields.part_of_id)
            .bind(&fields.data)
            .bind(&position.path)
            .bind(position.depth)
            .fetch_one(pool)
            .await
    }

    /// Overwrite a region's attributes and mark it current. The data bag is
    /// merged; the tree position only changes when `position` is given.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        fields: &GeoRegionFields,
        position: Option<&TreePosition>,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let query = format!(
            "UPDATE georegion SET \
                name = $2, slug = $3, kind = $4, kind_detail = $5, level = $6, \
                region_identifier = $7, global_identifier = $8, \
                geom = COALESCE(ST_SetSRID(ST_GeomFromGeoJSON($9::text), 4326), geom), \
                area = COALESCE(ST_Area(ST_SetSRID(ST_GeomFromGeoJSON($9::text), 4326)::geography), area), \
                valid_on = $10, invalid_on = NULL, part_of_id = $11, \
                data = data || $12, \
                path = COALESCE($13, path), depth = COALESCE($14, depth), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeoRegion>(&query)
            .bind(id)
            .bind(&fields.name)
            .bind(&fields.slug)
            .bind(fields.kind.as_str())
            .bind(&fields.kind_detail)
            .bind(fields.kind.level())
            .bind(&fields.region_identifier)
            .bind(&fields.global_identifier)
            .bind(fields.geometry.as_ref().map(|g| g.to_string()))
            .bind(fields.valid_on)
            .bind(fields.part_of_id)
            .bind(&fields.data)
            .bind(position.map(|p| p.path.as_str()))
            .bind(position.map(|p| p.depth))
            .fetch_optional(pool)
            .await
    }

    pub async fn increment_numchild(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE georegion SET numchild = numchild + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn decrement_numchild(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE georegion SET numchild = GREATEST(numchild - 1, 0) WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Set `invalid_on` on the listed current regions of `kind`.
    pub async fn mark_invalid(
        pool: &PgPool,
        kind: RegionKind,
        identifiers: &[String],
        invalid_on: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE georegion SET invalid_on = $3, updated_at = now() \
             WHERE kind = $1 AND region_identifier = ANY($2) AND invalid_on IS NULL",
        )
        .bind(kind.as_str())
        .bind(identifiers)
        .bind(invalid_on)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_population(
        pool: &PgPool,
        id: DbId,
        population: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE georegion SET population = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(population)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the seat of administration on every region with this identifier.
    pub async fn set_gov_seat(
        pool: &PgPool,
        region_identifier: &str,
        point: &serde_json::Value,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE georegion \
             SET gov_seat = ST_PointOnSurface(ST_SetSRID(ST_GeomFromGeoJSON($2::text), 4326)), \
                 updated_at = now() \
             WHERE region_identifier = $1",
        )
        .bind(region_identifier)
        .bind(point.to_string())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Merge one key into a region's data bag.
    pub async fn set_data_value(
        pool: &PgPool,
        id: DbId,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE georegion SET data = data || jsonb_build_object($2::text, $3::jsonb), \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tree
    // -----------------------------------------------------------------------

    pub async fn path_exists(pool: &PgPool, path: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM georegion WHERE path = $1)")
            .bind(path)
            .fetch_one(pool)
            .await
    }

    /// Path of the last child of `parent_path`, or of the last root.
    pub async fn last_child_path(
        pool: &PgPool,
        parent_path: Option<&str>,
    ) -> Result<Option<String>, sqlx::Error> {
        let prefix = parent_path.unwrap_or("");
        let depth = depth_of(prefix) + 1;
        sqlx::query_scalar::<_, String>(
            "SELECT path FROM georegion \
             WHERE path LIKE $1 || '%' AND depth = $2 \
             ORDER BY path COLLATE \"C\" DESC LIMIT 1",
        )
        .bind(prefix)
        .bind(depth)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_tree_rows(pool: &PgPool) -> Result<Vec<GeoRegionTreeRow>, sqlx::Error> {
        sqlx::query_as::<_, GeoRegionTreeRow>(
            "SELECT id, part_of_id, name FROM georegion ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }

    /// Write recomputed tree fields for all given regions in one transaction.
    pub async fn apply_tree_placements(
        pool: &PgPool,
        placements: &[TreePlacement],
    ) -> Result<u64, sqlx::Error> {
        let ids: Vec<DbId> = placements.iter().map(|p| p.id).collect();
        let paths: Vec<&str> = placements.iter().map(|p| p.path.as_str()).collect();
        let depths: Vec<i32> = placements.iter().map(|p| p.depth).collect();
        let numchild: Vec<i32> = placements.iter().map(|p| p.numchild).collect();

        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE georegion g \
             SET path = t.path, depth = t.depth, numchild = t.numchild \
             FROM UNNEST($1::bigint[], $2::text[], $3::int[], $4::int[]) \
                  AS t(id, path, depth, numchild) \
             WHERE g.id = t.id",
        )
        .bind(&ids)
        .bind(&paths)
        .bind(&depths)
        .bind(&numchild)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
