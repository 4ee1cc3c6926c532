//! Linking OSM administrative boundaries to stored regions.

use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use fds_core::osm::{classify_boundary, region_kind_for_admin_level, BoundaryQuery, OsmTags};
use fds_core::region::{BoundaryFeature, RegionKind};
use fds_core::slug::slugify;
use fds_core::tooling::{ToolInvocation, ToolRunner};
use fds_db::models::georegion::{GeoRegion, GeoRegionFields};
use regex::Regex;
use serde_json::{json, Value};

use crate::georegion::dataset::parse_feature_sequence;
use crate::georegion::placement::allocate_child_position;
use crate::georegion::{IngestError, RegionStore};

/// An administrative boundary relation of an OSM extract.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmBoundary {
    pub osm_id: String,
    pub tags: OsmTags,
    /// GeoJSON (multi)polygon in WGS84.
    pub geometry: Value,
}

/// Reads the administrative boundaries of an extract.
#[async_trait]
pub trait BoundarySource: Send + Sync {
    async fn read_boundaries(&self, extract: &Path) -> Result<Vec<OsmBoundary>, IngestError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryImportReport {
    /// Regions that got their `osm_id`.
    pub matched: usize,
    /// Boroughs created or updated.
    pub boroughs: usize,
    pub skipped: usize,
    /// Boundaries with contradicting tags.
    pub rejected: usize,
}

/// Applies the boundaries of an extract to the region table.
#[async_trait]
pub trait BoundaryImporter: Send + Sync {
    async fn import(&self, extract: &Path) -> Result<BoundaryImportReport, IngestError>;
}

// ---------------------------------------------------------------------------
// OgrBoundarySource
// ---------------------------------------------------------------------------

const OGR_LAYER: &str = "multipolygons";
const MAX_BOUNDARY_BYTES: usize = 1024 * 1024 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Attribute columns of GDAL's OSM driver that are not tags.
const NON_TAG_COLUMNS: [&str; 3] = ["osm_id", "osm_way_id", "other_tags"];

/// [`BoundarySource`] reading the `multipolygons` layer with `ogr2ogr`.
pub struct OgrBoundarySource {
    runner: Arc<dyn ToolRunner>,
    program: String,
    timeout: Duration,
    max_output_bytes: usize,
}

impl OgrBoundarySource {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            program: "ogr2ogr".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: MAX_BOUNDARY_BYTES,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    fn invocation(&self, extract: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .args(["-f", "GeoJSONSeq", "/vsistdout/", "-where", "boundary='administrative'"])
            .arg(extract.display().to_string())
            .arg(OGR_LAYER)
            .timeout(self.timeout)
            .max_output_bytes(self.max_output_bytes)
    }
}

#[async_trait]
impl BoundarySource for OgrBoundarySource {
    async fn read_boundaries(&self, extract: &Path) -> Result<Vec<OsmBoundary>, IngestError> {
        let output = self.runner.run(self.invocation(extract)).await?;
        if output.stdout.len() >= self.max_output_bytes {
            return Err(IngestError::InvalidFeature {
                layer: OGR_LAYER.to_string(),
                reason: format!("boundary export exceeds {} bytes", self.max_output_bytes),
            });
        }
        let features = parse_feature_sequence(OGR_LAYER, &output.stdout_text())?;
        Ok(features.into_iter().filter_map(boundary_from_feature).collect())
    }
}

/// Rebuild the tag set of an OSM driver feature: plain columns plus the
/// hstore-encoded `other_tags`.
pub fn boundary_from_feature(feature: BoundaryFeature) -> Option<OsmBoundary> {
    let osm_id = feature.text("osm_id").or_else(|| feature.text("osm_way_id"))?;
    let mut tags = feature
        .text("other_tags")
        .map(|raw| parse_other_tags(&raw))
        .unwrap_or_default();
    for name in feature.attributes.keys() {
        if NON_TAG_COLUMNS.contains(&name.as_str()) {
            continue;
        }
        if let Some(value) = feature.text(name) {
            tags.insert(name.clone(), value);
        }
    }
    Some(OsmBoundary {
        osm_id,
        tags,
        geometry: feature.geometry,
    })
}

static HSTORE_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""((?:[^"\\]|\\.)*)"=>"((?:[^"\\]|\\.)*)""#).expect("valid regex")
});

/// Parse `"key"=>"value","key2"=>"value2"`.
pub fn parse_other_tags(raw: &str) -> OsmTags {
    HSTORE_PAIR_RE
        .captures_iter(raw)
        .map(|caps| (unescape(&caps[1]), unescape(&caps[2])))
        .collect()
}

fn unescape(value: &str) -> String {
    value.replace("\\\"", "\"").replace("\\\\", "\\")
}

// ---------------------------------------------------------------------------
// RegionBoundaryImporter
// ---------------------------------------------------------------------------

/// [`BoundaryImporter`] recording OSM ids on keyed regions and maintaining
/// city boroughs below their municipality.
pub struct RegionBoundaryImporter {
    source: Arc<dyn BoundarySource>,
    store: Arc<dyn RegionStore>,
}

impl RegionBoundaryImporter {
    pub fn new(source: Arc<dyn BoundarySource>, store: Arc<dyn RegionStore>) -> Self {
        Self { source, store }
    }

    async fn find_keyed_region(
        &self,
        region_identifier: &str,
        admin_level: i32,
    ) -> Result<Option<GeoRegion>, IngestError> {
        if let Some(kind) = region_kind_for_admin_level(admin_level) {
            if let Some(region) = self.store.find_by_identifier(region_identifier, kind).await? {
                return Ok(Some(region));
            }
        }
        // Deepest region carrying the key.
        Ok(self
            .store
            .find_parent(region_identifier, &RegionKind::ALL, RegionKind::Borough.level())
            .await?)
    }

    /// Slug of a borough and the region already holding it. When a borough
    /// of another kind detail holds the plain slug, the kind detail is added.
    async fn borough_slot(
        &self,
        municipality: &GeoRegion,
        name: &str,
        kind_detail: &str,
    ) -> Result<(String, Option<GeoRegion>), IngestError> {
        let slug = slugify(&format!("{} {name}", municipality.name));
        match self.store.find_by_slug(&slug, RegionKind::Borough).await? {
            Some(other) if other.kind_detail != kind_detail => {
                let qualified = slugify(&format!("{} {kind_detail} {name}", municipality.name));
                tracing::info!(slug = %slug, taken_by = %other.kind_detail, qualified = %qualified, "Borough slug taken");
                let existing = self.store.find_by_slug(&qualified, RegionKind::Borough).await?;
                Ok((qualified, existing))
            }
            existing => Ok((slug, existing)),
        }
    }

    async fn upsert_borough(
        &self,
        boundary: &OsmBoundary,
        name: &str,
        admin_level: i32,
    ) -> Result<bool, IngestError> {
        let Some(municipality) = self
            .store
            .find_containing(RegionKind::Municipality, &boundary.geometry)
            .await?
        else {
            tracing::debug!(name, osm_id = %boundary.osm_id, "No municipality contains borough");
            return Ok(false);
        };

        let kind_detail = borough_kind_detail(admin_level);
        let (slug, existing) = self.borough_slot(&municipality, name, kind_detail).await?;
        let fields = GeoRegionFields {
            name: name.to_string(),
            slug,
            kind: RegionKind::Borough,
            kind_detail: kind_detail.to_string(),
            region_identifier: municipality.region_identifier.clone(),
            global_identifier: municipality.global_identifier.clone(),
            geometry: Some(boundary.geometry.clone()),
            valid_on: None,
            data: json!({
                "label": name,
                "osm_id": boundary.osm_id,
                "admin_level": admin_level,
            }),
            part_of_id: Some(municipality.id),
        };

        match existing {
            Some(borough) if borough.part_of_id == Some(municipality.id) => {
                self.store.update(borough.id, &fields, None).await?;
            }
            existing => {
                let position = allocate_child_position(self.store.as_ref(), Some(&municipality)).await?;
                self.store.increment_numchild(municipality.id).await?;
                match existing {
                    Some(borough) => {
                        if let Some(old_parent_id) = borough.part_of_id {
                            self.store.decrement_numchild(old_parent_id).await?;
                        }
                        self.store.update(borough.id, &fields, Some(&position)).await?;
                    }
                    None => {
                        self.store.create(&fields, &position).await?;
                    }
                }
            }
        }
        Ok(true)
    }
}

fn borough_kind_detail(admin_level: i32) -> &'static str {
    if admin_level <= 9 {
        "Stadtbezirk"
    } else {
        "Stadtteil"
    }
}

#[async_trait]
impl BoundaryImporter for RegionBoundaryImporter {
    async fn import(&self, extract: &Path) -> Result<BoundaryImportReport, IngestError> {
        let boundaries = self.source.read_boundaries(extract).await?;
        let mut report = BoundaryImportReport::default();

        for boundary in &boundaries {
            let query = match classify_boundary(&boundary.tags) {
                Ok(Some(query)) => query,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(osm_id = %boundary.osm_id, error = %e, "Rejected boundary");
                    report.rejected += 1;
                    continue;
                }
            };

            match query {
                BoundaryQuery::RegionKey {
                    region_identifier,
                    admin_level,
                } => match self.find_keyed_region(&region_identifier, admin_level).await? {
                    Some(region) => {
                        self.store
                            .set_data_value(region.id, "osm_id", &json!(boundary.osm_id))
                            .await?;
                        report.matched += 1;
                    }
                    None => {
                        tracing::debug!(region_identifier = %region_identifier, admin_level, "No region for boundary");
                        report.skipped += 1;
                    }
                },
                BoundaryQuery::Borough { name, admin_level } => {
                    if self.upsert_borough(boundary, &name, admin_level).await? {
                        report.boroughs += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
            }
        }

        tracing::info!(
            boundaries = boundaries.len(),
            matched = report.matched,
            boroughs = report.boroughs,
            skipped = report.skipped,
            rejected = report.rejected,
            "Imported OSM boundaries"
        );
        Ok(report)
    }
}
