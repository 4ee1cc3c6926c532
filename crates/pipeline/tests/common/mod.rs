//! In-memory collaborators for the pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fds_cloud::{ArchiveStorage, DownloadError, Downloader, WebDavError};
use fds_core::region::tree::{depth_of, TreeNode, TreePlacement};
use fds_core::region::{BoundaryFeature, RegionKind};
use fds_core::tooling::{ToolError, ToolInvocation, ToolOutput, ToolRunner};
use fds_core::types::{DbId, Timestamp};
use fds_db::models::account::{AccountUser, FoiRequestSummary};
use fds_db::models::georegion::{GeoRegion, GeoRegionFields, TreePosition};
use fds_pipeline::georegion::{BoundaryDataset, IngestError, RegionStore};
use fds_pipeline::legal_backup::{AccountDirectory, BackupError, PdfGenerator};
use fds_pipeline::osm_refresh::{
    AmenityImporter, BoundaryImportReport, BoundaryImporter, BoundarySource, OsmBoundary,
};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Square polygon with its south-west corner at (`x`, `y`).
pub fn square(x: f64, y: f64, size: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]],
    })
}

/// An importable VG25 feature.
pub fn feature(ars: &str, name: &str) -> BoundaryFeature {
    feature_with(ars, name, json!({}))
}

/// An importable VG25 feature with extra or overriding attributes.
pub fn feature_with(ars: &str, name: &str, extra: Value) -> BoundaryFeature {
    let mut attributes = json!({
        "ARS": ars,
        "GEN": name,
        "BEZ": "Gemeinde",
        "NBD": "nein",
        "NUTS": "DE",
        "BSG": 1,
        "GF": 4,
        "WSK": "2021-01-01",
        "EWZ": 1000,
        "DEBKG_ID": format!("DEBKG{ars}"),
    });
    if let (Some(target), Some(extra)) = (attributes.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
    let Value::Object(map) = attributes else {
        unreachable!()
    };
    BoundaryFeature::new(map, square(10.0, 50.0, 1.0))
}

// ---------------------------------------------------------------------------
// InMemoryRegionStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredRegion {
    region: GeoRegion,
    geometry: Option<Value>,
    gov_seat: Option<Value>,
}

/// [`RegionStore`] keeping rows in a vector. Containment is decided on
/// bounding boxes.
#[derive(Default)]
pub struct InMemoryRegionStore {
    rows: Mutex<Vec<StoredRegion>>,
}

impl InMemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> Vec<GeoRegion> {
        self.rows.lock().unwrap().iter().map(|r| r.region.clone()).collect()
    }

    pub fn get(&self, identifier: &str, kind: RegionKind) -> Option<GeoRegion> {
        self.regions()
            .into_iter()
            .find(|r| r.region_identifier == identifier && r.kind == kind.as_str())
    }

    pub fn by_id(&self, id: DbId) -> Option<GeoRegion> {
        self.regions().into_iter().find(|r| r.id == id)
    }

    pub fn gov_seat(&self, id: DbId) -> Option<Value> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.region.id == id)
            .and_then(|r| r.gov_seat.clone())
    }

    /// Insert a row as is, without any tree bookkeeping.
    pub fn seed(
        &self,
        name: &str,
        kind: RegionKind,
        identifier: &str,
        part_of_id: Option<DbId>,
        path: &str,
        geometry: Option<Value>,
    ) -> DbId {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as DbId + 1;
        let now = Utc::now();
        rows.push(StoredRegion {
            region: GeoRegion {
                id,
                name: name.to_string(),
                slug: fds_core::slug::slugify(name),
                kind: kind.as_str().to_string(),
                kind_detail: String::new(),
                level: kind.level(),
                region_identifier: identifier.to_string(),
                global_identifier: String::new(),
                population: None,
                area: 0.0,
                valid_on: None,
                invalid_on: None,
                part_of_id,
                data: json!({}),
                path: path.to_string(),
                depth: depth_of(path),
                numchild: 0,
                created_at: now,
                updated_at: now,
            },
            geometry,
            gov_seat: None,
        });
        id
    }

    /// Overwrite the stored depth of a row.
    pub fn corrupt_depth(&self, id: DbId, depth: i32) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.region.id == id) {
            row.region.depth = depth;
        }
    }

    fn find<P>(&self, predicate: P) -> Option<GeoRegion>
    where
        P: Fn(&StoredRegion) -> bool,
    {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| predicate(r))
            .min_by_key(|r| r.region.id)
            .map(|r| r.region.clone())
    }
}

fn apply_fields(region: &mut GeoRegion, fields: &GeoRegionFields) {
    region.name = fields.name.clone();
    region.slug = fields.slug.clone();
    region.kind = fields.kind.as_str().to_string();
    region.kind_detail = fields.kind_detail.clone();
    region.level = fields.kind.level();
    region.region_identifier = fields.region_identifier.clone();
    region.global_identifier = fields.global_identifier.clone();
    region.valid_on = fields.valid_on;
    region.invalid_on = None;
    region.part_of_id = fields.part_of_id;
    region.updated_at = Utc::now();
    if let (Some(data), Some(new)) = (region.data.as_object_mut(), fields.data.as_object()) {
        for (key, value) in new {
            data.insert(key.clone(), value.clone());
        }
    }
}

fn duplicate(what: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("duplicate key value violates unique constraint on {what}"))
}

fn bounding_box(geometry: &Value) -> Option<(f64, f64, f64, f64)> {
    let mut points = Vec::new();
    collect_points(geometry.get("coordinates")?, &mut points);
    let first = points.first()?;
    Some(points.iter().fold((first.0, first.1, first.0, first.1), |acc, p| {
        (acc.0.min(p.0), acc.1.min(p.1), acc.2.max(p.0), acc.3.max(p.1))
    }))
}

fn collect_points(value: &Value, points: &mut Vec<(f64, f64)>) {
    let Some(items) = value.as_array() else {
        return;
    };
    if let [Value::Number(x), Value::Number(y), ..] = items.as_slice() {
        if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
            points.push((x, y));
        }
        return;
    }
    for item in items {
        collect_points(item, points);
    }
}

fn center(geometry: &Value) -> Option<(f64, f64)> {
    let (min_x, min_y, max_x, max_y) = bounding_box(geometry)?;
    Some(((min_x + max_x) / 2.0, (min_y + max_y) / 2.0))
}

#[async_trait]
impl RegionStore for InMemoryRegionStore {
    async fn find_by_id(&self, id: DbId) -> Result<Option<GeoRegion>, sqlx::Error> {
        Ok(self.find(|r| r.region.id == id))
    }

    async fn find_by_identifier(
        &self,
        region_identifier: &str,
        kind: RegionKind,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        Ok(self.find(|r| r.region.region_identifier == region_identifier && r.region.kind == kind.as_str()))
    }

    async fn find_by_district_and_name(
        &self,
        prefix: &str,
        kind: RegionKind,
        name: &str,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        Ok(self.find(|r| {
            r.region.region_identifier.starts_with(prefix)
                && r.region.kind == kind.as_str()
                && r.region.name == name
        }))
    }

    async fn find_by_former_identifier(
        &self,
        prefix: &str,
        kind: RegionKind,
        former_identifier: &str,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        Ok(self.find(|r| {
            r.region.region_identifier.starts_with(prefix)
                && r.region.kind == kind.as_str()
                && r.region.former_ars().iter().any(|f| f == former_identifier)
        }))
    }

    async fn find_parent(
        &self,
        region_identifier: &str,
        kinds: &[RegionKind],
        child_level: i32,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .map(|r| &r.region)
            .filter(|r| {
                r.region_identifier == region_identifier
                    && kinds.iter().any(|k| k.as_str() == r.kind)
                    && r.level < child_level
            })
            .min_by_key(|r| (-r.level, r.id))
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str, kind: RegionKind) -> Result<Option<GeoRegion>, sqlx::Error> {
        Ok(self.find(|r| r.region.slug == slug && r.region.kind == kind.as_str()))
    }

    async fn find_containing(
        &self,
        kind: RegionKind,
        geometry: &Value,
    ) -> Result<Option<GeoRegion>, sqlx::Error> {
        let Some((x, y)) = center(geometry) else {
            return Ok(None);
        };
        Ok(self.find(|r| {
            r.region.kind == kind.as_str()
                && r.region.invalid_on.is_none()
                && r.geometry.as_ref().and_then(bounding_box).is_some_and(
                    |(min_x, min_y, max_x, max_y)| min_x <= x && x <= max_x && min_y <= y && y <= max_y,
                )
        }))
    }

    async fn identifiers_of_kind(&self, kind: RegionKind) -> Result<Vec<String>, sqlx::Error> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.region.kind == kind.as_str() && r.region.invalid_on.is_none())
            .map(|r| r.region.region_identifier.clone())
            .collect())
    }

    async fn create(
        &self,
        fields: &GeoRegionFields,
        position: &TreePosition,
    ) -> Result<GeoRegion, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.region.slug == fields.slug && r.region.kind == fields.kind.as_str())
        {
            return Err(duplicate("(slug, kind)"));
        }
        if rows.iter().any(|r| r.region.path == position.path) {
            return Err(duplicate("path"));
        }
        let now = Utc::now();
        let mut region = GeoRegion {
            id: rows.len() as DbId + 1,
            name: String::new(),
            slug: String::new(),
            kind: String::new(),
            kind_detail: String::new(),
            level: 0,
            region_identifier: String::new(),
            global_identifier: String::new(),
            population: None,
            area: 0.0,
            valid_on: None,
            invalid_on: None,
            part_of_id: None,
            data: json!({}),
            path: position.path.clone(),
            depth: position.depth,
            numchild: 0,
            created_at: now,
            updated_at: now,
        };
        apply_fields(&mut region, fields);
        rows.push(StoredRegion {
            region: region.clone(),
            geometry: fields.geometry.clone(),
            gov_seat: None,
        });
        Ok(region)
    }

    async fn update(
        &self,
        id: DbId,
        fields: &GeoRegionFields,
        position: Option<&TreePosition>,
    ) -> Result<GeoRegion, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| {
            r.region.id != id && r.region.slug == fields.slug && r.region.kind == fields.kind.as_str()
        }) {
            return Err(duplicate("(slug, kind)"));
        }
        let row = rows
            .iter_mut()
            .find(|r| r.region.id == id)
            .ok_or(sqlx::Error::RowNotFound)?;
        apply_fields(&mut row.region, fields);
        if fields.geometry.is_some() {
            row.geometry = fields.geometry.clone();
        }
        if let Some(position) = position {
            row.region.path = position.path.clone();
            row.region.depth = position.depth;
        }
        Ok(row.region.clone())
    }

    async fn increment_numchild(&self, id: DbId) -> Result<(), sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.region.id == id) {
            row.region.numchild += 1;
        }
        Ok(())
    }

    async fn decrement_numchild(&self, id: DbId) -> Result<(), sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.region.id == id) {
            row.region.numchild = (row.region.numchild - 1).max(0);
        }
        Ok(())
    }

    async fn mark_invalid(
        &self,
        kind: RegionKind,
        identifiers: &[String],
        invalid_on: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        let mut count = 0;
        for row in rows.iter_mut().filter(|r| {
            r.region.kind == kind.as_str()
                && r.region.invalid_on.is_none()
                && identifiers.contains(&r.region.region_identifier)
        }) {
            row.region.invalid_on = Some(invalid_on);
            count += 1;
        }
        Ok(count)
    }

    async fn update_population(&self, id: DbId, population: i64) -> Result<(), sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.region.id == id)
            .ok_or(sqlx::Error::RowNotFound)?;
        row.region.population = Some(population);
        Ok(())
    }

    async fn set_gov_seat(&self, region_identifier: &str, point: &Value) -> Result<u64, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        let mut count = 0;
        for row in rows
            .iter_mut()
            .filter(|r| r.region.region_identifier == region_identifier)
        {
            row.gov_seat = Some(point.clone());
            count += 1;
        }
        Ok(count)
    }

    async fn set_data_value(&self, id: DbId, key: &str, value: &Value) -> Result<(), sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.region.id == id)
            .ok_or(sqlx::Error::RowNotFound)?;
        if let Some(data) = row.region.data.as_object_mut() {
            data.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    async fn path_exists(&self, path: &str) -> Result<bool, sqlx::Error> {
        Ok(self.rows.lock().unwrap().iter().any(|r| r.region.path == path))
    }

    async fn last_child_path(&self, parent_path: Option<&str>) -> Result<Option<String>, sqlx::Error> {
        let prefix = parent_path.unwrap_or("");
        let depth = depth_of(prefix) + 1;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.region.path.starts_with(prefix) && r.region.depth == depth)
            .map(|r| r.region.path.clone())
            .max())
    }

    async fn list_tree_nodes(&self) -> Result<Vec<TreeNode>, sqlx::Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| TreeNode {
                id: r.region.id,
                parent_id: r.region.part_of_id,
                name: r.region.name.clone(),
            })
            .collect())
    }

    async fn apply_tree_placements(&self, placements: &[TreePlacement]) -> Result<(), sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        for placement in placements {
            if let Some(row) = rows.iter_mut().find(|r| r.region.id == placement.id) {
                row.region.path = placement.path.clone();
                row.region.depth = placement.depth;
                row.region.numchild = placement.numchild;
            }
        }
        Ok(())
    }
}

/// Check the stored tree: unique paths, depth matching path length,
/// children under their parent's path and exact child counts.
pub fn assert_tree_consistent(regions: &[GeoRegion]) {
    let by_id: HashMap<DbId, &GeoRegion> = regions.iter().map(|r| (r.id, r)).collect();
    let mut paths: Vec<&str> = regions.iter().map(|r| r.path.as_str()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), regions.len(), "tree paths must be unique");

    for region in regions {
        assert_eq!(region.depth, depth_of(&region.path), "depth of {}", region.name);
        let children = regions.iter().filter(|r| r.part_of_id == Some(region.id)).count();
        assert_eq!(region.numchild as usize, children, "numchild of {}", region.name);
        match region.part_of_id {
            Some(parent_id) => {
                let parent = by_id[&parent_id];
                assert!(region.path.starts_with(&parent.path), "{} under {}", region.name, parent.name);
                assert_eq!(region.depth, parent.depth + 1, "depth of {}", region.name);
            }
            None => assert_eq!(region.depth, 1, "{} is a root", region.name),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeDataset
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDataset {
    layers: HashMap<String, Vec<BoundaryFeature>>,
    reads: Mutex<Vec<(String, u32)>>,
}

impl FakeDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(mut self, name: &str, features: Vec<BoundaryFeature>) -> Self {
        self.layers.insert(name.to_string(), features);
        self
    }

    pub fn reads(&self) -> Vec<(String, u32)> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BoundaryDataset for FakeDataset {
    async fn read_layer(&self, layer: &str, target_srid: u32) -> Result<Vec<BoundaryFeature>, IngestError> {
        self.reads.lock().unwrap().push((layer.to_string(), target_srid));
        Ok(self.layers.get(layer).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Legal backup fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    CreateFolder(String),
    Upload { folder: String, file_name: String, size: usize },
    List,
    Delete(String),
}

/// [`ArchiveStorage`] recording every call.
#[derive(Default)]
pub struct FakeStorage {
    pub entries: Vec<String>,
    /// Uploads of this file name fail with HTTP 507.
    pub fail_upload_of: Option<String>,
    pub ops: Mutex<Vec<StorageOp>>,
}

impl FakeStorage {
    pub fn ops(&self) -> Vec<StorageOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                StorageOp::Upload { file_name, .. } => Some(file_name),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                StorageOp::Delete(href) => Some(href),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ArchiveStorage for FakeStorage {
    async fn create_folder(&self, name: &str) -> Result<(), WebDavError> {
        self.ops.lock().unwrap().push(StorageOp::CreateFolder(name.to_string()));
        Ok(())
    }

    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), WebDavError> {
        if self.fail_upload_of.as_deref() == Some(file_name) {
            return Err(WebDavError::HttpStatus {
                method: "PUT".to_string(),
                url: format!("https://dav.example.org/{folder}/{file_name}"),
                status: 507,
            });
        }
        self.ops.lock().unwrap().push(StorageOp::Upload {
            folder: folder.to_string(),
            file_name: file_name.to_string(),
            size: content.len(),
        });
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<String>, WebDavError> {
        self.ops.lock().unwrap().push(StorageOp::List);
        Ok(self.entries.clone())
    }

    async fn delete_entry(&self, href: &str) -> Result<(), WebDavError> {
        self.ops.lock().unwrap().push(StorageOp::Delete(href.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub users: Vec<AccountUser>,
    pub requests: HashMap<DbId, Vec<FoiRequestSummary>>,
}

#[async_trait]
impl AccountDirectory for FakeDirectory {
    async fn find_user(&self, user_id: DbId) -> Result<Option<AccountUser>, sqlx::Error> {
        Ok(self.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn list_requests(&self, user_id: DbId) -> Result<Vec<FoiRequestSummary>, sqlx::Error> {
        Ok(self.requests.get(&user_id).cloned().unwrap_or_default())
    }
}

/// Renders `%PDF-{id}`.
#[derive(Default)]
pub struct FakePdf;

#[async_trait]
impl PdfGenerator for FakePdf {
    async fn generate(&self, request: &FoiRequestSummary) -> Result<Vec<u8>, BackupError> {
        Ok(format!("%PDF-{}", request.id).into_bytes())
    }
}

pub fn user(id: DbId, date_left: Option<Timestamp>) -> AccountUser {
    AccountUser {
        id,
        email: format!("user{id}@example.org"),
        first_name: "Erika".to_string(),
        last_name: "Mustermann".to_string(),
        date_joined: Utc::now(),
        date_left,
    }
}

pub fn foi_request(id: DbId, slug: &str) -> FoiRequestSummary {
    FoiRequestSummary {
        id,
        title: slug.replace('-', " "),
        slug: slug.to_string(),
        status: "resolved".to_string(),
        public: true,
    }
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

// ---------------------------------------------------------------------------
// OSM refresh fakes
// ---------------------------------------------------------------------------

/// [`ToolRunner`] recording invocations. Programs listed in `failing` exit
/// with code 1; every output file named with `-o=` or after `--write-xml`
/// is created so later stages find it.
#[derive(Default)]
pub struct RecordingRunner {
    pub failing: Vec<String>,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl RecordingRunner {
    pub fn failing(program: &str) -> Self {
        Self {
            failing: vec![program.to_string()],
            ..Self::default()
        }
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.program).collect()
    }
}

#[async_trait]
impl ToolRunner for RecordingRunner {
    async fn run(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.invocations.lock().unwrap().push(invocation.clone());
        if self.failing.contains(&invocation.program) {
            return Err(ToolError::ExecutionFailed {
                program: invocation.program,
                exit_code: 1,
                stderr: "simulated failure".to_string(),
            });
        }
        let mut outputs = Vec::new();
        let mut args = invocation.args.iter();
        while let Some(arg) = args.next() {
            if let Some(path) = arg.strip_prefix("-o=") {
                outputs.push(PathBuf::from(path));
            } else if arg == "--write-xml" {
                if let Some(path) = args.next() {
                    outputs.push(PathBuf::from(path));
                }
            }
        }
        for path in outputs {
            std::fs::write(path, b"")?;
        }
        Ok(ToolOutput {
            stdout: Vec::new(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 1,
        })
    }
}

/// [`Downloader`] writing fixed bytes, or failing with the given status.
#[derive(Default)]
pub struct FakeDownloader {
    pub fail_status: Option<u16>,
    pub downloads: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeDownloader {
    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        self.downloads
            .lock()
            .unwrap()
            .push((url.to_string(), destination.to_path_buf()));
        if let Some(status) = self.fail_status {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }
        let body = b"PBF-EXTRACT";
        tokio::fs::write(destination, body).await?;
        Ok(body.len() as u64)
    }
}

#[derive(Default)]
pub struct FakeBoundaryImporter {
    extracts: Mutex<Vec<PathBuf>>,
}

impl FakeBoundaryImporter {
    pub fn extracts(&self) -> Vec<PathBuf> {
        self.extracts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BoundaryImporter for FakeBoundaryImporter {
    async fn import(&self, extract: &Path) -> Result<BoundaryImportReport, IngestError> {
        assert!(extract.exists(), "extract is downloaded before boundary import");
        self.extracts.lock().unwrap().push(extract.to_path_buf());
        Ok(BoundaryImportReport {
            matched: 1,
            ..BoundaryImportReport::default()
        })
    }
}

#[derive(Default)]
pub struct FakeAmenityImporter {
    pub fail: bool,
    pub calls: Mutex<Vec<(PathBuf, Option<NaiveDate>)>>,
}

impl FakeAmenityImporter {
    pub fn calls(&self) -> Vec<(PathBuf, Option<NaiveDate>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AmenityImporter for FakeAmenityImporter {
    async fn import(&self, xml: &Path, last_update: Option<NaiveDate>) -> Result<(), ToolError> {
        assert!(xml.exists(), "filtered XML exists before import");
        self.calls.lock().unwrap().push((xml.to_path_buf(), last_update));
        if self.fail {
            return Err(ToolError::ExecutionFailed {
                program: "import_amenities".to_string(),
                exit_code: 2,
                stderr: "database locked".to_string(),
            });
        }
        Ok(())
    }
}

/// [`BoundarySource`] returning fixed boundaries.
#[derive(Default)]
pub struct FakeBoundarySource {
    pub boundaries: Vec<OsmBoundary>,
}

#[async_trait]
impl BoundarySource for FakeBoundarySource {
    async fn read_boundaries(&self, _extract: &Path) -> Result<Vec<OsmBoundary>, IngestError> {
        Ok(self.boundaries.clone())
    }
}

pub fn boundary(osm_id: &str, tags: &[(&str, &str)], geometry: Value) -> OsmBoundary {
    OsmBoundary {
        osm_id: osm_id.to_string(),
        tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        geometry,
    }
}
