//! One function per job. Each builds its collaborators from
//! [`WorkerConfig`] and runs the pipeline once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use fds_cloud::{ArchiveStorage, HttpDownloader, WebDavClient};
use fds_core::osm::AmenityTopics;
use fds_core::picture::columns::COLSIZES_ATTRIBUTE;
use fds_core::picture::{
    responsive_picture, FsThumbnailer, PictureConfig, PluginNode, ResponsiveImage, SourceImage,
};
use fds_core::tooling::{ProcessRunner, ToolRunner};
use fds_core::types::DbId;
use fds_db::DbPool;
use fds_pipeline::georegion::{
    GeoRegionIngester, IngestOptions, IngestReport, OgrDataset, PgRegionStore, StatsReport,
};
use fds_pipeline::legal_backup::{
    cleanup_archive, BackupError, BackupOutcome, CommandPdfGenerator, JsonAccountExporter,
    LegalBackup, PgAccountDirectory,
};
use fds_pipeline::osm_refresh::{
    AmenityRefresh, CommandAmenityImporter, OgrBoundarySource, RefreshConfig, RefreshReport,
    RegionBoundaryImporter,
};

use crate::config::WorkerConfig;

/// Plugin type the picture job pretends to render.
const PICTURE_PLUGIN: &str = "PicturePlugin";

/// Connect to the platform database and check it answers.
pub async fn connect(config: &WorkerConfig) -> anyhow::Result<DbPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;

    let pool = fds_db::create_pool(database_url)
        .await
        .context("Failed to connect to database")?;
    fds_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    Ok(pool)
}

/// [`connect`], then apply the `georegion` migrations. Only the region jobs
/// need the schema; the others must not run DDL on the platform database.
pub async fn connect_and_migrate(config: &WorkerConfig) -> anyhow::Result<DbPool> {
    let pool = connect(config).await?;
    fds_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");
    Ok(pool)
}

fn archive_storage(config: &WorkerConfig) -> anyhow::Result<Option<Arc<dyn ArchiveStorage>>> {
    let Some(webdav) = &config.legal_backup else {
        return Ok(None);
    };
    let client: Arc<dyn ArchiveStorage> =
        Arc::new(WebDavClient::new(webdav).context("Invalid legal backup share")?);
    Ok(Some(client))
}

// ---------------------------------------------------------------------------
// Legal backup
// ---------------------------------------------------------------------------

pub async fn legal_backup(
    config: &WorkerConfig,
    pool: &DbPool,
    user_id: DbId,
    today: NaiveDate,
) -> anyhow::Result<BackupOutcome> {
    let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner);
    let pdfs = config
        .pdf_command
        .as_deref()
        .and_then(|command| CommandPdfGenerator::from_command_line(command, runner))
        .context("FDS_PDF_COMMAND must be set for legal backups")?;

    let backup = LegalBackup::new(
        archive_storage(config)?,
        Arc::new(PgAccountDirectory::new(pool.clone())),
        Arc::new(JsonAccountExporter),
        Arc::new(pdfs),
    );
    let outcome = backup.make_legal_backup(user_id, today).await?;
    Ok(outcome)
}

pub async fn legal_cleanup(config: &WorkerConfig, today: NaiveDate) -> anyhow::Result<Vec<String>> {
    let storage = archive_storage(config)?.ok_or(BackupError::NotConfigured)?;
    let deleted = cleanup_archive(storage.as_ref(), today).await?;
    tracing::info!(deleted = deleted.len(), "Legal backup cleanup finished");
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// OSM amenity refresh
// ---------------------------------------------------------------------------

pub async fn osm_refresh(
    config: &WorkerConfig,
    pool: &DbPool,
    today: NaiveDate,
) -> anyhow::Result<RefreshReport> {
    let topics = config
        .amenity_topics
        .as_deref()
        .context("AMENITY_TOPICS must be set for the amenity refresh")?;
    let topics = AmenityTopics::from_json(topics)?;

    let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner);
    let importer = config
        .amenity_import_command
        .as_deref()
        .and_then(|command| CommandAmenityImporter::from_command_line(command, runner.clone()))
        .context("AMENITY_IMPORT_COMMAND must be set for the amenity refresh")?;

    let mut refresh_config = RefreshConfig::new(topics, &config.amenity_state_dir);
    refresh_config.extract_url = config.amenity_extract_url.clone();

    let boundaries = RegionBoundaryImporter::new(
        Arc::new(OgrBoundarySource::new(runner.clone())),
        Arc::new(PgRegionStore::new(pool.clone())),
    );
    let refresh = AmenityRefresh::new(
        refresh_config,
        Arc::new(HttpDownloader::new()?),
        runner,
        Arc::new(boundaries),
        Arc::new(importer),
    );
    Ok(refresh.run(today).await?)
}

// ---------------------------------------------------------------------------
// Geographic regions
// ---------------------------------------------------------------------------

fn ingest_options(config: &WorkerConfig) -> anyhow::Result<IngestOptions> {
    IngestOptions::parse(&config.georegion_valid_date).context("Invalid GEOREGION_VALID_DATE")
}

fn dataset(path: &Path) -> anyhow::Result<OgrDataset> {
    anyhow::ensure!(path.exists(), "Dataset {} does not exist", path.display());
    Ok(OgrDataset::new(path, Arc::new(ProcessRunner)))
}

/// Full ingestion of a boundary dataset.
pub async fn georegion_data(
    config: &WorkerConfig,
    pool: &DbPool,
    path: &Path,
) -> anyhow::Result<IngestReport> {
    let options = ingest_options(config)?;
    let dataset = dataset(path)?;
    let store = PgRegionStore::new(pool.clone());
    let report = GeoRegionIngester::new(&store, options).ingest(&dataset).await?;

    for layer in &report.layers {
        tracing::info!(
            kind = %layer.kind,
            new = layer.new.len(),
            obsolete = layer.obsolete.len(),
            skipped = layer.skipped,
            "Layer summary"
        );
    }
    Ok(report)
}

/// Population-only update from a boundary dataset.
pub async fn georegion_stats(
    config: &WorkerConfig,
    pool: &DbPool,
    path: &Path,
) -> anyhow::Result<StatsReport> {
    let options = ingest_options(config)?;
    let dataset = dataset(path)?;
    let store = PgRegionStore::new(pool.clone());
    let report = GeoRegionIngester::new(&store, options)
        .update_stats(&dataset)
        .await?;
    Ok(report)
}

// ---------------------------------------------------------------------------
// Pictures
// ---------------------------------------------------------------------------

/// A picture to derive from the local media directory.
#[derive(Debug, Clone)]
pub struct PictureRequest {
    pub media_root: PathBuf,
    pub cache_dir: PathBuf,
    pub base_url: String,
    /// Image name relative to `media_root`.
    pub name: String,
    /// `data-colsizes` value, e.g. `col-12 col-md-6`.
    pub colsizes: Option<String>,
    pub subject_location: Option<String>,
}

/// Generate the thumbnails of one image and return its picture descriptor.
pub fn picture(config: &PictureConfig, request: &PictureRequest) -> anyhow::Result<ResponsiveImage> {
    let source_path = request.media_root.join(&request.name);
    let (width, height) = image::image_dimensions(&source_path)
        .with_context(|| format!("Cannot read image {}", source_path.display()))?;

    let image = SourceImage {
        name: request.name.clone(),
        width,
        height,
        subject_location: request.subject_location.clone(),
    };
    let mut plugin = PluginNode::new(PICTURE_PLUGIN);
    if let Some(colsizes) = &request.colsizes {
        plugin = plugin.with_attribute(COLSIZES_ATTRIBUTE, colsizes);
    }
    let thumbnailer = FsThumbnailer::new(&request.media_root, &request.cache_dir, &request.base_url);

    let picture = responsive_picture(&thumbnailer, &image, &plugin, config)?;
    tracing::info!(image = %request.name, width, height, "Derived responsive picture");
    Ok(picture)
}
