use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use fds_core::types::DbId;
use fds_db::DbPool;
use fds_worker::config::WorkerConfig;
use fds_worker::jobs::{self, PictureRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "fds-worker", about = "Runs one FragDenStaat integration job")]
struct Cli {
    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Archive a cancelled account to the legal backup share.
    LegalBackup { user_id: DbId },

    /// Delete archive folders past the retention period.
    LegalCleanup,

    /// Refresh OSM amenities and boundaries.
    OsmRefresh,

    /// Import administrative regions from a boundary dataset.
    Georegion {
        #[arg(value_enum)]
        mode: GeoRegionMode,
        /// Path of the dataset (e.g. a VG250 GeoPackage).
        path: PathBuf,
    },

    /// Derive the responsive picture of a local image and print it as JSON.
    Picture {
        /// Image name relative to the media root.
        name: String,
        #[arg(long, default_value = "media")]
        media_root: PathBuf,
        #[arg(long, default_value = "media/thumbs")]
        cache_dir: PathBuf,
        #[arg(long, default_value = "/media/thumbs")]
        base_url: String,
        /// Explicit layout, e.g. "col-12 col-md-6".
        #[arg(long)]
        colsizes: Option<String>,
        /// Focal point as "x,y".
        #[arg(long)]
        subject_location: Option<String>,
    },
}

impl Command {
    /// Whether the job writes the `georegion` table and so needs its schema.
    fn needs_migrations(&self) -> bool {
        matches!(self, Command::OsmRefresh | Command::Georegion { .. })
    }
}

async fn database(config: &WorkerConfig, command: &Command) -> anyhow::Result<DbPool> {
    if command.needs_migrations() {
        jobs::connect_and_migrate(config).await
    } else {
        jobs::connect(config).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GeoRegionMode {
    /// Full ingestion with tree rebuild.
    Data,
    /// Population figures only.
    Stats,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fds_worker=info,fds_pipeline=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = WorkerConfig::from_env();
    let today = chrono::Local::now().date_naive();

    match &cli.command {
        Command::LegalBackup { user_id } => {
            let user_id = *user_id;
            let pool = database(&config, &cli.command).await?;
            let outcome = jobs::legal_backup(&config, &pool, user_id, today).await?;
            tracing::info!(user_id, outcome = ?outcome, "Legal backup finished");
        }
        Command::LegalCleanup => {
            let deleted = jobs::legal_cleanup(&config, today).await?;
            for name in deleted {
                println!("{name}");
            }
        }
        Command::OsmRefresh => {
            let pool = database(&config, &cli.command).await?;
            let report = jobs::osm_refresh(&config, &pool, today).await?;
            tracing::info!(
                bytes = report.downloaded_bytes,
                matched = report.boundaries.matched,
                boroughs = report.boundaries.boroughs,
                "Amenity refresh finished"
            );
        }
        Command::Georegion { mode, path } => {
            let pool = database(&config, &cli.command).await?;
            match mode {
                GeoRegionMode::Data => {
                    let report = jobs::georegion_data(&config, &pool, path).await?;
                    tracing::info!(
                        layers = report.layers.len(),
                        gov_seats = report.gov_seats,
                        "Region ingestion finished"
                    );
                }
                GeoRegionMode::Stats => {
                    let report = jobs::georegion_stats(&config, &pool, path).await?;
                    tracing::info!(
                        updated = report.updated,
                        skipped = report.skipped,
                        "Population update finished"
                    );
                }
            }
        }
        Command::Picture {
            name,
            media_root,
            cache_dir,
            base_url,
            colsizes,
            subject_location,
        } => {
            let request = PictureRequest {
                media_root: media_root.clone(),
                cache_dir: cache_dir.clone(),
                base_url: base_url.clone(),
                name: name.clone(),
                colsizes: colsizes.clone(),
                subject_location: subject_location.clone(),
            };
            let picture = jobs::picture(&config.picture, &request)?;
            let json = serde_json::to_string_pretty(&picture).context("Failed to serialize picture")?;
            println!("{json}");
        }
    }
    Ok(())
}
