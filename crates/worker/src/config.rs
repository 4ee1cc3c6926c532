use std::path::PathBuf;
use std::time::Duration;

use fds_cloud::WebDavConfig;
use fds_core::picture::PictureConfig;
use fds_pipeline::georegion::DEFAULT_VALID_DATE;
use fds_pipeline::osm_refresh::DEFAULT_EXTRACT_URL;

const DEFAULT_WEBDAV_TIMEOUT_SECS: u64 = 60;

/// Worker configuration loaded from environment variables.
///
/// Job-specific settings are optional here; a job refuses to start when
/// something it needs is missing.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: Option<String>,
    /// `None` when the legal backup share is not configured.
    pub legal_backup: Option<WebDavConfig>,
    pub pdf_command: Option<String>,
    /// Raw `AMENITY_TOPICS` JSON, validated by the refresh job.
    pub amenity_topics: Option<String>,
    pub amenity_extract_url: String,
    pub amenity_import_command: Option<String>,
    pub amenity_state_dir: PathBuf,
    pub georegion_valid_date: String,
    pub picture: PictureConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                    |
    /// |--------------------------------|----------------------------|
    /// | `DATABASE_URL`                 | -                          |
    /// | `FDS_LEGAL_BACKUP_URL`         | -                          |
    /// | `FDS_LEGAL_BACKUP_CREDENTIALS` | -                          |
    /// | `WEBDAV_TIMEOUT_SECS`          | `60`                       |
    /// | `FDS_PDF_COMMAND`              | -                          |
    /// | `AMENITY_TOPICS`               | -                          |
    /// | `AMENITY_EXTRACT_URL`          | Geofabrik Germany extract  |
    /// | `AMENITY_IMPORT_COMMAND`       | -                          |
    /// | `AMENITY_STATE_DIR`            | `.`                        |
    /// | `GEOREGION_VALID_DATE`         | `2021-01-01`               |
    ///
    /// Picture flags are read by [`PictureConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            picture: PictureConfig::from_env(),
            ..Self::from_lookup(|name| std::env::var(name).ok())
        }
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset;
    /// picture settings keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let webdav_timeout = var("WEBDAV_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_WEBDAV_TIMEOUT_SECS);
        let legal_backup = match (var("FDS_LEGAL_BACKUP_URL"), var("FDS_LEGAL_BACKUP_CREDENTIALS")) {
            (Some(url), Some(credentials)) => {
                WebDavConfig::from_parts(&url, &credentials, Duration::from_secs(webdav_timeout))
            }
            _ => None,
        };

        Self {
            database_url: var("DATABASE_URL"),
            legal_backup,
            pdf_command: var("FDS_PDF_COMMAND"),
            amenity_topics: var("AMENITY_TOPICS"),
            amenity_extract_url: var("AMENITY_EXTRACT_URL")
                .unwrap_or_else(|| DEFAULT_EXTRACT_URL.to_string()),
            amenity_import_command: var("AMENITY_IMPORT_COMMAND"),
            amenity_state_dir: var("AMENITY_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            georegion_valid_date: var("GEOREGION_VALID_DATE")
                .unwrap_or_else(|| DEFAULT_VALID_DATE.to_string()),
            picture: PictureConfig::default(),
        }
    }
}
