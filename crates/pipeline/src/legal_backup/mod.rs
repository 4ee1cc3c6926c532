//! Retention archive of cancelled accounts.
//!
//! A backup folder per account holds the account export and one PDF per FOI
//! request. Folders older than the retention period are deleted by
//! [`LegalBackup::cleanup_legal_backups`].

pub mod directory;
pub mod exporter;
pub mod pdf;

use std::sync::Arc;

use chrono::NaiveDate;
use fds_cloud::{ArchiveStorage, WebDavError};
use fds_core::retention::{
    archive_folder_name, folder_segment_from_href, is_expired, parse_folder_date, request_pdf_name,
    ACCOUNT_EXPORT_NAME,
};
use fds_core::tooling::ToolError;
use fds_core::types::DbId;

pub use directory::{AccountDirectory, PgAccountDirectory};
pub use exporter::{AccountExporter, ExportItem, JsonAccountExporter};
pub use pdf::{CommandPdfGenerator, PdfGenerator};

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Legal backup storage is not configured")]
    NotConfigured,

    #[error("Account export must start with account.json, got {0}")]
    UnexpectedExport(String),

    #[error("PDF generation for request {0} produced no output")]
    EmptyPdf(DbId),

    #[error("Storage error: {0}")]
    Storage(#[from] WebDavError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("PDF generation failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    UserNotFound,
    Created { folder: String, files: usize },
}

/// Writes and expires retention archives.
pub struct LegalBackup {
    storage: Option<Arc<dyn ArchiveStorage>>,
    directory: Arc<dyn AccountDirectory>,
    exporter: Arc<dyn AccountExporter>,
    pdfs: Arc<dyn PdfGenerator>,
}

impl LegalBackup {
    /// `storage` is `None` when no archive share is configured; every
    /// operation that needs it then fails with [`BackupError::NotConfigured`].
    pub fn new(
        storage: Option<Arc<dyn ArchiveStorage>>,
        directory: Arc<dyn AccountDirectory>,
        exporter: Arc<dyn AccountExporter>,
        pdfs: Arc<dyn PdfGenerator>,
    ) -> Self {
        Self {
            storage,
            directory,
            exporter,
            pdfs,
        }
    }

    fn storage(&self) -> Result<&dyn ArchiveStorage, BackupError> {
        self.storage.as_deref().ok_or(BackupError::NotConfigured)
    }

    /// Archive the account `user_id`. Unknown users are a no-op; `today`
    /// dates the folder of accounts without cancellation date.
    pub async fn make_legal_backup(
        &self,
        user_id: DbId,
        today: NaiveDate,
    ) -> Result<BackupOutcome, BackupError> {
        let Some(user) = self.directory.find_user(user_id).await? else {
            tracing::info!(user_id, "No such user, skipping legal backup");
            return Ok(BackupOutcome::UserNotFound);
        };
        let storage = self.storage()?;

        let cancelled_on = match user.date_left {
            Some(date_left) => date_left.date_naive(),
            None => {
                tracing::warn!(user_id, "User has no cancellation date, using today");
                today
            }
        };
        let folder = archive_folder_name(cancelled_on, user.id, &user.email, &user.full_name());
        storage.create_folder(&folder).await?;

        let requests = self.directory.list_requests(user.id).await?;
        let mut items = self.exporter.export(&user, &requests).await?.into_iter();
        let account = match items.next() {
            Some(item) if item.name == ACCOUNT_EXPORT_NAME => item,
            Some(item) => return Err(BackupError::UnexpectedExport(item.name)),
            None => return Err(BackupError::UnexpectedExport("nothing".to_string())),
        };
        storage
            .upload(&folder, &account.name, account.content, &account.content_type)
            .await?;
        let mut files = 1;

        for request in &requests {
            let pdf = self.pdfs.generate(request).await?;
            let name = request_pdf_name(request.id, &request.slug);
            storage.upload(&folder, &name, pdf, PDF_CONTENT_TYPE).await?;
            files += 1;
        }

        tracing::info!(user_id, folder = %folder, files, "Created legal backup");
        Ok(BackupOutcome::Created { folder, files })
    }

    /// Delete archive folders past the retention period. Returns the names of
    /// the deleted folders.
    pub async fn cleanup_legal_backups(&self, today: NaiveDate) -> Result<Vec<String>, BackupError> {
        cleanup_archive(self.storage()?, today).await
    }
}

/// Delete the members of `storage` whose folder date has outlived the
/// retention period. Members without a leading date are left alone.
pub async fn cleanup_archive(
    storage: &dyn ArchiveStorage,
    today: NaiveDate,
) -> Result<Vec<String>, BackupError> {
    let mut deleted = Vec::new();

    for href in storage.list_entries().await? {
        let Some(name) = folder_segment_from_href(&href) else {
            continue;
        };
        let Some(archived_on) = parse_folder_date(&name) else {
            tracing::debug!(entry = %name, "Skipping entry without date");
            continue;
        };
        if !is_expired(archived_on, today) {
            continue;
        }
        storage.delete_entry(&href).await?;
        tracing::info!(folder = %name, %archived_on, "Deleted expired legal backup");
        deleted.push(name);
    }
    Ok(deleted)
}
