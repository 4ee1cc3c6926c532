//! Account data export.

use async_trait::async_trait;
use fds_core::retention::ACCOUNT_EXPORT_NAME;
use fds_db::models::account::{AccountUser, FoiRequestSummary};
use serde::Serialize;

use super::BackupError;

/// One file of an account export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    pub name: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

/// Produces the export files of an account. The first item must be the
/// account document itself.
#[async_trait]
pub trait AccountExporter: Send + Sync {
    async fn export(
        &self,
        user: &AccountUser,
        requests: &[FoiRequestSummary],
    ) -> Result<Vec<ExportItem>, BackupError>;
}

#[derive(Serialize)]
struct AccountDocument<'a> {
    account: &'a AccountUser,
    full_name: String,
    requests: &'a [FoiRequestSummary],
}

/// Exports profile and request list as a single `account.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAccountExporter;

#[async_trait]
impl AccountExporter for JsonAccountExporter {
    async fn export(
        &self,
        user: &AccountUser,
        requests: &[FoiRequestSummary],
    ) -> Result<Vec<ExportItem>, BackupError> {
        let document = AccountDocument {
            account: user,
            full_name: user.full_name(),
            requests,
        };
        Ok(vec![ExportItem {
            name: ACCOUNT_EXPORT_NAME.to_string(),
            content: serde_json::to_vec_pretty(&document)?,
            content_type: "application/json".to_string(),
        }])
    }
}
