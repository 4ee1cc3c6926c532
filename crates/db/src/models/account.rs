//! Read models over the FOI platform's account and request tables.

use fds_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the platform's `account_user` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountUser {
    pub id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: Timestamp,
    /// Set when the account was cancelled.
    pub date_left: Option<Timestamp>,
}

impl AccountUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A row from `foirequest_foirequest`, reduced to what the archive needs.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FoiRequestSummary {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub public: bool,
}
