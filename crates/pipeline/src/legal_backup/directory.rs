//! Account lookups for the retention archive.

use async_trait::async_trait;
use fds_core::types::DbId;
use fds_db::models::account::{AccountUser, FoiRequestSummary};
use fds_db::repositories::AccountRepo;
use sqlx::PgPool;

/// Read access to the platform's accounts and their requests.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_user(&self, user_id: DbId) -> Result<Option<AccountUser>, sqlx::Error>;

    async fn list_requests(&self, user_id: DbId) -> Result<Vec<FoiRequestSummary>, sqlx::Error>;
}

/// [`AccountDirectory`] over the platform database.
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn find_user(&self, user_id: DbId) -> Result<Option<AccountUser>, sqlx::Error> {
        AccountRepo::find_user(&self.pool, user_id).await
    }

    async fn list_requests(&self, user_id: DbId) -> Result<Vec<FoiRequestSummary>, sqlx::Error> {
        AccountRepo::list_requests(&self.pool, user_id).await
    }
}
