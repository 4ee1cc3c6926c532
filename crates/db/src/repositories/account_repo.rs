//! Read access to the platform's accounts and their FOI requests.

use fds_core::types::DbId;
use sqlx::PgPool;

use crate::models::account::{AccountUser, FoiRequestSummary};

/// Reads `account_user` and `foirequest_foirequest`.
pub struct AccountRepo;

impl AccountRepo {
    pub async fn find_user(pool: &PgPool, id: DbId) -> Result<Option<AccountUser>, sqlx::Error> {
        sqlx::query_as::<_, AccountUser>(
            "SELECT id, email, first_name, last_name, date_joined, date_left \
             FROM account_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All requests owned by the user, oldest first.
    pub async fn list_requests(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<FoiRequestSummary>, sqlx::Error> {
        sqlx::query_as::<_, FoiRequestSummary>(
            "SELECT id, title, slug, status, public \
             FROM foirequest_foirequest WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
