use crate::domain::ports::BalanceService;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Local stand-in for the external account/balance service. Credits are
/// recorded as auditable balance transactions.
pub struct SqliteBalanceService {
    pool: SqlitePool,
}

impl SqliteBalanceService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceService for SqliteBalanceService {
    async fn credit(
        &self,
        user_id: &str,
        amount_cents: i64,
        reason: &str,
        ref_id: &str,
    ) -> Result<bool, AppError> {
        sqlx::query(
            "INSERT INTO balance_transactions (id, user_id, amount_cents, reason, ref_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(amount_cents)
        .bind(reason)
        .bind(ref_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        info!(user_id, amount_cents, reason, ref_id, "balance credited");
        Ok(true)
    }
}
