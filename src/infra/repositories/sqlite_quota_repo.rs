use crate::domain::models::quota::QuotaCounter;
use crate::domain::ports::QuotaRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

pub struct SqliteQuotaRepo {
    pool: SqlitePool,
}

impl SqliteQuotaRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_counter(row: &SqliteRow) -> QuotaCounter {
    QuotaCounter {
        id: row.get("id"),
        actor_type: row.get("actor_type"),
        actor_id: row.get("actor_id"),
        enrollment_id: row.get("enrollment_id"),
        month_key: row.get("month_key"),
        allowed: row.get("allowed"),
        used: row.get("used"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[async_trait]
impl QuotaRepository for SqliteQuotaRepo {
    async fn find_or_create(
        &self,
        actor_type: &str,
        actor_id: &str,
        enrollment_id: &str,
        month_key: &str,
        allowed: i32,
    ) -> Result<QuotaCounter, AppError> {
        // First writer wins: the allowance is frozen in the row it creates.
        sqlx::query(
            "INSERT OR IGNORE INTO quota_counters
                 (id, actor_type, actor_id, enrollment_id, month_key, allowed, used, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(actor_type)
        .bind(actor_id)
        .bind(enrollment_id)
        .bind(month_key)
        .bind(allowed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let row = sqlx::query(
            "SELECT * FROM quota_counters
             WHERE actor_type = ? AND actor_id = ? AND enrollment_id = ? AND month_key = ?",
        )
        .bind(actor_type)
        .bind(actor_id)
        .bind(enrollment_id)
        .bind(month_key)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(map_counter(&row))
    }

    async fn increment(&self, id: &str) -> Result<i32, AppError> {
        let row = sqlx::query(
            "UPDATE quota_counters SET used = used + 1 WHERE id = ? RETURNING used",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(row.get("used"))
    }

    async fn decrement(&self, id: &str) -> Result<i32, AppError> {
        let row = sqlx::query(
            "UPDATE quota_counters SET used = MAX(0, used - 1) WHERE id = ? RETURNING used",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(row.get("used"))
    }
}
