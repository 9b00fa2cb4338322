use crate::domain::models::suspension::SuspensionRequest;
use crate::domain::ports::SuspensionRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

pub struct SqliteSuspensionRepo {
    pool: SqlitePool,
}

impl SqliteSuspensionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_suspension(row: &SqliteRow) -> SuspensionRequest {
    SuspensionRequest {
        id: row.get("id"),
        enrollment_id: row.get("enrollment_id"),
        applicant_type: row.get("applicant_type"),
        applicant_id: row.get("applicant_id"),
        start_date: row.get::<NaiveDate, _>("start_date"),
        end_date: row.get::<NaiveDate, _>("end_date"),
        over_quota: row.get("over_quota"),
        status: row.get("status"),
        reviewer_id: row.get("reviewer_id"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[async_trait]
impl SuspensionRepository for SqliteSuspensionRepo {
    async fn create(&self, request: &SuspensionRequest) -> Result<SuspensionRequest, AppError> {
        sqlx::query(
            "INSERT INTO suspension_requests (id, enrollment_id, applicant_type, applicant_id,
                 start_date, end_date, over_quota, status, reviewer_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&request.enrollment_id)
        .bind(&request.applicant_type)
        .bind(&request.applicant_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.over_quota)
        .bind(&request.status)
        .bind(&request.reviewer_id)
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SuspensionRequest>, AppError> {
        let row = sqlx::query("SELECT * FROM suspension_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.as_ref().map(map_suspension))
    }

    async fn transition(
        &self,
        id: &str,
        from: &str,
        to: &str,
        reviewer_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE suspension_requests SET status = ?, reviewer_id = COALESCE(?, reviewer_id)
             WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(reviewer_id)
        .bind(id)
        .bind(from)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
