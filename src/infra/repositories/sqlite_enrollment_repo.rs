use crate::domain::models::enrollment::Enrollment;
use crate::domain::ports::EnrollmentRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

pub struct SqliteEnrollmentRepo {
    pool: SqlitePool,
}

impl SqliteEnrollmentRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_enrollment(row: &SqliteRow) -> Enrollment {
    Enrollment {
        id: row.get("id"),
        request_id: row.get("request_id"),
        student_id: row.get("student_id"),
        teacher_id: row.get("teacher_id"),
        course_id: row.get("course_id"),
        total_sessions: row.get("total_sessions"),
        hourly_rate_cents: row.get("hourly_rate_cents"),
        status: row.get("status"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[async_trait]
impl EnrollmentRepository for SqliteEnrollmentRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Enrollment>, AppError> {
        let row = sqlx::query("SELECT * FROM enrollments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.as_ref().map(map_enrollment))
    }

    async fn find_by_request(&self, request_id: &str) -> Result<Option<Enrollment>, AppError> {
        let row = sqlx::query("SELECT * FROM enrollments WHERE request_id = ?")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.as_ref().map(map_enrollment))
    }

    async fn set_status(&self, id: &str, status: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE enrollments SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Enrollment not found".into()));
        }
        Ok(())
    }
}
