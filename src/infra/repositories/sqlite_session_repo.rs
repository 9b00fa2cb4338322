use crate::domain::models::session::Session;
use crate::domain::models::timeslot::TimeSlot;
use crate::domain::ports::SessionRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, Sqlite, SqlitePool, Transaction};

pub struct SqliteSessionRepo {
    pool: SqlitePool,
}

impl SqliteSessionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn map_session(row: &SqliteRow) -> Result<Session, AppError> {
    let slot: TimeSlot = row.get::<String, _>("slot").parse()?;
    Ok(Session {
        id: row.get("id"),
        request_id: row.get("request_id"),
        enrollment_id: row.get("enrollment_id"),
        teacher_id: row.get("teacher_id"),
        student_id: row.get("student_id"),
        course_id: row.get("course_id"),
        date: row.get::<NaiveDate, _>("date"),
        slot,
        trial: row.get("trial"),
        status: row.get("status"),
        sequence_no: row.get("sequence_no"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

pub(crate) async fn insert_session(
    tx: &mut Transaction<'_, Sqlite>,
    session: &Session,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO sessions (id, request_id, enrollment_id, teacher_id, student_id, course_id,
             date, slot, trial, status, sequence_no, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.request_id)
    .bind(&session.enrollment_id)
    .bind(&session.teacher_id)
    .bind(&session.student_id)
    .bind(&session.course_id)
    .bind(session.date)
    .bind(session.slot.to_string())
    .bind(session.trial)
    .bind(&session.status)
    .bind(session.sequence_no)
    .bind(session.created_at)
    .execute(&mut **tx)
    .await
    .map_err(AppError::Database)?;
    Ok(())
}

#[async_trait]
impl SessionRepository for SqliteSessionRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        row.as_ref().map(map_session).transpose()
    }

    async fn list_by_request(&self, request_id: &str) -> Result<Vec<Session>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE request_id = ? ORDER BY sequence_no ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        rows.iter().map(map_session).collect()
    }

    async fn list_active_by_teacher_date(
        &self,
        teacher_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Session>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE teacher_id = ? AND date = ?
             AND status IN ('SCHEDULED', 'COMPLETED')",
        )
        .bind(teacher_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        rows.iter().map(map_session).collect()
    }

    async fn list_active_by_student_date(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Session>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE student_id = ? AND date = ? AND status = 'SCHEDULED'",
        )
        .bind(student_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        rows.iter().map(map_session).collect()
    }

    async fn list_active_by_enrollment_range(
        &self,
        enrollment_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE enrollment_id = ? AND date >= ? AND date <= ?
             AND status = 'SCHEDULED' ORDER BY date ASC",
        )
        .bind(enrollment_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        rows.iter().map(map_session).collect()
    }

    async fn update_time(
        &self,
        id: &str,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<Session, AppError> {
        let row = sqlx::query("UPDATE sessions SET date = ?, slot = ? WHERE id = ? RETURNING *")
            .bind(date)
            .bind(slot.to_string())
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        map_session(&row)
    }

    async fn set_status(&self, id: &str, status: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE sessions SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Session not found".into()));
        }
        Ok(())
    }

    async fn update_sequences(&self, assignments: &[(String, i32)]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        for (id, sequence_no) in assignments {
            sqlx::query("UPDATE sessions SET sequence_no = ? WHERE id = ?")
                .bind(sequence_no)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn replace_series(
        &self,
        retired_ids: &[String],
        replacements: &[Session],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        for id in retired_ids {
            sqlx::query("UPDATE sessions SET status = 'RESCHEDULED' WHERE id = ? AND status = 'SCHEDULED'")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }
        for session in replacements {
            insert_session(&mut tx, session).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn cancel_for_suspension(
        &self,
        session_ids: &[String],
        enrollment_id: &str,
        request_id: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let mut removed: i64 = 0;
        for id in session_ids {
            let result = sqlx::query(
                "UPDATE sessions SET status = 'CANCELLED' WHERE id = ? AND status = 'SCHEDULED'",
            )
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
            removed += result.rows_affected() as i64;
        }
        sqlx::query(
            "UPDATE enrollments SET total_sessions = total_sessions - ? WHERE id = ?",
        )
        .bind(removed)
        .bind(enrollment_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;
        sqlx::query(
            "UPDATE booking_requests SET total_count = total_count - ?
             WHERE id = ? AND total_count IS NOT NULL",
        )
        .bind(removed)
        .bind(request_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn complete_past(&self, now: NaiveDateTime) -> Result<u64, AppError> {
        // slot is "HH:MM-HH:MM"; substr(slot, 7) is the end time.
        let result = sqlx::query(
            "UPDATE sessions SET status = 'COMPLETED'
             WHERE status = 'SCHEDULED' AND (date < ? OR (date = ? AND substr(slot, 7) <= ?))",
        )
        .bind(now.date())
        .bind(now.date())
        .bind(now.time().format("%H:%M").to_string())
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
