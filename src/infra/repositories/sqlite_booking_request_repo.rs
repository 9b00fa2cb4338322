use crate::domain::models::booking_request::BookingRequest;
use crate::domain::models::enrollment::Enrollment;
use crate::domain::models::session::Session;
use crate::domain::models::timeslot::{parse_slot_list, slot_list_json, TimeSlot};
use crate::domain::ports::BookingRequestRepository;
use crate::error::AppError;
use crate::infra::repositories::sqlite_session_repo::insert_session;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

pub struct SqliteBookingRequestRepo {
    pool: SqlitePool,
}

impl SqliteBookingRequestRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn map_request(row: &SqliteRow) -> Result<BookingRequest, AppError> {
    let slot: Option<TimeSlot> = row
        .get::<Option<String>, _>("slot")
        .map(|s| s.parse())
        .transpose()?;
    Ok(BookingRequest {
        id: row.get("id"),
        student_id: row.get("student_id"),
        teacher_id: row.get("teacher_id"),
        course_id: row.get("course_id"),
        kind: row.get("kind"),
        trial: row.get("trial"),
        date: row.get::<Option<NaiveDate>, _>("date"),
        slot,
        start_date: row.get::<Option<NaiveDate>, _>("start_date"),
        end_date: row.get::<Option<NaiveDate>, _>("end_date"),
        weekdays: serde_json::from_str(&row.get::<String, _>("weekdays_json"))
            .map_err(|e| AppError::InternalWithMsg(format!("corrupt weekdays_json: {}", e)))?,
        slots: parse_slot_list(&row.get::<String, _>("slots_json"))?,
        total_count: row.get("total_count"),
        hourly_rate_cents: row.get("hourly_rate_cents"),
        status: row.get("status"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

#[async_trait]
impl BookingRequestRepository for SqliteBookingRequestRepo {
    async fn create(&self, request: &BookingRequest) -> Result<BookingRequest, AppError> {
        sqlx::query(
            "INSERT INTO booking_requests (id, student_id, teacher_id, course_id, kind, trial,
                 date, slot, start_date, end_date, weekdays_json, slots_json, total_count,
                 hourly_rate_cents, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&request.student_id)
        .bind(&request.teacher_id)
        .bind(&request.course_id)
        .bind(&request.kind)
        .bind(request.trial)
        .bind(request.date)
        .bind(request.slot.map(|s| s.to_string()))
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(serde_json::to_string(&request.weekdays).unwrap_or_else(|_| "[]".into()))
        .bind(slot_list_json(&request.slots))
        .bind(request.total_count)
        .bind(request.hourly_rate_cents)
        .bind(&request.status)
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<BookingRequest>, AppError> {
        let row = sqlx::query("SELECT * FROM booking_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        row.as_ref().map(map_request).transpose()
    }

    async fn list_pending_by_teacher(
        &self,
        teacher_id: &str,
    ) -> Result<Vec<BookingRequest>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM booking_requests WHERE teacher_id = ? AND status = 'PENDING'
             ORDER BY created_at ASC",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        rows.iter().map(map_request).collect()
    }

    async fn list_by_teacher(&self, teacher_id: &str) -> Result<Vec<BookingRequest>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM booking_requests WHERE teacher_id = ? ORDER BY created_at ASC",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        rows.iter().map(map_request).collect()
    }

    async fn transition(&self, id: &str, from: &str, to: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE booking_requests SET status = ? WHERE id = ? AND status = ?")
            .bind(to)
            .bind(id)
            .bind(from)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn approve_with_sessions(
        &self,
        request_id: &str,
        sessions: &[Session],
        enrollment: Option<&Enrollment>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let result = sqlx::query(
            "UPDATE booking_requests SET status = 'APPROVED' WHERE id = ? AND status = 'PENDING'",
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            // Lost the race: another worker completed this approval.
            return Ok(false);
        }

        if let Some(enrollment) = enrollment {
            sqlx::query(
                "INSERT INTO enrollments (id, request_id, student_id, teacher_id, course_id,
                     total_sessions, hourly_rate_cents, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&enrollment.id)
            .bind(&enrollment.request_id)
            .bind(&enrollment.student_id)
            .bind(&enrollment.teacher_id)
            .bind(&enrollment.course_id)
            .bind(enrollment.total_sessions)
            .bind(enrollment.hourly_rate_cents)
            .bind(&enrollment.status)
            .bind(enrollment.created_at)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        }

        for session in sessions {
            insert_session(&mut tx, session).await?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }
}
