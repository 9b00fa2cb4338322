use crate::domain::models::reschedule::RescheduleRequest;
use crate::domain::models::timeslot::{parse_slot_list, slot_list_json, TimeSlot};
use crate::domain::ports::RescheduleRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

pub struct SqliteRescheduleRepo {
    pool: SqlitePool,
}

impl SqliteRescheduleRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_reschedule(row: &SqliteRow) -> Result<RescheduleRequest, AppError> {
    let new_slot: Option<TimeSlot> = row
        .get::<Option<String>, _>("new_slot")
        .map(|s| s.parse())
        .transpose()?;
    Ok(RescheduleRequest {
        id: row.get("id"),
        session_id: row.get("session_id"),
        request_id: row.get("request_id"),
        applicant_id: row.get("applicant_id"),
        new_date: row.get::<Option<NaiveDate>, _>("new_date"),
        new_slot,
        new_weekdays: serde_json::from_str(&row.get::<String, _>("new_weekdays_json"))
            .map_err(|e| AppError::InternalWithMsg(format!("corrupt new_weekdays_json: {}", e)))?,
        new_slots: parse_slot_list(&row.get::<String, _>("new_slots_json"))?,
        cancel_session: row.get("cancel_session"),
        notice_hours: row.get("notice_hours"),
        over_quota: row.get("over_quota"),
        status: row.get("status"),
        reviewer_id: row.get("reviewer_id"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

#[async_trait]
impl RescheduleRepository for SqliteRescheduleRepo {
    async fn create(&self, request: &RescheduleRequest) -> Result<RescheduleRequest, AppError> {
        sqlx::query(
            "INSERT INTO reschedule_requests (id, session_id, request_id, applicant_id, new_date,
                 new_slot, new_weekdays_json, new_slots_json, cancel_session, notice_hours,
                 over_quota, status, reviewer_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&request.session_id)
        .bind(&request.request_id)
        .bind(&request.applicant_id)
        .bind(request.new_date)
        .bind(request.new_slot.map(|s| s.to_string()))
        .bind(serde_json::to_string(&request.new_weekdays).unwrap_or_else(|_| "[]".into()))
        .bind(slot_list_json(&request.new_slots))
        .bind(request.cancel_session)
        .bind(request.notice_hours)
        .bind(request.over_quota)
        .bind(&request.status)
        .bind(&request.reviewer_id)
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RescheduleRequest>, AppError> {
        let row = sqlx::query("SELECT * FROM reschedule_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        row.as_ref().map(map_reschedule).transpose()
    }

    async fn transition(
        &self,
        id: &str,
        from: &str,
        to: &str,
        reviewer_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE reschedule_requests SET status = ?, reviewer_id = COALESCE(?, reviewer_id)
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
