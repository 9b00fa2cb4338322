use crate::domain::models::availability::{DailyOverride, WeeklyAvailability};
use crate::domain::models::timeslot::{parse_slot_list, slot_list_json};
use crate::domain::ports::AvailabilityRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

pub struct SqliteAvailabilityRepo {
    pool: SqlitePool,
}

impl SqliteAvailabilityRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_weekly(row: &SqliteRow) -> Result<WeeklyAvailability, AppError> {
    Ok(WeeklyAvailability {
        teacher_id: row.get("teacher_id"),
        weekday: row.get::<i64, _>("weekday") as u32,
        slots: parse_slot_list(&row.get::<String, _>("slots_json"))?,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

fn map_override(row: &SqliteRow) -> Result<DailyOverride, AppError> {
    Ok(DailyOverride {
        teacher_id: row.get("teacher_id"),
        date: row.get::<NaiveDate, _>("date"),
        slots: parse_slot_list(&row.get::<String, _>("slots_json"))?,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

#[async_trait]
impl AvailabilityRepository for SqliteAvailabilityRepo {
    async fn set_weekly(
        &self,
        teacher_id: &str,
        rows: &[WeeklyAvailability],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        sqlx::query("DELETE FROM weekly_availability WHERE teacher_id = ?")
            .bind(teacher_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        for row in rows {
            sqlx::query(
                "INSERT INTO weekly_availability (teacher_id, weekday, slots_json, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&row.teacher_id)
            .bind(row.weekday as i64)
            .bind(slot_list_json(&row.slots))
            .bind(row.created_at)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_weekly(&self, teacher_id: &str) -> Result<Vec<WeeklyAvailability>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM weekly_availability WHERE teacher_id = ? ORDER BY weekday ASC",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        rows.iter().map(map_weekly).collect()
    }

    async fn upsert_override(&self, rule: &DailyOverride) -> Result<DailyOverride, AppError> {
        sqlx::query(
            "INSERT INTO daily_overrides (teacher_id, date, slots_json, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (teacher_id, date) DO UPDATE SET slots_json = excluded.slots_json",
        )
        .bind(&rule.teacher_id)
        .bind(rule.date)
        .bind(slot_list_json(&rule.slots))
        .bind(rule.created_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(rule.clone())
    }

    async fn find_override(
        &self,
        teacher_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyOverride>, AppError> {
        let row = sqlx::query("SELECT * FROM daily_overrides WHERE teacher_id = ? AND date = ?")
            .bind(teacher_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        row.as_ref().map(map_override).transpose()
    }

    async fn list_overrides(
        &self,
        teacher_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyOverride>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM daily_overrides WHERE teacher_id = ? AND date >= ? AND date <= ?
             ORDER BY date ASC",
        )
        .bind(teacher_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;
        rows.iter().map(map_override).collect()
    }
}
