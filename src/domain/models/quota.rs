use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Monthly adjustment counter per (actor, enrollment). The allowance is
/// computed once at first use for a month and frozen in the row.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuotaCounter {
    pub id: String,
    pub actor_type: String,
    pub actor_id: String,
    pub enrollment_id: String,
    /// "YYYY-MM"
    pub month_key: String,
    pub allowed: i32,
    pub used: i32,
    pub created_at: DateTime<Utc>,
}

impl QuotaCounter {
    pub fn new(
        actor_type: String,
        actor_id: String,
        enrollment_id: String,
        month_key: String,
        allowed: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_type,
            actor_id,
            enrollment_id,
            month_key,
            allowed,
            used: 0,
            created_at: Utc::now(),
        }
    }
}

/// min(3, max(1, floor(total_sessions * 0.2)))
pub fn monthly_allowance(total_sessions: i32) -> i32 {
    (total_sessions / 5).clamp(1, 3)
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}
