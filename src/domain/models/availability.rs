use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::timeslot::TimeSlot;

/// One weekday row of a teacher's recurring weekly template.
/// Weekdays are 1 (Monday) through 7 (Sunday).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WeeklyAvailability {
    pub teacher_id: String,
    pub weekday: u32,
    pub slots: Vec<TimeSlot>,
    pub created_at: DateTime<Utc>,
}

impl WeeklyAvailability {
    pub fn new(teacher_id: String, weekday: u32, slots: Vec<TimeSlot>) -> Self {
        Self {
            teacher_id,
            weekday,
            slots,
            created_at: Utc::now(),
        }
    }
}

/// Date-specific availability declaration. Supersedes the weekly template
/// for its date; an empty slot set closes the whole day.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DailyOverride {
    pub teacher_id: String,
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
    pub created_at: DateTime<Utc>,
}

impl DailyOverride {
    pub fn new(teacher_id: String, date: NaiveDate, slots: Vec<TimeSlot>) -> Self {
        Self {
            teacher_id,
            date,
            slots,
            created_at: Utc::now(),
        }
    }
}
