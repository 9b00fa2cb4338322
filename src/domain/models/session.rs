use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::timeslot::TimeSlot;

/// A committed teaching appointment. Never deleted, only soft-marked.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub id: String,
    pub request_id: String,
    pub enrollment_id: Option<String>,
    pub teacher_id: String,
    pub student_id: String,
    pub course_id: Option<String>,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub trial: bool,
    /// "SCHEDULED" | "COMPLETED" | "CANCELLED" | "RESCHEDULED"
    pub status: String,
    /// Position within the originating request, renumbered on reschedule.
    pub sequence_no: i32,
    pub created_at: DateTime<Utc>,
}

pub struct NewSessionParams {
    pub request_id: String,
    pub enrollment_id: Option<String>,
    pub teacher_id: String,
    pub student_id: String,
    pub course_id: Option<String>,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub trial: bool,
    pub sequence_no: i32,
}

impl Session {
    pub fn new(params: NewSessionParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request_id: params.request_id,
            enrollment_id: params.enrollment_id,
            teacher_id: params.teacher_id,
            student_id: params.student_id,
            course_id: params.course_id,
            date: params.date,
            slot: params.slot,
            trial: params.trial,
            status: "SCHEDULED".to_string(),
            sequence_no: params.sequence_no,
            created_at: Utc::now(),
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.slot.start)
    }

    pub fn is_active(&self) -> bool {
        self.status == "SCHEDULED"
    }
}
