use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::timeslot::TimeSlot;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingRequest {
    pub id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub course_id: Option<String>,
    /// "SINGLE" or "RECURRING"
    pub kind: String,
    /// Trial bookings are fixed to 30-minute sub-slots.
    pub trial: bool,
    pub date: Option<NaiveDate>,
    pub slot: Option<TimeSlot>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub weekdays: Vec<u32>,
    pub slots: Vec<TimeSlot>,
    pub total_count: Option<i32>,
    pub hourly_rate_cents: i64,
    /// "PENDING" | "APPROVED" | "REJECTED" | "CANCELLED"
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewSingleRequest {
    pub student_id: String,
    pub teacher_id: String,
    pub course_id: Option<String>,
    pub trial: bool,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub hourly_rate_cents: i64,
}

pub struct NewRecurringRequest {
    pub student_id: String,
    pub teacher_id: String,
    pub course_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weekdays: Vec<u32>,
    pub slots: Vec<TimeSlot>,
    pub total_count: Option<i32>,
    pub hourly_rate_cents: i64,
}

impl BookingRequest {
    pub fn new_single(params: NewSingleRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            student_id: params.student_id,
            teacher_id: params.teacher_id,
            course_id: params.course_id,
            kind: "SINGLE".to_string(),
            trial: params.trial,
            date: Some(params.date),
            slot: Some(params.slot),
            start_date: None,
            end_date: None,
            weekdays: Vec::new(),
            slots: Vec::new(),
            total_count: None,
            hourly_rate_cents: params.hourly_rate_cents,
            status: "PENDING".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn new_recurring(params: NewRecurringRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            student_id: params.student_id,
            teacher_id: params.teacher_id,
            course_id: params.course_id,
            kind: "RECURRING".to_string(),
            trial: false,
            date: None,
            slot: None,
            start_date: Some(params.start_date),
            end_date: Some(params.end_date),
            weekdays: params.weekdays,
            slots: params.slots,
            total_count: params.total_count,
            hourly_rate_cents: params.hourly_rate_cents,
            status: "PENDING".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.kind == "RECURRING"
    }
}
