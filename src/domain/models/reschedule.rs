use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::timeslot::TimeSlot;

/// A student's request to move one session (or cancel it, or re-pattern the
/// remaining series). Same pending -> terminal lifecycle as booking requests.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RescheduleRequest {
    pub id: String,
    pub session_id: String,
    pub request_id: String,
    pub applicant_id: String,
    pub new_date: Option<NaiveDate>,
    pub new_slot: Option<TimeSlot>,
    pub new_weekdays: Vec<u32>,
    pub new_slots: Vec<TimeSlot>,
    pub cancel_session: bool,
    pub notice_hours: i64,
    pub over_quota: bool,
    pub status: String,
    pub reviewer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewRescheduleParams {
    pub session_id: String,
    pub request_id: String,
    pub applicant_id: String,
    pub new_date: Option<NaiveDate>,
    pub new_slot: Option<TimeSlot>,
    pub new_weekdays: Vec<u32>,
    pub new_slots: Vec<TimeSlot>,
    pub cancel_session: bool,
    pub notice_hours: i64,
    pub over_quota: bool,
}

impl RescheduleRequest {
    pub fn new(params: NewRescheduleParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: params.session_id,
            request_id: params.request_id,
            applicant_id: params.applicant_id,
            new_date: params.new_date,
            new_slot: params.new_slot,
            new_weekdays: params.new_weekdays,
            new_slots: params.new_slots,
            cancel_session: params.cancel_session,
            notice_hours: params.notice_hours,
            over_quota: params.over_quota,
            status: "PENDING".to_string(),
            reviewer_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pattern_change(&self) -> bool {
        !self.new_weekdays.is_empty() && !self.new_slots.is_empty()
    }
}
