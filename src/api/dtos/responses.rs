use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::models::timeslot::TimeSlot;
use crate::domain::services::conflict::ConflictReason;

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub teacher_id: String,
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

#[derive(Serialize)]
pub struct TrialSlotsResponse {
    pub teacher_id: String,
    pub date: NaiveDate,
    pub slots: Vec<TrialSlotStatus>,
}

#[derive(Serialize)]
pub struct TrialSlotStatus {
    pub slot: TimeSlot,
    pub available: bool,
    pub reasons: Vec<ConflictReason>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: String,
}
