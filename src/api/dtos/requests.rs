use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::models::timeslot::TimeSlot;

#[derive(Deserialize)]
pub struct WeeklyAvailabilityRequest {
    /// weekday (1 = Monday .. 7 = Sunday) -> base slots open that day
    pub days: Vec<WeekdaySlots>,
}

#[derive(Deserialize)]
pub struct WeekdaySlots {
    pub weekday: u32,
    pub slots: Vec<TimeSlot>,
}

#[derive(Deserialize)]
pub struct DailyOverrideRequest {
    pub date: NaiveDate,
    /// Empty means the day is closed regardless of the weekly template.
    pub slots: Vec<TimeSlot>,
}

#[derive(Deserialize)]
pub struct ConflictQuery {
    pub teacher_id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    #[serde(default)]
    pub trial: bool,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub student_id: String,
    pub teacher_id: String,
    pub course_id: Option<String>,
    /// "SINGLE" or "RECURRING"
    pub kind: String,
    #[serde(default)]
    pub trial: bool,
    pub date: Option<NaiveDate>,
    pub slot: Option<TimeSlot>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub weekdays: Vec<u32>,
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
    pub total_count: Option<i32>,
    pub hourly_rate_cents: i64,
}

#[derive(Deserialize)]
pub struct CreateRescheduleRequest {
    pub applicant_id: String,
    pub new_date: Option<NaiveDate>,
    pub new_slot: Option<TimeSlot>,
    #[serde(default)]
    pub new_weekdays: Vec<u32>,
    #[serde(default)]
    pub new_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub cancel_session: bool,
}

#[derive(Deserialize)]
pub struct CreateSuspensionRequest {
    pub applicant_type: String,
    pub applicant_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub reviewer_id: String,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Deserialize)]
pub struct TrialSlotsQuery {
    pub date: NaiveDate,
    pub student_id: Option<String>,
}

#[derive(Deserialize)]
pub struct TeacherQuery {
    pub teacher_id: String,
}

#[derive(Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}
