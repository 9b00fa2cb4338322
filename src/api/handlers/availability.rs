use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{DailyOverrideRequest, TrialSlotsQuery, WeeklyAvailabilityRequest, DateQuery};
use crate::api::dtos::responses::{AvailabilityResponse, TrialSlotStatus, TrialSlotsResponse};
use crate::domain::models::availability::{DailyOverride, WeeklyAvailability};
use crate::domain::models::timeslot::{is_base_slot, trial_sub_slots, TimeSlot};
use crate::domain::services::availability::resolve_base_slots;
use crate::domain::services::conflict::{
    check_trial_sub_slot, pending_intervals_on, BusyInterval, ConflictInputs,
};
use crate::domain::services::recurring::validate_weekdays;
use crate::error::AppError;
use crate::state::AppState;

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let weekly = state.availability_repo.list_weekly(&teacher_id).await?;
    let override_rule = state
        .availability_repo
        .find_override(&teacher_id, query.date)
        .await?;
    let slots = resolve_base_slots(&weekly, override_rule.as_ref(), query.date);
    Ok(Json(AvailabilityResponse {
        teacher_id,
        date: query.date,
        slots,
    }))
}

/// 30-minute sub-slot statuses for trial booking, over the teacher's resolved
/// availability. `student_id` adds the student's own occupancy to the check.
pub async fn get_trial_slots(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
    Query(query): Query<TrialSlotsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let weekly = state.availability_repo.list_weekly(&teacher_id).await?;
    let override_rule = state
        .availability_repo
        .find_override(&teacher_id, query.date)
        .await?;
    let availability = resolve_base_slots(&weekly, override_rule.as_ref(), query.date);

    let teacher_busy = state.busy_cache.busy_intervals(&teacher_id, query.date).await?;
    let teacher_pending: Vec<BusyInterval> = state
        .request_repo
        .list_pending_by_teacher(&teacher_id)
        .await?
        .iter()
        .flat_map(|r| pending_intervals_on(r, query.date))
        .collect();
    let student_busy: Vec<TimeSlot> = match &query.student_id {
        Some(student_id) => state
            .session_repo
            .list_active_by_student_date(student_id, query.date)
            .await?
            .into_iter()
            .map(|s| s.slot)
            .collect(),
        None => Vec::new(),
    };

    let inputs = ConflictInputs {
        availability: &availability,
        teacher_busy: &teacher_busy,
        teacher_pending: &teacher_pending,
        student_busy: &student_busy,
    };
    let slots = availability
        .iter()
        .flat_map(|base| trial_sub_slots(base))
        .map(|sub| {
            let check = check_trial_sub_slot(&sub, &inputs);
            TrialSlotStatus {
                slot: sub,
                available: check.available,
                reasons: check.reasons,
            }
        })
        .collect();

    Ok(Json(TrialSlotsResponse {
        teacher_id,
        date: query.date,
        slots,
    }))
}

pub async fn set_weekly_availability(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
    Json(payload): Json<WeeklyAvailabilityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let weekdays: Vec<u32> = payload.days.iter().map(|d| d.weekday).collect();
    validate_weekdays(&weekdays)?;
    for day in &payload.days {
        validate_base_slots(&day.slots)?;
    }

    let rows: Vec<WeeklyAvailability> = payload
        .days
        .into_iter()
        .map(|d| WeeklyAvailability::new(teacher_id.clone(), d.weekday, d.slots))
        .collect();
    state.availability_repo.set_weekly(&teacher_id, &rows).await?;
    info!(%teacher_id, days = rows.len(), "weekly availability replaced");
    Ok(Json(rows))
}

pub async fn upsert_daily_override(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
    Json(payload): Json<DailyOverrideRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_base_slots(&payload.slots)?;
    let rule = DailyOverride::new(teacher_id.clone(), payload.date, payload.slots);
    let saved = state.availability_repo.upsert_override(&rule).await?;
    info!(%teacher_id, date = %saved.date, "daily override upserted");
    Ok(Json(saved))
}

fn validate_base_slots(slots: &[TimeSlot]) -> Result<(), AppError> {
    if let Some(bad) = slots.iter().find(|s| !is_base_slot(s)) {
        return Err(AppError::Validation(format!("Not a base slot: {}", bad)));
    }
    Ok(())
}
