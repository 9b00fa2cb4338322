use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::dtos::requests::ConflictQuery;
use crate::domain::models::timeslot::TimeSlot;
use crate::domain::services::availability::resolve_base_slots;
use crate::domain::services::conflict::{check_slot, pending_intervals_on, BusyInterval, ConflictInputs};
use crate::error::AppError;
use crate::state::AppState;

/// Advisory availability check for one (teacher, student, date, slot). The
/// approval path re-validates from the store; this endpoint may serve slightly
/// stale occupancy from the busy cache.
pub async fn check_conflicts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConflictQuery>,
) -> Result<impl IntoResponse, AppError> {
    let weekly = state.availability_repo.list_weekly(&query.teacher_id).await?;
    let override_rule = state
        .availability_repo
        .find_override(&query.teacher_id, query.date)
        .await?;
    let availability = resolve_base_slots(&weekly, override_rule.as_ref(), query.date);

    let teacher_busy = state
        .busy_cache
        .busy_intervals(&query.teacher_id, query.date)
        .await?;
    let teacher_pending: Vec<BusyInterval> = state
        .request_repo
        .list_pending_by_teacher(&query.teacher_id)
        .await?
        .iter()
        .flat_map(|r| pending_intervals_on(r, query.date))
        .collect();
    let student_busy: Vec<TimeSlot> = state
        .session_repo
        .list_active_by_student_date(&query.student_id, query.date)
        .await?
        .into_iter()
        .map(|s| s.slot)
        .collect();

    let inputs = ConflictInputs {
        availability: &availability,
        teacher_busy: &teacher_busy,
        teacher_pending: &teacher_pending,
        student_busy: &student_busy,
    };
    Ok(Json(check_slot(&query.slot, query.trial, &inputs)))
}
