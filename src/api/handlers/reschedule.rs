use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::dtos::requests::{CreateRescheduleRequest, ReviewRequest};
use crate::api::dtos::responses::StatusResponse;
use crate::domain::services::reschedule::ApplyReschedule;
use crate::error::AppError;
use crate::state::AppState;

pub async fn apply_reschedule(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<CreateRescheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state
        .reschedule_service
        .apply(ApplyReschedule {
            session_id,
            applicant_id: payload.applicant_id,
            new_date: payload.new_date,
            new_slot: payload.new_slot,
            new_weekdays: payload.new_weekdays,
            new_slots: payload.new_slots,
            cancel_session: payload.cancel_session,
        })
        .await?;
    Ok(Json(created))
}

pub async fn approve_reschedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .reschedule_service
        .approve(&id, &payload.reviewer_id)
        .await?;
    Ok(Json(outcome))
}

pub async fn reject_reschedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .reschedule_service
        .reject(&id, &payload.reviewer_id)
        .await?;
    Ok(Json(StatusResponse {
        id,
        status: "REJECTED".into(),
    }))
}

pub async fn cancel_reschedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.reschedule_service.cancel(&id).await?;
    Ok(Json(StatusResponse {
        id,
        status: "CANCELLED".into(),
    }))
}
