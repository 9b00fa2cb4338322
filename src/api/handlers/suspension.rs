use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::dtos::requests::{CreateSuspensionRequest, ReviewRequest};
use crate::api::dtos::responses::StatusResponse;
use crate::domain::services::suspension::ApplySuspension;
use crate::error::AppError;
use crate::state::AppState;

pub async fn apply_suspension(
    State(state): State<Arc<AppState>>,
    Path(enrollment_id): Path<String>,
    Json(payload): Json<CreateSuspensionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state
        .suspension_service
        .apply(ApplySuspension {
            enrollment_id,
            applicant_type: payload.applicant_type,
            applicant_id: payload.applicant_id,
            start_date: payload.start_date,
            end_date: payload.end_date,
        })
        .await?;
    Ok(Json(created))
}

pub async fn approve_suspension(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .suspension_service
        .approve(&id, &payload.reviewer_id)
        .await?;
    Ok(Json(outcome))
}

pub async fn reject_suspension(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .suspension_service
        .reject(&id, &payload.reviewer_id)
        .await?;
    Ok(Json(StatusResponse {
        id,
        status: "REJECTED".into(),
    }))
}

pub async fn cancel_suspension(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.suspension_service.cancel(&id).await?;
    Ok(Json(StatusResponse {
        id,
        status: "CANCELLED".into(),
    }))
}
