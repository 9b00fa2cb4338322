use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{CreateBookingRequest, TeacherQuery};
use crate::api::dtos::responses::StatusResponse;
use crate::domain::models::booking_request::{
    BookingRequest, NewRecurringRequest, NewSingleRequest,
};
use crate::domain::models::timeslot::is_base_slot;
use crate::domain::services::approval::validate_single_slot;
use crate::domain::services::recurring::validate_weekdays;
use crate::error::AppError;
use crate::state::AppState;

/// Creation only records intent; conflicts are judged at approval time.
pub async fn create_booking_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.hourly_rate_cents < 0 {
        return Err(AppError::Validation("Hourly rate cannot be negative".into()));
    }
    let request = match payload.kind.as_str() {
        "SINGLE" => {
            let date = payload
                .date
                .ok_or_else(|| AppError::Validation("Single booking needs a date".into()))?;
            let slot = payload
                .slot
                .ok_or_else(|| AppError::Validation("Single booking needs a slot".into()))?;
            validate_single_slot(&slot, payload.trial)?;
            BookingRequest::new_single(NewSingleRequest {
                student_id: payload.student_id,
                teacher_id: payload.teacher_id,
                course_id: payload.course_id,
                trial: payload.trial,
                date,
                slot,
                hourly_rate_cents: payload.hourly_rate_cents,
            })
        }
        "RECURRING" => {
            let start_date = payload
                .start_date
                .ok_or_else(|| AppError::Validation("Recurring booking needs a start date".into()))?;
            let end_date = payload
                .end_date
                .ok_or_else(|| AppError::Validation("Recurring booking needs an end date".into()))?;
            if start_date > end_date {
                return Err(AppError::Validation("Date range is inverted".into()));
            }
            validate_weekdays(&payload.weekdays)?;
            if payload.slots.is_empty() {
                return Err(AppError::Validation(
                    "Recurring booking needs at least one slot".into(),
                ));
            }
            if let Some(bad) = payload.slots.iter().find(|s| !is_base_slot(s)) {
                return Err(AppError::Validation(format!("Not a base slot: {}", bad)));
            }
            if payload.total_count.is_some_and(|t| t <= 0) {
                return Err(AppError::Validation(
                    "Target session count must be positive".into(),
                ));
            }
            BookingRequest::new_recurring(NewRecurringRequest {
                student_id: payload.student_id,
                teacher_id: payload.teacher_id,
                course_id: payload.course_id,
                start_date,
                end_date,
                weekdays: payload.weekdays,
                slots: payload.slots,
                total_count: payload.total_count,
                hourly_rate_cents: payload.hourly_rate_cents,
            })
        }
        other => {
            return Err(AppError::Validation(format!(
                "Unknown booking kind: {}",
                other
            )))
        }
    };

    let created = state.request_repo.create(&request).await?;
    info!(request_id = %created.id, kind = %created.kind, "booking request created");
    Ok(Json(created))
}

pub async fn get_booking_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let request = state
        .request_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking request not found".into()))?;
    Ok(Json(request))
}

pub async fn list_booking_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TeacherQuery>,
) -> Result<impl IntoResponse, AppError> {
    let requests = state.request_repo.list_by_teacher(&query.teacher_id).await?;
    Ok(Json(requests))
}

pub async fn approve_booking_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.approval_service.approve(&id).await?;
    Ok(Json(outcome))
}

pub async fn reject_booking_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.approval_service.reject(&id).await?;
    Ok(Json(StatusResponse {
        id,
        status: "REJECTED".into(),
    }))
}

pub async fn cancel_booking_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.approval_service.cancel(&id).await?;
    Ok(Json(StatusResponse {
        id,
        status: "CANCELLED".into(),
    }))
}
