use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::dtos::requests::MonthQuery;
use crate::domain::services::calendar::{month_bounds, month_grid};
use crate::domain::services::conflict::BusyInterval;
use crate::error::AppError;
use crate::state::AppState;

/// Month-long slot-status grid for a teacher's calendar view. Occupancy comes
/// from the busy cache; this is a read-only projection.
pub async fn get_month_calendar(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (first, last) = month_bounds(query.year, query.month)?;
    let overrides = state
        .availability_repo
        .list_overrides(&teacher_id, first, last)
        .await?;
    let pending = state
        .request_repo
        .list_pending_by_teacher(&teacher_id)
        .await?;

    let mut committed: HashMap<NaiveDate, Vec<BusyInterval>> = HashMap::new();
    let mut date = first;
    while date <= last {
        let intervals = state.busy_cache.busy_intervals(&teacher_id, date).await?;
        if !intervals.is_empty() {
            committed.insert(date, intervals);
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    let days = month_grid(query.year, query.month, &overrides, &committed, &pending)?;
    Ok(Json(json!({
        "teacher_id": teacher_id,
        "year": query.year,
        "month": query.month,
        "days": days,
    })))
}
