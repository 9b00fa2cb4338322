use axum::{
    body::Body,
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use crate::api::handlers::{
    availability, booking, calendar, conflict, health, reschedule, suspension,
};
use crate::state::AppState;
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{error, info, info_span, Span};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Teacher availability
        .route(
            "/api/v1/teachers/{teacher_id}/availability",
            get(availability::get_availability),
        )
        .route(
            "/api/v1/teachers/{teacher_id}/trial-slots",
            get(availability::get_trial_slots),
        )
        .route(
            "/api/v1/teachers/{teacher_id}/weekly-availability",
            post(availability::set_weekly_availability),
        )
        .route(
            "/api/v1/teachers/{teacher_id}/daily-overrides",
            post(availability::upsert_daily_override),
        )
        .route(
            "/api/v1/teachers/{teacher_id}/calendar",
            get(calendar::get_month_calendar),
        )

        // Advisory conflict check
        .route("/api/v1/conflicts", get(conflict::check_conflicts))

        // Booking requests
        .route(
            "/api/v1/booking-requests",
            post(booking::create_booking_request).get(booking::list_booking_requests),
        )
        .route(
            "/api/v1/booking-requests/{id}",
            get(booking::get_booking_request),
        )
        .route(
            "/api/v1/booking-requests/{id}/approve",
            post(booking::approve_booking_request),
        )
        .route(
            "/api/v1/booking-requests/{id}/reject",
            post(booking::reject_booking_request),
        )
        .route(
            "/api/v1/booking-requests/{id}/cancel",
            post(booking::cancel_booking_request),
        )

        // Reschedules
        .route(
            "/api/v1/sessions/{session_id}/reschedules",
            post(reschedule::apply_reschedule),
        )
        .route(
            "/api/v1/reschedules/{id}/approve",
            post(reschedule::approve_reschedule),
        )
        .route(
            "/api/v1/reschedules/{id}/reject",
            post(reschedule::reject_reschedule),
        )
        .route(
            "/api/v1/reschedules/{id}/cancel",
            post(reschedule::cancel_reschedule),
        )

        // Suspensions
        .route(
            "/api/v1/enrollments/{enrollment_id}/suspensions",
            post(suspension::apply_suspension),
        )
        .route(
            "/api/v1/suspensions/{id}/approve",
            post(suspension::approve_suspension),
        )
        .route(
            "/api/v1/suspensions/{id}/reject",
            post(suspension::reject_suspension),
        )
        .route(
            "/api/v1/suspensions/{id}/cancel",
            post(suspension::cancel_suspension),
        )

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!(
                        "started processing request: {} {}",
                        request.method(),
                        request.uri().path()
                    );
                })
                .on_response(
                    |response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                        info!(
                            status = response.status().as_u16(),
                            latency_ms = latency.as_millis(),
                            "finished processing request"
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        error!("request failed: {:?}", error);
                    },
                ),
        )
        .with_state(state)
}
