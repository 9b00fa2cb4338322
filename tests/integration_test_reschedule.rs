mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use common::{parse_body, TestApp};
use serde_json::{json, Value};
use std::sync::Arc;

use tutoring_scheduler::domain::models::reschedule::RescheduleRequest;
use tutoring_scheduler::domain::ports::RescheduleRepository;
use tutoring_scheduler::domain::services::reschedule::{ApplyReschedule, RescheduleService};
use tutoring_scheduler::error::AppError;

fn next_weekday(target: Weekday, min_days_ahead: i64) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(min_days_ahead);
    while date.weekday() != target {
        date = date.succ_opt().unwrap();
    }
    date
}

/// Approves a Mondays-only series and returns (request_id, sessions).
async fn approved_monday_series(app: &TestApp, weeks: i64) -> (String, Vec<Value>) {
    let start = next_weekday(Weekday::Mon, 7);
    let end = start + Duration::days(weeks * 7 - 1);
    let created = parse_body(
        app.post(
            "/api/v1/booking-requests",
            json!({
                "student_id": "s1", "teacher_id": "t1", "kind": "RECURRING",
                "start_date": start, "end_date": end,
                "weekdays": [1], "slots": ["08:00-10:00"],
                "hourly_rate_cents": 5000
            }),
        )
        .await,
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    let body = parse_body(
        app.post(&format!("/api/v1/booking-requests/{}/approve", id), json!({}))
            .await,
    )
    .await;
    let sessions = body["sessions"].as_array().unwrap().clone();
    assert_eq!(sessions.len() as i64, weeks);
    (id, sessions)
}

#[tokio::test]
async fn adjustment_needs_two_hours_of_notice() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;

    // A session already in the past cannot be adjusted.
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let created = parse_body(
        app.post(
            "/api/v1/booking-requests",
            json!({
                "student_id": "s1", "teacher_id": "t1", "kind": "SINGLE",
                "date": yesterday, "slot": "08:00-10:00", "hourly_rate_cents": 5000
            }),
        )
        .await,
    )
    .await;
    let request_id = created["id"].as_str().unwrap();
    let approved = parse_body(
        app.post(&format!("/api/v1/booking-requests/{}/approve", request_id), json!({}))
            .await,
    )
    .await;
    let session_id = approved["sessions"][0]["id"].as_str().unwrap();

    let response = app
        .post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({
                "applicant_id": "s1",
                "new_date": next_weekday(Weekday::Mon, 7),
                "new_slot": "08:00-10:00"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn approved_move_renumbers_the_series_chronologically() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;
    let (request_id, sessions) = approved_monday_series(&app, 4).await;

    // Move the second session past the end of the series.
    let second = sessions
        .iter()
        .find(|s| s["sequence_no"] == json!(2))
        .unwrap();
    let session_id = second["id"].as_str().unwrap();
    let last_date: NaiveDate = sessions[3]["date"].as_str().unwrap().parse().unwrap();
    let new_date = last_date + Duration::days(7);

    let applied = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({ "applicant_id": "s1", "new_date": new_date, "new_slot": "08:00-10:00" }),
        )
        .await,
    )
    .await;
    assert_eq!(applied["status"], json!("PENDING"));
    let reschedule_id = applied["id"].as_str().unwrap();

    let response = app
        .post(
            &format!("/api/v1/reschedules/{}/approve", reschedule_id),
            json!({ "reviewer_id": "t1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Sequence numbers follow (date, start) order with no gaps.
    let mut stored = app
        .state
        .session_repo
        .list_by_request(&request_id)
        .await
        .unwrap();
    stored.sort_by_key(|s| s.date);
    let seqs: Vec<i32> = stored.iter().map(|s| s.sequence_no).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);
    assert_eq!(stored[3].date, new_date);
    assert_eq!(stored[3].id, session_id);
}

#[tokio::test]
async fn conflicted_target_slot_rejects_the_move() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;
    let (_, sessions) = approved_monday_series(&app, 2).await;

    // The second session's slot is taken by another student.
    let target_date: NaiveDate = sessions[1]["date"].as_str().unwrap().parse().unwrap();
    let session_id = sessions[0]["id"].as_str().unwrap();

    let applied = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({ "applicant_id": "s1", "new_date": target_date, "new_slot": "08:00-10:00" }),
        )
        .await,
    )
    .await;
    let reschedule_id = applied["id"].as_str().unwrap();

    let response = app
        .post(
            &format!("/api/v1/reschedules/{}/approve", reschedule_id),
            json!({ "reviewer_id": "t1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The session stayed where it was; the busy target date holds one session.
    let stored = app
        .state
        .session_repo
        .find_by_id(session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.date.to_string(), sessions[0]["date"].as_str().unwrap());
    let on_target = app
        .state
        .session_repo
        .list_active_by_teacher_date("t1", target_date)
        .await
        .unwrap();
    assert_eq!(on_target.len(), 1);
}

#[tokio::test]
async fn trial_moves_respect_availability_and_pending_requests() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;

    let d1 = next_weekday(Weekday::Mon, 7);
    let created = parse_body(
        app.post(
            "/api/v1/booking-requests",
            json!({
                "student_id": "s1", "teacher_id": "t1", "kind": "SINGLE", "trial": true,
                "date": d1, "slot": "08:00-08:30", "hourly_rate_cents": 5000
            }),
        )
        .await,
    )
    .await;
    let approved = parse_body(
        app.post(
            &format!("/api/v1/booking-requests/{}/approve", created["id"].as_str().unwrap()),
            json!({}),
        )
        .await,
    )
    .await;
    let session_id = approved["sessions"][0]["id"].as_str().unwrap().to_string();

    // The next day is closed by an explicit empty override.
    let d2 = d1 + Duration::days(1);
    let response = app
        .post(
            "/api/v1/teachers/t1/daily-overrides",
            json!({ "date": d2, "slots": [] }),
        )
        .await;
    assert!(response.status().is_success());

    let applied = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({ "applicant_id": "s1", "new_date": d2, "new_slot": "08:00-08:30" }),
        )
        .await,
    )
    .await;
    let response = app
        .post(
            &format!("/api/v1/reschedules/{}/approve", applied["id"].as_str().unwrap()),
            json!({ "reviewer_id": "t1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_body(response).await;
    assert_eq!(body["reasons"], json!(["teacherUnavailable"]));

    // A pending formal request blocks the sub-slot too.
    let d3 = d1 + Duration::days(2);
    app.post(
        "/api/v1/booking-requests",
        json!({
            "student_id": "s2", "teacher_id": "t1", "kind": "SINGLE",
            "date": d3, "slot": "08:00-10:00", "hourly_rate_cents": 5000
        }),
    )
    .await;
    let applied = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({ "applicant_id": "s1", "new_date": d3, "new_slot": "08:00-08:30" }),
        )
        .await,
    )
    .await;
    let response = app
        .post(
            &format!("/api/v1/reschedules/{}/approve", applied["id"].as_str().unwrap()),
            json!({ "reviewer_id": "t1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_body(response).await;
    assert_eq!(body["reasons"], json!(["pendingFormal"]));

    // The trial never moved.
    let stored = app
        .state
        .session_repo
        .find_by_id(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.date, d1);
}

#[tokio::test]
async fn quota_is_reported_and_rolled_back_on_reject() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;
    // 10 sessions -> monthly allowance of 2.
    let (_, sessions) = approved_monday_series(&app, 10).await;
    let far_monday = next_weekday(Weekday::Mon, 120);

    let first = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", sessions[0]["id"].as_str().unwrap()),
            json!({ "applicant_id": "s1", "new_date": far_monday, "new_slot": "10:00-12:00" }),
        )
        .await,
    )
    .await;
    assert_eq!(first["over_quota"], json!(false));

    let second = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", sessions[1]["id"].as_str().unwrap()),
            json!({ "applicant_id": "s1", "new_date": far_monday + Duration::days(7), "new_slot": "10:00-12:00" }),
        )
        .await,
    )
    .await;
    assert_eq!(second["over_quota"], json!(false));

    // Rejecting the second request returns its quota unit.
    let response = app
        .post(
            &format!("/api/v1/reschedules/{}/reject", second["id"].as_str().unwrap()),
            json!({ "reviewer_id": "t1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let third = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", sessions[2]["id"].as_str().unwrap()),
            json!({ "applicant_id": "s1", "new_date": far_monday + Duration::days(14), "new_slot": "10:00-12:00" }),
        )
        .await,
    )
    .await;
    assert_eq!(third["over_quota"], json!(false));

    // The allowance is now exhausted; further applies are flagged, not blocked.
    let fourth = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", sessions[3]["id"].as_str().unwrap()),
            json!({ "applicant_id": "s1", "new_date": far_monday + Duration::days(21), "new_slot": "10:00-12:00" }),
        )
        .await,
    )
    .await;
    assert_eq!(fourth["over_quota"], json!(true));
    assert_eq!(fourth["status"], json!("PENDING"));
}

struct OfflineRescheduleStore;

#[async_trait::async_trait]
impl RescheduleRepository for OfflineRescheduleStore {
    async fn create(&self, _request: &RescheduleRequest) -> Result<RescheduleRequest, AppError> {
        Err(AppError::InternalWithMsg("reschedule store offline".into()))
    }
    async fn find_by_id(&self, _id: &str) -> Result<Option<RescheduleRequest>, AppError> {
        Ok(None)
    }
    async fn transition(
        &self,
        _id: &str,
        _from: &str,
        _to: &str,
        _reviewer_id: Option<&str>,
    ) -> Result<bool, AppError> {
        Ok(false)
    }
}

#[tokio::test]
async fn failed_request_creation_returns_the_quota_unit() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;
    // 10 sessions -> monthly allowance of 2.
    let (_, sessions) = approved_monday_series(&app, 10).await;
    let far_monday = next_weekday(Weekday::Mon, 120);

    let broken = RescheduleService::new(
        Arc::new(OfflineRescheduleStore),
        app.state.session_repo.clone(),
        app.state.enrollment_repo.clone(),
        app.state.availability_repo.clone(),
        app.state.request_repo.clone(),
        app.state.generator.clone(),
        app.state.quota_service.clone(),
        app.state.lock_service.clone(),
        app.state.busy_cache.clone(),
        app.state.event_sink.clone(),
        &app.state.config,
    );
    let result = broken
        .apply(ApplyReschedule {
            session_id: sessions[0]["id"].as_str().unwrap().to_string(),
            applicant_id: "s1".into(),
            new_date: Some(far_monday),
            new_slot: Some("10:00-12:00".parse().unwrap()),
            new_weekdays: Vec::new(),
            new_slots: Vec::new(),
            cancel_session: false,
        })
        .await;
    assert!(result.is_err());

    // Both allowance units are still there.
    for (i, offset) in [(1, 0), (2, 7)] {
        let applied = parse_body(
            app.post(
                &format!(
                    "/api/v1/sessions/{}/reschedules",
                    sessions[i]["id"].as_str().unwrap()
                ),
                json!({
                    "applicant_id": "s1",
                    "new_date": far_monday + Duration::days(offset),
                    "new_slot": "10:00-12:00"
                }),
            )
            .await,
        )
        .await;
        assert_eq!(applied["over_quota"], json!(false));
    }
}

#[tokio::test]
async fn cancellation_mode_retires_the_session() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;
    let (request_id, sessions) = approved_monday_series(&app, 3).await;
    let session_id = sessions[1]["id"].as_str().unwrap();

    let applied = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({ "applicant_id": "s1", "cancel_session": true }),
        )
        .await,
    )
    .await;
    let reschedule_id = applied["id"].as_str().unwrap();

    let response = app
        .post(
            &format!("/api/v1/reschedules/{}/approve", reschedule_id),
            json!({ "reviewer_id": "t1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app
        .state
        .session_repo
        .list_by_request(&request_id)
        .await
        .unwrap();
    let cancelled = stored.iter().find(|s| s.id == session_id).unwrap();
    assert_eq!(cancelled.status, "CANCELLED");

    // The surviving sessions renumber 1..2.
    let mut active: Vec<_> = stored.iter().filter(|s| s.status == "SCHEDULED").collect();
    active.sort_by_key(|s| s.date);
    let seqs: Vec<i32> = active.iter().map(|s| s.sequence_no).collect();
    assert_eq!(seqs, vec![1, 2]);
}

#[tokio::test]
async fn exactly_one_adjustment_mode_is_required() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;
    let (_, sessions) = approved_monday_series(&app, 2).await;
    let session_id = sessions[0]["id"].as_str().unwrap();

    // Nothing specified.
    let response = app
        .post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({ "applicant_id": "s1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Move and cancel together.
    let response = app
        .post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({
                "applicant_id": "s1", "cancel_session": true,
                "new_date": next_weekday(Weekday::Mon, 60), "new_slot": "08:00-10:00"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
