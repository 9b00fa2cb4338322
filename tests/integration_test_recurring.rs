mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use common::{parse_body, TestApp};
use serde_json::json;

fn next_weekday(target: Weekday, min_days_ahead: i64) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(min_days_ahead);
    while date.weekday() != target {
        date = date.succ_opt().unwrap();
    }
    date
}

async fn create_recurring(
    app: &TestApp,
    start: NaiveDate,
    end: NaiveDate,
    weekdays: serde_json::Value,
    slots: serde_json::Value,
    total_count: Option<i32>,
) -> String {
    let response = app
        .post(
            "/api/v1/booking-requests",
            json!({
                "student_id": "s1", "teacher_id": "t1", "kind": "RECURRING",
                "start_date": start, "end_date": end,
                "weekdays": weekdays, "slots": slots,
                "total_count": total_count, "hourly_rate_cents": 5000
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    parse_body(response).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn expands_weekday_pattern_into_sequenced_sessions() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;

    // Six full weeks of Mondays and Wednesdays.
    let start = next_weekday(Weekday::Mon, 7);
    let end = start + Duration::days(37);
    let id = create_recurring(&app, start, end, json!([1, 3]), json!(["17:00-19:00"]), None).await;

    let response = app
        .post(&format!("/api/v1/booking-requests/{}/approve", id), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["created"], json!(12));
    assert_eq!(body["shortfall"], json!(0));

    let sessions = body["sessions"].as_array().unwrap();
    let seqs: Vec<i64> = sessions
        .iter()
        .map(|s| s["sequence_no"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, (1..=12).collect::<Vec<i64>>());
    assert!(sessions.iter().all(|s| s["slot"] == json!("17:00-19:00")));

    // An enrollment sized to the actual session count exists.
    let enrollment = app
        .state
        .enrollment_repo
        .find_by_request(&id)
        .await
        .unwrap()
        .expect("enrollment created at approval");
    assert_eq!(enrollment.total_sessions, 12);
    assert_eq!(enrollment.status, "ACTIVE");
}

#[tokio::test]
async fn conflicted_dates_are_skipped_without_a_target() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;

    let start = next_weekday(Weekday::Mon, 7);
    let end = start + Duration::days(37);

    // Commit a rival session on the second Monday.
    let blocked_date = start + Duration::days(7);
    let rival = parse_body(
        app.post(
            "/api/v1/booking-requests",
            json!({
                "student_id": "s9", "teacher_id": "t1", "kind": "SINGLE",
                "date": blocked_date, "slot": "17:00-19:00", "hourly_rate_cents": 5000
            }),
        )
        .await,
    )
    .await;
    let rival_id = rival["id"].as_str().unwrap();
    app.post(&format!("/api/v1/booking-requests/{}/approve", rival_id), json!({}))
        .await;

    let id = create_recurring(&app, start, end, json!([1, 3]), json!(["17:00-19:00"]), None).await;
    let body = parse_body(
        app.post(&format!("/api/v1/booking-requests/{}/approve", id), json!({}))
            .await,
    )
    .await;

    // 12 matching dates, one occupied.
    assert_eq!(body["created"], json!(11));
    assert!(body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["date"] != json!(blocked_date)));
}

#[tokio::test]
async fn window_extends_monthly_until_the_target_is_met() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;

    // Two-week window holds at most 2 Mondays; the target needs more.
    let start = next_weekday(Weekday::Mon, 7);
    let end = start + Duration::days(13);
    let id = create_recurring(&app, start, end, json!([1]), json!(["08:00-10:00"]), Some(8)).await;

    let body = parse_body(
        app.post(&format!("/api/v1/booking-requests/{}/approve", id), json!({}))
            .await,
    )
    .await;
    assert_eq!(body["created"], json!(8));
    assert_eq!(body["shortfall"], json!(0));

    let dates: Vec<NaiveDate> = body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["date"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(dates.iter().all(|d| d.weekday() == Weekday::Mon));
    assert!(dates.last().unwrap() > &end, "sessions spilled past the window");
}

#[tokio::test]
async fn unmeetable_target_reports_the_shortfall() {
    let app = TestApp::new().await;

    // Teacher only ever opens Monday 08:00-10:00.
    let response = app
        .post(
            "/api/v1/teachers/t1/weekly-availability",
            json!({ "days": [{ "weekday": 1, "slots": ["08:00-10:00"] }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let start = next_weekday(Weekday::Mon, 7);
    let end = start + Duration::days(13);
    // Ten extension cycles cap the window well short of 100 Mondays.
    let id =
        create_recurring(&app, start, end, json!([1]), json!(["08:00-10:00"]), Some(100)).await;

    let body = parse_body(
        app.post(&format!("/api/v1/booking-requests/{}/approve", id), json!({}))
            .await,
    )
    .await;
    let created = body["created"].as_i64().unwrap();
    let shortfall = body["shortfall"].as_i64().unwrap();
    assert!(created > 0);
    assert!(shortfall > 0);
    assert_eq!(created + shortfall, 100);
}
