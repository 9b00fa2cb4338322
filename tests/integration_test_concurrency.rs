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

#[tokio::test]
async fn concurrent_rival_approvals_commit_exactly_one_session() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;
    let date = next_weekday(Weekday::Mon, 1);

    let mut ids = Vec::new();
    for student in ["s1", "s2"] {
        let body = parse_body(
            app.post(
                "/api/v1/booking-requests",
                json!({
                    "student_id": student, "teacher_id": "t1", "kind": "SINGLE",
                    "date": date, "slot": "08:00-10:00", "hourly_rate_cents": 5000
                }),
            )
            .await,
        )
        .await;
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let first_uri = format!("/api/v1/booking-requests/{}/approve", ids[0]);
    let second_uri = format!("/api/v1/booking-requests/{}/approve", ids[1]);
    let (first, second) = tokio::join!(
        app.post(&first_uri, json!({})),
        app.post(&second_uri, json!({})),
    );

    let statuses = [first.status(), second.status()];
    let successes = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1, "exactly one rival wins: {:?}", statuses);
    assert!(statuses
        .iter()
        .any(|s| *s == StatusCode::CONFLICT || *s == StatusCode::SERVICE_UNAVAILABLE));

    let sessions = app
        .state
        .session_repo
        .list_active_by_teacher_date("t1", date)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn concurrent_approvals_of_the_same_request_agree() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;
    let date = next_weekday(Weekday::Mon, 1);

    let body = parse_body(
        app.post(
            "/api/v1/booking-requests",
            json!({
                "student_id": "s1", "teacher_id": "t1", "kind": "SINGLE",
                "date": date, "slot": "10:00-12:00", "hourly_rate_cents": 5000
            }),
        )
        .await,
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let approve_uri = format!("/api/v1/booking-requests/{}/approve", id);
    let (first, second) = tokio::join!(
        app.post(&approve_uri, json!({})),
        app.post(&approve_uri, json!({})),
    );
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);

    let (a, b) = (parse_body(first).await, parse_body(second).await);
    assert_eq!(a["created"], json!(1));
    assert_eq!(b["created"], json!(1));

    // One session exists no matter how the lock race resolved.
    let sessions = app
        .state
        .session_repo
        .list_by_request(&id)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn racing_a_move_against_a_rival_booking_commits_no_overlap() {
    let app = TestApp::new().await;
    app.open_full_week("t1").await;

    // One-session series on d1; its move targets d2, which a rival wants too.
    let d1 = next_weekday(Weekday::Mon, 7);
    let created = parse_body(
        app.post(
            "/api/v1/booking-requests",
            json!({
                "student_id": "s1", "teacher_id": "t1", "kind": "RECURRING",
                "start_date": d1, "end_date": d1,
                "weekdays": [1], "slots": ["08:00-10:00"],
                "hourly_rate_cents": 5000
            }),
        )
        .await,
    )
    .await;
    let series_uri = format!(
        "/api/v1/booking-requests/{}/approve",
        created["id"].as_str().unwrap()
    );
    let approved = parse_body(app.post(&series_uri, json!({})).await).await;
    let session_id = approved["sessions"][0]["id"].as_str().unwrap().to_string();

    let d2 = d1 + Duration::days(7);
    let rival = parse_body(
        app.post(
            "/api/v1/booking-requests",
            json!({
                "student_id": "s2", "teacher_id": "t1", "kind": "SINGLE",
                "date": d2, "slot": "08:00-10:00", "hourly_rate_cents": 5000
            }),
        )
        .await,
    )
    .await;

    let applied = parse_body(
        app.post(
            &format!("/api/v1/sessions/{}/reschedules", session_id),
            json!({ "applicant_id": "s1", "new_date": d2, "new_slot": "08:00-10:00" }),
        )
        .await,
    )
    .await;

    // Both paths hold the same teacher lock, so they serialize: whoever runs
    // second sees the other's claim and backs off.
    let move_uri = format!(
        "/api/v1/reschedules/{}/approve",
        applied["id"].as_str().unwrap()
    );
    let rival_uri = format!(
        "/api/v1/booking-requests/{}/approve",
        rival["id"].as_str().unwrap()
    );
    let (move_resp, rival_resp) = tokio::join!(
        app.post(&move_uri, json!({ "reviewer_id": "t1" })),
        app.post(&rival_uri, json!({})),
    );

    let statuses = [move_resp.status(), rival_resp.status()];
    let successes = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1, "exactly one claim lands on d2: {:?}", statuses);

    let sessions = app
        .state
        .session_repo
        .list_active_by_teacher_date("t1", d2)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
}
