use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tower::ServiceExt;
use uuid::Uuid;

use tutoring_scheduler::{
    api::router::create_router,
    config::Config,
    infra::factory::build_state,
    state::AppState,
};

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config::for_tests(db_url);
        let state = Arc::new(build_state(&config, pool.clone()));
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
        }
    }

    pub async fn post(&self, uri: &str, payload: serde_json::Value) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Opens every weekday with all six base slots for the teacher.
    pub async fn open_full_week(&self, teacher_id: &str) {
        let days: Vec<serde_json::Value> = (1..=7)
            .map(|weekday| {
                serde_json::json!({
                    "weekday": weekday,
                    "slots": [
                        "08:00-10:00", "10:00-12:00", "13:00-15:00",
                        "15:00-17:00", "17:00-19:00", "19:00-21:00"
                    ]
                })
            })
            .collect();
        let response = self
            .post(
                &format!("/api/v1/teachers/{}/weekly-availability", teacher_id),
                serde_json::json!({ "days": days }),
            )
            .await;
        assert!(response.status().is_success());
    }
}

#[allow(dead_code)]
pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
    }
}
