use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An active recurring engagement between a student and a teacher,
/// created when a recurring booking request is approved.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Enrollment {
    pub id: String,
    pub request_id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub course_id: Option<String>,
    pub total_sessions: i32,
    pub hourly_rate_cents: i64,
    /// "ACTIVE" | "SUSPENDED" | "FINISHED"
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(
        request_id: String,
        student_id: String,
        teacher_id: String,
        course_id: Option<String>,
        total_sessions: i32,
        hourly_rate_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request_id,
            student_id,
            teacher_id,
            course_id,
            total_sessions,
            hourly_rate_cents,
            status: "ACTIVE".to_string(),
            created_at: Utc::now(),
        }
    }
}
