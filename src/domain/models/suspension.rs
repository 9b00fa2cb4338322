use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to pause an enrollment over a date range. Approval soft-cancels
/// the covered future sessions and refunds the student.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SuspensionRequest {
    pub id: String,
    pub enrollment_id: String,
    /// "STUDENT" or "TEACHER"
    pub applicant_type: String,
    pub applicant_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub over_quota: bool,
    pub status: String,
    pub reviewer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SuspensionRequest {
    pub fn new(
        enrollment_id: String,
        applicant_type: String,
        applicant_id: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        over_quota: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            enrollment_id,
            applicant_type,
            applicant_id,
            start_date,
            end_date,
            over_quota,
            status: "PENDING".to_string(),
            reviewer_id: None,
            created_at: Utc::now(),
        }
    }
}
