use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::models::session::Session;
use crate::domain::models::suspension::SuspensionRequest;
use crate::domain::ports::{
    BalanceService, ChangeEventSink, EnrollmentRepository, LockService, SessionRepository,
    SuspensionRepository,
};
use crate::domain::services::busy_cache::BusyCache;
use crate::domain::services::quota::QuotaService;
use crate::error::AppError;
use crate::infra::lock::acquire_with_retry;

/// A suspension must cover at least two full weeks.
pub const MIN_SPAN_DAYS: i64 = 14;
/// And be requested at least one week before it starts.
pub const MIN_LEAD_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct ApplySuspension {
    pub enrollment_id: String,
    /// "STUDENT" or "TEACHER"
    pub applicant_type: String,
    pub applicant_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SuspensionOutcome {
    pub suspension_id: String,
    pub removed: i32,
    pub refund_cents: i64,
}

/// Pauses an enrollment over a date range. Approval soft-cancels the covered
/// sessions, shrinks the enrollment, and refunds the student for the removed
/// teaching time.
pub struct SuspensionService {
    suspensions: Arc<dyn SuspensionRepository>,
    sessions: Arc<dyn SessionRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    quota: Arc<QuotaService>,
    balance: Arc<dyn BalanceService>,
    lock: Arc<dyn LockService>,
    busy_cache: Arc<BusyCache>,
    events: Arc<dyn ChangeEventSink>,
    lock_ttl: Duration,
    lock_retries: u32,
    lock_interval: Duration,
}

impl SuspensionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        suspensions: Arc<dyn SuspensionRepository>,
        sessions: Arc<dyn SessionRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        quota: Arc<QuotaService>,
        balance: Arc<dyn BalanceService>,
        lock: Arc<dyn LockService>,
        busy_cache: Arc<BusyCache>,
        events: Arc<dyn ChangeEventSink>,
        config: &Config,
    ) -> Self {
        Self {
            suspensions,
            sessions,
            enrollments,
            quota,
            balance,
            lock,
            busy_cache,
            events,
            lock_ttl: Duration::from_secs(config.lock_ttl_secs),
            lock_retries: config.lock_retries,
            lock_interval: Duration::from_millis(config.lock_interval_ms),
        }
    }

    pub async fn apply(&self, params: ApplySuspension) -> Result<SuspensionRequest, AppError> {
        if params.applicant_type != "STUDENT" && params.applicant_type != "TEACHER" {
            return Err(AppError::Validation(format!(
                "Unknown applicant type: {}",
                params.applicant_type
            )));
        }
        let today = Utc::now().naive_utc().date();
        if params.start_date - today < ChronoDuration::days(MIN_LEAD_DAYS) {
            return Err(AppError::Validation(format!(
                "Suspensions must be requested at least {} days in advance",
                MIN_LEAD_DAYS
            )));
        }
        if params.end_date - params.start_date < ChronoDuration::days(MIN_SPAN_DAYS - 1) {
            return Err(AppError::Validation(format!(
                "Suspensions must cover at least {} days",
                MIN_SPAN_DAYS
            )));
        }

        let enrollment = self
            .enrollments
            .find_by_id(&params.enrollment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Enrollment not found".into()))?;
        if enrollment.status != "ACTIVE" {
            return Err(AppError::Conflict(format!(
                "Enrollment is {}, only active enrollments can be suspended",
                enrollment.status.to_lowercase()
            )));
        }

        let usage = self
            .quota
            .consume_on_apply(
                &params.applicant_type,
                &params.applicant_id,
                &enrollment,
                today,
            )
            .await;

        let request = SuspensionRequest::new(
            params.enrollment_id,
            params.applicant_type,
            params.applicant_id,
            params.start_date,
            params.end_date,
            usage.over_quota,
        );
        let created = match self.suspensions.create(&request).await {
            Ok(created) => created,
            Err(e) => {
                // The consumed unit must not leak when the row never lands.
                self.quota
                    .rollback(
                        &request.applicant_type,
                        &request.applicant_id,
                        &enrollment,
                        today,
                    )
                    .await;
                return Err(e);
            }
        };
        info!(
            suspension_id = %created.id,
            enrollment_id = %created.enrollment_id,
            over_quota = usage.over_quota,
            "suspension request applied"
        );
        Ok(created)
    }

    pub async fn approve(
        &self,
        suspension_id: &str,
        reviewer_id: &str,
    ) -> Result<SuspensionOutcome, AppError> {
        let request = self
            .suspensions
            .find_by_id(suspension_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Suspension request not found".into()))?;
        if request.status != "PENDING" {
            return Err(AppError::Conflict(format!(
                "Suspension already {}",
                request.status.to_lowercase()
            )));
        }
        let enrollment = self
            .enrollments
            .find_by_id(&request.enrollment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Enrollment not found".into()))?;

        let key = format!("lock:teacher:{}", enrollment.teacher_id);
        let token = acquire_with_retry(
            self.lock.as_ref(),
            &key,
            self.lock_ttl,
            self.lock_retries,
            self.lock_interval,
        )
        .await?
        .ok_or(AppError::Busy)?;

        let result = self
            .approve_locked(&request, &enrollment, reviewer_id)
            .await;
        if let Err(e) = self.lock.release(&key, &token).await {
            warn!(%key, "lock release failed: {:?}", e);
        }
        result
    }

    async fn approve_locked(
        &self,
        request: &SuspensionRequest,
        enrollment: &crate::domain::models::enrollment::Enrollment,
        reviewer_id: &str,
    ) -> Result<SuspensionOutcome, AppError> {
        let flipped = self
            .suspensions
            .transition(&request.id, "PENDING", "APPROVED", Some(reviewer_id))
            .await?;
        if !flipped {
            return Err(AppError::Conflict("Suspension already reviewed".into()));
        }

        let covered = self
            .sessions
            .list_active_by_enrollment_range(&enrollment.id, request.start_date, request.end_date)
            .await?;
        let removed_ids: Vec<String> = covered.iter().map(|s| s.id.clone()).collect();
        let refund_cents = refund_for(&covered, enrollment.hourly_rate_cents);

        // Credit before cancelling: a refused refund leaves the timetable
        // untouched instead of stranding cancelled, unrefunded sessions.
        if refund_cents > 0 {
            let credited = self
                .balance
                .credit(
                    &enrollment.student_id,
                    refund_cents,
                    "ENROLLMENT_SUSPENSION",
                    &request.id,
                )
                .await?;
            if !credited {
                return Err(AppError::InternalWithMsg(format!(
                    "Refund of {} cents for suspension {} was not accepted",
                    refund_cents, request.id
                )));
            }
        }

        if !removed_ids.is_empty() {
            self.sessions
                .cancel_for_suspension(&removed_ids, &enrollment.id, &enrollment.request_id)
                .await?;
        }

        self.enrollments
            .set_status(&enrollment.id, "SUSPENDED")
            .await?;

        let dates: Vec<NaiveDate> = covered.iter().map(|s| s.date).collect();
        self.busy_cache
            .invalidate(&enrollment.teacher_id, &dates)
            .await;
        self.events
            .publish(
                "suspension.approved",
                json!({
                    "suspension_id": request.id,
                    "enrollment_id": enrollment.id,
                    "removed": removed_ids.len(),
                    "refund_cents": refund_cents,
                }),
            )
            .await;
        info!(
            suspension_id = %request.id,
            removed = removed_ids.len(),
            refund_cents,
            "suspension approved"
        );
        Ok(SuspensionOutcome {
            suspension_id: request.id.clone(),
            removed: removed_ids.len() as i32,
            refund_cents,
        })
    }

    pub async fn reject(&self, suspension_id: &str, reviewer_id: &str) -> Result<(), AppError> {
        self.close(suspension_id, "REJECTED", Some(reviewer_id)).await
    }

    pub async fn cancel(&self, suspension_id: &str) -> Result<(), AppError> {
        self.close(suspension_id, "CANCELLED", None).await
    }

    async fn close(
        &self,
        suspension_id: &str,
        to: &str,
        reviewer_id: Option<&str>,
    ) -> Result<(), AppError> {
        let request = self
            .suspensions
            .find_by_id(suspension_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Suspension request not found".into()))?;
        let flipped = self
            .suspensions
            .transition(suspension_id, "PENDING", to, reviewer_id)
            .await?;
        if !flipped {
            return Err(AppError::Conflict(format!(
                "Suspension already {}",
                request.status.to_lowercase()
            )));
        }

        if let Some(enrollment) = self.enrollments.find_by_id(&request.enrollment_id).await? {
            self.quota
                .rollback(
                    &request.applicant_type,
                    &request.applicant_id,
                    &enrollment,
                    request.created_at.naive_utc().date(),
                )
                .await;
        }
        self.events
            .publish(
                "suspension.closed",
                json!({ "suspension_id": suspension_id, "status": to }),
            )
            .await;
        Ok(())
    }
}

/// Hourly-rate refund for the removed sessions, rounded down per session.
fn refund_for(sessions: &[Session], hourly_rate_cents: i64) -> i64 {
    sessions
        .iter()
        .map(|s| s.slot.duration_minutes() * hourly_rate_cents / 60)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::session::NewSessionParams;

    fn session(slot: &str) -> Session {
        Session::new(NewSessionParams {
            request_id: "r1".into(),
            enrollment_id: Some("e1".into()),
            teacher_id: "t1".into(),
            student_id: "s1".into(),
            course_id: None,
            date: NaiveDate::from_ymd_opt(2026, 9, 7).unwrap(),
            slot: slot.parse().unwrap(),
            trial: false,
            sequence_no: 1,
        })
    }

    #[test]
    fn refund_scales_with_duration_and_rate() {
        let sessions = vec![session("08:00-10:00"), session("17:00-19:00")];
        // Two 2-hour sessions at 50.00/h.
        assert_eq!(refund_for(&sessions, 5000), 20_000);
        assert_eq!(refund_for(&[], 5000), 0);
    }
}
