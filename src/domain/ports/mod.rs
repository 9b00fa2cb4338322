use crate::domain::models::{
    availability::{DailyOverride, WeeklyAvailability},
    booking_request::BookingRequest,
    enrollment::Enrollment,
    quota::QuotaCounter,
    reschedule::RescheduleRequest,
    session::Session,
    suspension::SuspensionRequest,
    timeslot::TimeSlot,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Replaces the teacher's whole weekly template.
    async fn set_weekly(
        &self,
        teacher_id: &str,
        rows: &[WeeklyAvailability],
    ) -> Result<(), AppError>;
    async fn list_weekly(&self, teacher_id: &str) -> Result<Vec<WeeklyAvailability>, AppError>;
    async fn upsert_override(&self, rule: &DailyOverride) -> Result<DailyOverride, AppError>;
    async fn find_override(
        &self,
        teacher_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyOverride>, AppError>;
    async fn list_overrides(
        &self,
        teacher_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyOverride>, AppError>;
}

#[async_trait]
pub trait BookingRequestRepository: Send + Sync {
    async fn create(&self, request: &BookingRequest) -> Result<BookingRequest, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<BookingRequest>, AppError>;
    async fn list_pending_by_teacher(
        &self,
        teacher_id: &str,
    ) -> Result<Vec<BookingRequest>, AppError>;
    async fn list_by_teacher(&self, teacher_id: &str) -> Result<Vec<BookingRequest>, AppError>;
    /// Single-shot status transition; false when the request was not in `from`.
    async fn transition(&self, id: &str, from: &str, to: &str) -> Result<bool, AppError>;
    /// Atomically flips the request to APPROVED and materializes its sessions
    /// (and enrollment, for recurring requests). Returns false without side
    /// effects when the request already left PENDING.
    async fn approve_with_sessions(
        &self,
        request_id: &str,
        sessions: &[Session],
        enrollment: Option<&Enrollment>,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Session>, AppError>;
    async fn list_by_request(&self, request_id: &str) -> Result<Vec<Session>, AppError>;
    /// Everything still occupying the teacher's day: scheduled sessions plus
    /// ones already completed on it.
    async fn list_active_by_teacher_date(
        &self,
        teacher_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Session>, AppError>;
    async fn list_active_by_student_date(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Session>, AppError>;
    async fn list_active_by_enrollment_range(
        &self,
        enrollment_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, AppError>;
    async fn update_time(
        &self,
        id: &str,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<Session, AppError>;
    async fn set_status(&self, id: &str, status: &str) -> Result<(), AppError>;
    async fn update_sequences(&self, assignments: &[(String, i32)]) -> Result<(), AppError>;
    /// Marks the given sessions RESCHEDULED and inserts their replacements
    /// in one transaction.
    async fn replace_series(
        &self,
        retired_ids: &[String],
        replacements: &[Session],
    ) -> Result<(), AppError>;
    /// Soft-cancels the given sessions and decrements the enrollment's and
    /// originating request's total counts, in one transaction.
    async fn cancel_for_suspension(
        &self,
        session_ids: &[String],
        enrollment_id: &str,
        request_id: &str,
    ) -> Result<(), AppError>;
    /// Marks SCHEDULED sessions whose end has passed as COMPLETED.
    async fn complete_past(&self, now: NaiveDateTime) -> Result<u64, AppError>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Enrollment>, AppError>;
    async fn find_by_request(&self, request_id: &str) -> Result<Option<Enrollment>, AppError>;
    async fn set_status(&self, id: &str, status: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait RescheduleRepository: Send + Sync {
    async fn create(&self, request: &RescheduleRequest) -> Result<RescheduleRequest, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<RescheduleRequest>, AppError>;
    async fn transition(
        &self,
        id: &str,
        from: &str,
        to: &str,
        reviewer_id: Option<&str>,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait SuspensionRepository: Send + Sync {
    async fn create(&self, request: &SuspensionRequest) -> Result<SuspensionRequest, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<SuspensionRequest>, AppError>;
    async fn transition(
        &self,
        id: &str,
        from: &str,
        to: &str,
        reviewer_id: Option<&str>,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait QuotaRepository: Send + Sync {
    /// Loads the counter row for the month, creating it with the given
    /// allowance on first use.
    async fn find_or_create(
        &self,
        actor_type: &str,
        actor_id: &str,
        enrollment_id: &str,
        month_key: &str,
        allowed: i32,
    ) -> Result<QuotaCounter, AppError>;
    /// Atomic `used = used + 1`; returns the post-increment usage.
    async fn increment(&self, id: &str) -> Result<i32, AppError>;
    /// Atomic `used = max(0, used - 1)`; returns the post-decrement usage.
    async fn decrement(&self, id: &str) -> Result<i32, AppError>;
}

/// Shared key-value cache. Best-effort only: callers must be able to fall
/// back to the store when any operation fails.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    /// Atomic set-if-absent with TTL; false when the key already exists.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, AppError>;
    /// Atomic check-then-delete; false when the stored value differs.
    async fn compare_and_delete(&self, key: &str, value: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait LockService: Send + Sync {
    /// Returns a release token when the lock was acquired.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<String>, AppError>;
    /// Releases only if the token still owns the lock.
    async fn release(&self, key: &str, token: &str) -> Result<bool, AppError>;
}

/// External account/balance service.
#[async_trait]
pub trait BalanceService: Send + Sync {
    async fn credit(
        &self,
        user_id: &str,
        amount_cents: i64,
        reason: &str,
        ref_id: &str,
    ) -> Result<bool, AppError>;
}

/// Fire-and-forget change notification sink. Implementations swallow failures.
#[async_trait]
pub trait ChangeEventSink: Send + Sync {
    async fn publish(&self, kind: &str, payload: serde_json::Value);
}
