use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::models::booking_request::BookingRequest;
use crate::domain::models::enrollment::Enrollment;
use crate::domain::models::session::{NewSessionParams, Session};
use crate::domain::models::timeslot::{is_base_slot, TimeSlot};
use crate::domain::ports::{
    AvailabilityRepository, BookingRequestRepository, ChangeEventSink, LockService,
    SessionRepository,
};
use crate::domain::services::availability::resolve_base_slots;
use crate::domain::services::busy_cache::BusyCache;
use crate::domain::services::conflict::{
    check_slot, pending_intervals_on, sessions_to_intervals, BusyInterval, ConflictInputs,
};
use crate::domain::services::recurring::{GenerationSpec, RecurringGenerator};
use crate::error::AppError;
use crate::infra::lock::acquire_with_retry;

#[derive(Debug, Serialize)]
pub struct ApprovalOutcome {
    pub request_id: String,
    pub sessions: Vec<Session>,
    pub created: i32,
    pub shortfall: i32,
    /// True when another worker had already completed this approval.
    pub idempotent: bool,
}

/// Serializes approval-time session materialization per teacher so two
/// concurrent approvals cannot both pass conflict checks against stale state.
/// All conflict re-validation under the lock reads the store directly, never
/// the busy cache.
pub struct ApprovalService {
    requests: Arc<dyn BookingRequestRepository>,
    sessions: Arc<dyn SessionRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    generator: Arc<RecurringGenerator>,
    lock: Arc<dyn LockService>,
    busy_cache: Arc<BusyCache>,
    events: Arc<dyn ChangeEventSink>,
    lock_ttl: Duration,
    lock_retries: u32,
    lock_interval: Duration,
}

impl ApprovalService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        requests: Arc<dyn BookingRequestRepository>,
        sessions: Arc<dyn SessionRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        generator: Arc<RecurringGenerator>,
        lock: Arc<dyn LockService>,
        busy_cache: Arc<BusyCache>,
        events: Arc<dyn ChangeEventSink>,
        config: &Config,
    ) -> Self {
        Self {
            requests,
            sessions,
            availability,
            generator,
            lock,
            busy_cache,
            events,
            lock_ttl: Duration::from_secs(config.lock_ttl_secs),
            lock_retries: config.lock_retries,
            lock_interval: Duration::from_millis(config.lock_interval_ms),
        }
    }

    pub async fn approve(&self, request_id: &str) -> Result<ApprovalOutcome, AppError> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking request not found".into()))?;

        match request.status.as_str() {
            "PENDING" => {}
            "APPROVED" => return self.idempotent_outcome(&request).await,
            other => {
                return Err(AppError::Conflict(format!(
                    "Request already {}",
                    other.to_lowercase()
                )))
            }
        }

        let key = lock_key(&request);
        let token = acquire_with_retry(
            self.lock.as_ref(),
            &key,
            self.lock_ttl,
            self.lock_retries,
            self.lock_interval,
        )
        .await?;
        let Some(token) = token else {
            // Could not get the lock inside the bounded window. If the other
            // holder finished this very approval, succeed idempotently.
            let current = self
                .requests
                .find_by_id(request_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Booking request not found".into()))?;
            if current.status == "APPROVED" {
                return self.idempotent_outcome(&current).await;
            }
            return Err(AppError::Busy);
        };

        let result = self.approve_under_lock(request_id).await;
        if let Err(e) = self.lock.release(&key, &token).await {
            warn!(%key, "lock release failed: {:?}", e);
        }
        result
    }

    /// The request is re-read under the lock: a concurrent worker may have
    /// settled it while this one waited.
    async fn approve_under_lock(&self, request_id: &str) -> Result<ApprovalOutcome, AppError> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking request not found".into()))?;
        match request.status.as_str() {
            "PENDING" => self.approve_locked(&request).await,
            "APPROVED" => self.idempotent_outcome(&request).await,
            other => Err(AppError::Conflict(format!(
                "Request already {}",
                other.to_lowercase()
            ))),
        }
    }

    async fn approve_locked(&self, request: &BookingRequest) -> Result<ApprovalOutcome, AppError> {
        let outcome = if request.is_recurring() {
            self.approve_recurring(request).await?
        } else {
            self.approve_single(request).await?
        };

        if !outcome.idempotent {
            let dates: Vec<NaiveDate> = outcome.sessions.iter().map(|s| s.date).collect();
            self.busy_cache
                .invalidate(&request.teacher_id, &dates)
                .await;
            self.events
                .publish(
                    "booking.approved",
                    json!({
                        "request_id": request.id,
                        "teacher_id": request.teacher_id,
                        "student_id": request.student_id,
                        "created": outcome.created,
                        "shortfall": outcome.shortfall,
                    }),
                )
                .await;
            info!(
                request_id = %request.id,
                created = outcome.created,
                shortfall = outcome.shortfall,
                "booking request approved"
            );
        }
        Ok(outcome)
    }

    /// Re-validates the originally requested slot against current state; a
    /// race between request creation and approval must not double-book.
    async fn approve_single(&self, request: &BookingRequest) -> Result<ApprovalOutcome, AppError> {
        let date = request
            .date
            .ok_or_else(|| AppError::Validation("Single request is missing its date".into()))?;
        let slot = request
            .slot
            .ok_or_else(|| AppError::Validation("Single request is missing its slot".into()))?;

        let occupancy = self.day_occupancy(request, date).await?;
        let check = check_slot(&slot, request.trial, &occupancy.inputs());
        if !check.available {
            return Err(AppError::SlotUnavailable(check.reasons));
        }

        let session = Session::new(NewSessionParams {
            request_id: request.id.clone(),
            enrollment_id: None,
            teacher_id: request.teacher_id.clone(),
            student_id: request.student_id.clone(),
            course_id: request.course_id.clone(),
            date,
            slot,
            trial: request.trial,
            sequence_no: 1,
        });

        let flipped = self
            .requests
            .approve_with_sessions(&request.id, std::slice::from_ref(&session), None)
            .await?;
        if !flipped {
            return self.idempotent_outcome(request).await;
        }

        Ok(ApprovalOutcome {
            request_id: request.id.clone(),
            sessions: vec![session],
            created: 1,
            shortfall: 0,
            idempotent: false,
        })
    }

    async fn approve_recurring(
        &self,
        request: &BookingRequest,
    ) -> Result<ApprovalOutcome, AppError> {
        let start_date = request
            .start_date
            .ok_or_else(|| AppError::Validation("Recurring request is missing its start date".into()))?;
        let end_date = request
            .end_date
            .ok_or_else(|| AppError::Validation("Recurring request is missing its end date".into()))?;

        let enrollment_id = uuid::Uuid::new_v4().to_string();
        let spec = GenerationSpec {
            request_id: request.id.clone(),
            enrollment_id: Some(enrollment_id.clone()),
            teacher_id: request.teacher_id.clone(),
            student_id: request.student_id.clone(),
            course_id: request.course_id.clone(),
            start_date,
            end_date,
            weekdays: request.weekdays.clone(),
            slots: request.slots.clone(),
            target: request.total_count,
            start_seq: 1,
            exclude_request_id: Some(request.id.clone()),
            exclude_session_ids: Vec::new(),
        };
        let (sessions, shortfall) = self.generator.generate(&spec).await?;
        if shortfall > 0 {
            warn!(
                request_id = %request.id,
                shortfall,
                "recurring generation completed partially"
            );
        }

        let mut enrollment = Enrollment::new(
            request.id.clone(),
            request.student_id.clone(),
            request.teacher_id.clone(),
            request.course_id.clone(),
            sessions.len() as i32,
            request.hourly_rate_cents,
        );
        enrollment.id = enrollment_id;

        let flipped = self
            .requests
            .approve_with_sessions(&request.id, &sessions, Some(&enrollment))
            .await?;
        if !flipped {
            return self.idempotent_outcome(request).await;
        }

        Ok(ApprovalOutcome {
            request_id: request.id.clone(),
            created: sessions.len() as i32,
            sessions,
            shortfall,
            idempotent: false,
        })
    }

    pub async fn reject(&self, request_id: &str) -> Result<(), AppError> {
        self.transition(request_id, "REJECTED").await
    }

    /// Cancellation by the applicant; only pending requests can be cancelled.
    pub async fn cancel(&self, request_id: &str) -> Result<(), AppError> {
        self.transition(request_id, "CANCELLED").await
    }

    async fn transition(&self, request_id: &str, to: &str) -> Result<(), AppError> {
        let flipped = self.requests.transition(request_id, "PENDING", to).await?;
        if !flipped {
            let current = self
                .requests
                .find_by_id(request_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Booking request not found".into()))?;
            return Err(AppError::Conflict(format!(
                "Request already {}",
                current.status.to_lowercase()
            )));
        }
        self.events
            .publish("booking.closed", json!({ "request_id": request_id, "status": to }))
            .await;
        Ok(())
    }

    async fn idempotent_outcome(
        &self,
        request: &BookingRequest,
    ) -> Result<ApprovalOutcome, AppError> {
        let sessions = self.sessions.list_by_request(&request.id).await?;
        Ok(ApprovalOutcome {
            request_id: request.id.clone(),
            created: sessions.len() as i32,
            shortfall: request
                .total_count
                .map(|t| (t - sessions.len() as i32).max(0))
                .unwrap_or(0),
            sessions,
            idempotent: true,
        })
    }

    async fn day_occupancy(
        &self,
        request: &BookingRequest,
        date: NaiveDate,
    ) -> Result<DayOccupancy, AppError> {
        let weekly = self.availability.list_weekly(&request.teacher_id).await?;
        let override_rule = self
            .availability
            .find_override(&request.teacher_id, date)
            .await?;
        let availability = resolve_base_slots(&weekly, override_rule.as_ref(), date);

        let teacher_busy = sessions_to_intervals(
            &self
                .sessions
                .list_active_by_teacher_date(&request.teacher_id, date)
                .await?,
        );
        let teacher_pending = self
            .requests
            .list_pending_by_teacher(&request.teacher_id)
            .await?
            .into_iter()
            .filter(|r| r.id != request.id)
            .flat_map(|r| pending_intervals_on(&r, date))
            .collect();
        let student_busy = self
            .sessions
            .list_active_by_student_date(&request.student_id, date)
            .await?
            .into_iter()
            .map(|s| s.slot)
            .collect();

        Ok(DayOccupancy {
            availability,
            teacher_busy,
            teacher_pending,
            student_busy,
        })
    }
}

pub(crate) struct DayOccupancy {
    pub availability: Vec<TimeSlot>,
    pub teacher_busy: Vec<BusyInterval>,
    pub teacher_pending: Vec<BusyInterval>,
    pub student_busy: Vec<TimeSlot>,
}

impl DayOccupancy {
    pub fn inputs(&self) -> ConflictInputs<'_> {
        ConflictInputs {
            availability: &self.availability,
            teacher_busy: &self.teacher_busy,
            teacher_pending: &self.teacher_pending,
            student_busy: &self.student_busy,
        }
    }
}

// Reschedule and suspension approvals hold the same teacher-level key, so
// every path that materializes or moves sessions serializes per teacher.
fn lock_key(request: &BookingRequest) -> String {
    format!("lock:teacher:{}", request.teacher_id)
}

// Validation shared by the request-creation edge: single formal bookings use
// base slots, trials use 30-minute sub-slots nested in a base slot.
pub fn validate_single_slot(slot: &TimeSlot, trial: bool) -> Result<(), AppError> {
    if trial {
        if !slot.is_trial_length() {
            return Err(AppError::Validation(
                "Trial bookings are fixed to 30 minutes".to_string(),
            ));
        }
        if crate::domain::models::timeslot::base_slot_for(slot).is_none() {
            return Err(AppError::Validation(format!(
                "Trial slot must nest inside a base slot: {}",
                slot
            )));
        }
    } else if !is_base_slot(slot) {
        return Err(AppError::Validation(format!("Not a base slot: {}", slot)));
    }
    Ok(())
}
