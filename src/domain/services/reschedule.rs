use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::models::enrollment::Enrollment;
use crate::domain::models::reschedule::{NewRescheduleParams, RescheduleRequest};
use crate::domain::models::session::Session;
use crate::domain::models::timeslot::{is_base_slot, TimeSlot};
use crate::domain::ports::{
    AvailabilityRepository, BookingRequestRepository, ChangeEventSink, EnrollmentRepository,
    LockService, RescheduleRepository, SessionRepository,
};
use crate::domain::services::approval::validate_single_slot;
use crate::domain::services::availability::resolve_base_slots;
use crate::domain::services::busy_cache::BusyCache;
use crate::domain::services::conflict::{
    check_trial_sub_slot, pending_intervals_on, sessions_to_intervals, BusyInterval,
    ConflictInputs,
};
use crate::domain::services::quota::QuotaService;
use crate::domain::services::recurring::{validate_weekdays, GenerationSpec, RecurringGenerator};
use crate::error::AppError;
use crate::infra::lock::acquire_with_retry;

/// A session can be moved with at least this much advance notice.
pub const MIN_NOTICE_HOURS: i64 = 2;

#[derive(Debug, Clone)]
pub struct ApplyReschedule {
    pub session_id: String,
    pub applicant_id: String,
    pub new_date: Option<NaiveDate>,
    pub new_slot: Option<TimeSlot>,
    pub new_weekdays: Vec<u32>,
    pub new_slots: Vec<TimeSlot>,
    pub cancel_session: bool,
}

#[derive(Debug, Serialize)]
pub struct RescheduleOutcome {
    pub reschedule_id: String,
    pub moved: i32,
    pub shortfall: i32,
}

/// Session adjustments after approval: a single move, a cancellation, or a
/// re-pattern of the remaining series. Application records intent and consumes
/// quota; effects land only on teacher approval, serialized under the same
/// teacher lock the approval path uses.
pub struct RescheduleService {
    reschedules: Arc<dyn RescheduleRepository>,
    sessions: Arc<dyn SessionRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    requests: Arc<dyn BookingRequestRepository>,
    generator: Arc<RecurringGenerator>,
    quota: Arc<QuotaService>,
    lock: Arc<dyn LockService>,
    busy_cache: Arc<BusyCache>,
    events: Arc<dyn ChangeEventSink>,
    lock_ttl: Duration,
    lock_retries: u32,
    lock_interval: Duration,
}

impl RescheduleService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reschedules: Arc<dyn RescheduleRepository>,
        sessions: Arc<dyn SessionRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        requests: Arc<dyn BookingRequestRepository>,
        generator: Arc<RecurringGenerator>,
        quota: Arc<QuotaService>,
        lock: Arc<dyn LockService>,
        busy_cache: Arc<BusyCache>,
        events: Arc<dyn ChangeEventSink>,
        config: &Config,
    ) -> Self {
        Self {
            reschedules,
            sessions,
            enrollments,
            availability,
            requests,
            generator,
            quota,
            lock,
            busy_cache,
            events,
            lock_ttl: Duration::from_secs(config.lock_ttl_secs),
            lock_retries: config.lock_retries,
            lock_interval: Duration::from_millis(config.lock_interval_ms),
        }
    }

    pub async fn apply(&self, params: ApplyReschedule) -> Result<RescheduleRequest, AppError> {
        let session = self
            .sessions
            .find_by_id(&params.session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".into()))?;
        if !session.is_active() {
            return Err(AppError::Conflict(format!(
                "Session is {}, only scheduled sessions can be adjusted",
                session.status.to_lowercase()
            )));
        }

        let now = Utc::now().naive_utc();
        let notice_hours = (session.starts_at() - now).num_hours();
        if notice_hours < MIN_NOTICE_HOURS {
            return Err(AppError::Validation(format!(
                "Sessions can only be adjusted at least {} hours in advance",
                MIN_NOTICE_HOURS
            )));
        }

        self.validate_intent(&params, &session)?;

        let enrollment = self.enrollment_of(&session).await?;
        let over_quota = match &enrollment {
            Some(enrollment) => {
                self.quota
                    .consume_on_apply("STUDENT", &params.applicant_id, enrollment, now.date())
                    .await
                    .over_quota
            }
            // Trial/single sessions carry no enrollment and no quota.
            None => false,
        };

        let request = RescheduleRequest::new(NewRescheduleParams {
            session_id: params.session_id,
            request_id: session.request_id,
            applicant_id: params.applicant_id,
            new_date: params.new_date,
            new_slot: params.new_slot,
            new_weekdays: params.new_weekdays,
            new_slots: params.new_slots,
            cancel_session: params.cancel_session,
            notice_hours,
            over_quota,
        });
        let created = match self.reschedules.create(&request).await {
            Ok(created) => created,
            Err(e) => {
                // The consumed unit must not leak when the row never lands.
                if let Some(enrollment) = &enrollment {
                    self.quota
                        .rollback("STUDENT", &request.applicant_id, enrollment, now.date())
                        .await;
                }
                return Err(e);
            }
        };
        info!(
            reschedule_id = %created.id,
            session_id = %created.session_id,
            over_quota,
            "reschedule request applied"
        );
        Ok(created)
    }

    fn validate_intent(&self, params: &ApplyReschedule, session: &Session) -> Result<(), AppError> {
        let single_move = params.new_date.is_some() && params.new_slot.is_some();
        let pattern_change = !params.new_weekdays.is_empty() || !params.new_slots.is_empty();
        let modes = [params.cancel_session, single_move, pattern_change]
            .iter()
            .filter(|m| **m)
            .count();
        if modes != 1 {
            return Err(AppError::Validation(
                "Specify exactly one of: cancellation, a new date and slot, or a new weekly pattern"
                    .to_string(),
            ));
        }
        if let Some(slot) = params.new_slot {
            validate_single_slot(&slot, session.trial)?;
        }
        if pattern_change {
            if session.enrollment_id.is_none() {
                return Err(AppError::Validation(
                    "Only recurring series can change their weekly pattern".to_string(),
                ));
            }
            validate_weekdays(&params.new_weekdays)?;
            if params.new_slots.is_empty() {
                return Err(AppError::Validation(
                    "A new weekly pattern needs at least one time slot".to_string(),
                ));
            }
            if let Some(bad) = params.new_slots.iter().find(|s| !is_base_slot(s)) {
                return Err(AppError::Validation(format!("Not a base slot: {}", bad)));
            }
        }
        Ok(())
    }

    pub async fn approve(
        &self,
        reschedule_id: &str,
        reviewer_id: &str,
    ) -> Result<RescheduleOutcome, AppError> {
        let request = self
            .reschedules
            .find_by_id(reschedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reschedule request not found".into()))?;
        if request.status != "PENDING" {
            return Err(AppError::Conflict(format!(
                "Reschedule already {}",
                request.status.to_lowercase()
            )));
        }
        let session = self
            .sessions
            .find_by_id(&request.session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".into()))?;

        let key = format!("lock:teacher:{}", session.teacher_id);
        let token = acquire_with_retry(
            self.lock.as_ref(),
            &key,
            self.lock_ttl,
            self.lock_retries,
            self.lock_interval,
        )
        .await?
        .ok_or(AppError::Busy)?;

        let result = self.approve_locked(&request, &session, reviewer_id).await;
        if let Err(e) = self.lock.release(&key, &token).await {
            warn!(%key, "lock release failed: {:?}", e);
        }
        result
    }

    async fn approve_locked(
        &self,
        request: &RescheduleRequest,
        session: &Session,
        reviewer_id: &str,
    ) -> Result<RescheduleOutcome, AppError> {
        // Transition first so a concurrent approve of the same request becomes
        // a clean conflict instead of duplicated effects.
        let flipped = self
            .reschedules
            .transition(&request.id, "PENDING", "APPROVED", Some(reviewer_id))
            .await?;
        if !flipped {
            return Err(AppError::Conflict("Reschedule already reviewed".into()));
        }

        let mut touched_dates = vec![session.date];
        let (moved, shortfall) = if request.cancel_session {
            self.sessions.set_status(&session.id, "CANCELLED").await?;
            (1, 0)
        } else if request.is_pattern_change() {
            let (moved, shortfall, mut dates) = self.replace_pattern(request, session).await?;
            touched_dates.append(&mut dates);
            (moved, shortfall)
        } else {
            let date = request
                .new_date
                .ok_or_else(|| AppError::Validation("Reschedule is missing its new date".into()))?;
            let slot = request
                .new_slot
                .ok_or_else(|| AppError::Validation("Reschedule is missing its new slot".into()))?;
            self.move_single(session, date, slot).await?;
            touched_dates.push(date);
            (1, 0)
        };

        self.renumber(&session.request_id).await?;
        self.busy_cache
            .invalidate(&session.teacher_id, &touched_dates)
            .await;
        self.events
            .publish(
                "reschedule.approved",
                json!({
                    "reschedule_id": request.id,
                    "session_id": session.id,
                    "moved": moved,
                    "shortfall": shortfall,
                }),
            )
            .await;
        info!(reschedule_id = %request.id, moved, shortfall, "reschedule approved");
        Ok(RescheduleOutcome {
            reschedule_id: request.id.clone(),
            moved,
            shortfall,
        })
    }

    async fn move_single(
        &self,
        session: &Session,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<(), AppError> {
        if session.trial {
            // Trial sub-slots bypass the base-slot generator.
            return self.move_trial(session, date, slot).await;
        }
        // One-date generation doubles as the conflict check: the moved session
        // is excluded so it does not collide with itself. No target, so the
        // window never extends past the requested day.
        let spec = GenerationSpec {
            request_id: session.request_id.clone(),
            enrollment_id: session.enrollment_id.clone(),
            teacher_id: session.teacher_id.clone(),
            student_id: session.student_id.clone(),
            course_id: session.course_id.clone(),
            start_date: date,
            end_date: date,
            weekdays: vec![chrono::Datelike::weekday(&date).number_from_monday()],
            slots: vec![slot],
            target: None,
            start_seq: session.sequence_no,
            exclude_request_id: None,
            exclude_session_ids: vec![session.id.clone()],
        };
        let (fits, _) = self.generator.generate(&spec).await?;
        if !fits.iter().any(|f| f.date == date && f.slot == slot) {
            return Err(AppError::SlotUnavailable(Vec::new()));
        }
        self.sessions.update_time(&session.id, date, slot).await?;
        Ok(())
    }

    async fn move_trial(
        &self,
        session: &Session,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<(), AppError> {
        let weekly = self.availability.list_weekly(&session.teacher_id).await?;
        let override_rule = self
            .availability
            .find_override(&session.teacher_id, date)
            .await?;
        let availability = resolve_base_slots(&weekly, override_rule.as_ref(), date);

        let teacher_busy = sessions_to_intervals(
            &self
                .sessions
                .list_active_by_teacher_date(&session.teacher_id, date)
                .await?
                .into_iter()
                .filter(|s| s.id != session.id)
                .collect::<Vec<_>>(),
        );
        let teacher_pending: Vec<BusyInterval> = self
            .requests
            .list_pending_by_teacher(&session.teacher_id)
            .await?
            .iter()
            .flat_map(|r| pending_intervals_on(r, date))
            .collect();
        let student_busy: Vec<TimeSlot> = self
            .sessions
            .list_active_by_student_date(&session.student_id, date)
            .await?
            .into_iter()
            .filter(|s| s.id != session.id)
            .map(|s| s.slot)
            .collect();

        let inputs = ConflictInputs {
            availability: &availability,
            teacher_busy: &teacher_busy,
            teacher_pending: &teacher_pending,
            student_busy: &student_busy,
        };
        let check = check_trial_sub_slot(&slot, &inputs);
        if !check.available {
            return Err(AppError::SlotUnavailable(check.reasons));
        }
        self.sessions.update_time(&session.id, date, slot).await?;
        Ok(())
    }

    /// Retires the not-yet-started remainder of the series and regenerates it
    /// under the new weekday/slot pattern, keeping the session count.
    async fn replace_pattern(
        &self,
        request: &RescheduleRequest,
        session: &Session,
    ) -> Result<(i32, i32, Vec<NaiveDate>), AppError> {
        let today = Utc::now().naive_utc().date();
        let retired: Vec<Session> = self
            .sessions
            .list_by_request(&session.request_id)
            .await?
            .into_iter()
            .filter(|s| s.is_active() && s.date >= session.date && s.date > today)
            .collect();
        if retired.is_empty() {
            return Err(AppError::Conflict(
                "No remaining sessions to re-pattern".to_string(),
            ));
        }

        let start = retired.iter().map(|s| s.date).min().unwrap_or(session.date);
        let end = retired.iter().map(|s| s.date).max().unwrap_or(session.date);
        let retired_ids: Vec<String> = retired.iter().map(|s| s.id.clone()).collect();

        let spec = GenerationSpec {
            request_id: session.request_id.clone(),
            enrollment_id: session.enrollment_id.clone(),
            teacher_id: session.teacher_id.clone(),
            student_id: session.student_id.clone(),
            course_id: session.course_id.clone(),
            start_date: start,
            end_date: end,
            weekdays: request.new_weekdays.clone(),
            slots: request.new_slots.clone(),
            target: Some(retired.len() as i32),
            start_seq: 1,
            exclude_request_id: None,
            exclude_session_ids: retired_ids.clone(),
        };
        let (replacements, shortfall) = self.generator.generate(&spec).await?;
        if replacements.is_empty() {
            return Err(AppError::SlotUnavailable(Vec::new()));
        }
        if shortfall > 0 {
            warn!(
                reschedule_id = %request.id,
                shortfall,
                "pattern replacement generated fewer sessions than retired"
            );
        }

        let mut dates: Vec<NaiveDate> = retired.iter().map(|s| s.date).collect();
        dates.extend(replacements.iter().map(|s| s.date));
        self.sessions
            .replace_series(&retired_ids, &replacements)
            .await?;
        Ok((replacements.len() as i32, shortfall, dates))
    }

    /// Re-derives sequence numbers for the request's active sessions by
    /// chronological order, 1..N with no gaps.
    async fn renumber(&self, request_id: &str) -> Result<(), AppError> {
        let mut active: Vec<Session> = self
            .sessions
            .list_by_request(request_id)
            .await?
            .into_iter()
            .filter(|s| s.is_active())
            .collect();
        active.sort_by_key(|s| (s.date, s.slot.start));
        let assignments: Vec<(String, i32)> = active
            .iter()
            .enumerate()
            .filter(|(i, s)| s.sequence_no != *i as i32 + 1)
            .map(|(i, s)| (s.id.clone(), i as i32 + 1))
            .collect();
        if !assignments.is_empty() {
            self.sessions.update_sequences(&assignments).await?;
        }
        Ok(())
    }

    pub async fn reject(&self, reschedule_id: &str, reviewer_id: &str) -> Result<(), AppError> {
        self.close(reschedule_id, "REJECTED", Some(reviewer_id)).await
    }

    pub async fn cancel(&self, reschedule_id: &str) -> Result<(), AppError> {
        self.close(reschedule_id, "CANCELLED", None).await
    }

    async fn close(
        &self,
        reschedule_id: &str,
        to: &str,
        reviewer_id: Option<&str>,
    ) -> Result<(), AppError> {
        let request = self
            .reschedules
            .find_by_id(reschedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reschedule request not found".into()))?;
        let flipped = self
            .reschedules
            .transition(reschedule_id, "PENDING", to, reviewer_id)
            .await?;
        if !flipped {
            return Err(AppError::Conflict(format!(
                "Reschedule already {}",
                request.status.to_lowercase()
            )));
        }

        // The quota unit consumed at apply time is returned.
        if let Some(session) = self.sessions.find_by_id(&request.session_id).await? {
            if let Some(enrollment) = self.enrollment_of(&session).await? {
                self.quota
                    .rollback(
                        "STUDENT",
                        &request.applicant_id,
                        &enrollment,
                        request.created_at.naive_utc().date(),
                    )
                    .await;
            }
        }
        self.events
            .publish(
                "reschedule.closed",
                json!({ "reschedule_id": reschedule_id, "status": to }),
            )
            .await;
        Ok(())
    }

    async fn enrollment_of(&self, session: &Session) -> Result<Option<Enrollment>, AppError> {
        match &session.enrollment_id {
            Some(id) => self.enrollments.find_by_id(id).await,
            None => Ok(None),
        }
    }
}
