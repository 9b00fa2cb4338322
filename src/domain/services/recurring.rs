use chrono::{Datelike, Months, NaiveDate};
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::session::{NewSessionParams, Session};
use crate::domain::models::timeslot::{is_base_slot, TimeSlot};
use crate::domain::ports::{AvailabilityRepository, BookingRequestRepository, SessionRepository};
use crate::domain::services::availability::resolve_base_slots;
use crate::domain::services::conflict::{
    check_base_slot, pending_intervals_on, sessions_to_intervals, BusyInterval, ConflictInputs,
};
use crate::error::AppError;

/// Window extensions are capped so an unsatisfiable target cannot loop forever.
pub const MAX_EXTENSION_CYCLES: u32 = 10;

/// Calendar days in [start, end] whose weekday (1 = Monday .. 7 = Sunday)
/// is in the requested set, in ascending order.
pub fn matching_dates(start: NaiveDate, end: NaiveDate, weekdays: &[u32]) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut day = start;
    while day <= end {
        if weekdays.contains(&day.weekday().number_from_monday()) {
            dates.push(day);
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    dates
}

/// Extends the generation window by one calendar month.
pub fn extend_window(end: NaiveDate) -> Result<NaiveDate, AppError> {
    end.checked_add_months(Months::new(1))
        .ok_or_else(|| AppError::Validation("Date range extension overflowed".to_string()))
}

pub fn validate_weekdays(weekdays: &[u32]) -> Result<(), AppError> {
    if weekdays.is_empty() {
        return Err(AppError::Validation(
            "At least one weekday is required".to_string(),
        ));
    }
    if let Some(bad) = weekdays.iter().find(|w| !(1..=7).contains(*w)) {
        return Err(AppError::Validation(format!(
            "Weekday out of range 1-7: {}",
            bad
        )));
    }
    Ok(())
}

/// What to expand: the pattern plus identities for the produced sessions.
pub struct GenerationSpec {
    pub request_id: String,
    pub enrollment_id: Option<String>,
    pub teacher_id: String,
    pub student_id: String,
    pub course_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weekdays: Vec<u32>,
    pub slots: Vec<TimeSlot>,
    pub target: Option<i32>,
    pub start_seq: i32,
    /// The request being approved is not "pending" against itself.
    pub exclude_request_id: Option<String>,
    /// Sessions being replaced do not block their own replacements.
    pub exclude_session_ids: Vec<String>,
}

/// Expands a weekly pattern into concrete sessions, skipping slots that fail
/// conflict checks on either the teacher or the student side. When a target
/// count is unmet at the window end, the window grows one month at a time up
/// to [`MAX_EXTENSION_CYCLES`]; a remaining shortfall is reported, not
/// silently dropped.
pub struct RecurringGenerator {
    availability: Arc<dyn AvailabilityRepository>,
    sessions: Arc<dyn SessionRepository>,
    requests: Arc<dyn BookingRequestRepository>,
}

impl RecurringGenerator {
    pub fn new(
        availability: Arc<dyn AvailabilityRepository>,
        sessions: Arc<dyn SessionRepository>,
        requests: Arc<dyn BookingRequestRepository>,
    ) -> Self {
        Self {
            availability,
            sessions,
            requests,
        }
    }

    pub async fn generate(
        &self,
        spec: &GenerationSpec,
    ) -> Result<(Vec<Session>, i32), AppError> {
        validate_weekdays(&spec.weekdays)?;
        if spec.slots.is_empty() {
            return Err(AppError::Validation(
                "At least one time slot is required".to_string(),
            ));
        }
        if let Some(bad) = spec.slots.iter().find(|s| !is_base_slot(s)) {
            return Err(AppError::Validation(format!(
                "Not a base slot: {}",
                bad
            )));
        }
        if spec.start_date > spec.end_date {
            return Err(AppError::Validation("Date range is inverted".to_string()));
        }

        let weekly = self.availability.list_weekly(&spec.teacher_id).await?;
        let pending: Vec<_> = self
            .requests
            .list_pending_by_teacher(&spec.teacher_id)
            .await?
            .into_iter()
            .filter(|r| Some(&r.id) != spec.exclude_request_id.as_ref())
            .collect();

        let mut slots = spec.slots.clone();
        slots.sort();
        slots.dedup();

        let mut created: Vec<Session> = Vec::new();
        let mut window_start = spec.start_date;
        let mut window_end = spec.end_date;

        'expansion: for cycle in 0..=MAX_EXTENSION_CYCLES {
            for date in matching_dates(window_start, window_end, &spec.weekdays) {
                if self.target_met(spec, created.len()) {
                    break 'expansion;
                }

                let override_rule = self
                    .availability
                    .find_override(&spec.teacher_id, date)
                    .await?;
                let resolved = resolve_base_slots(&weekly, override_rule.as_ref(), date);

                let mut teacher_busy: Vec<BusyInterval> = sessions_to_intervals(
                    &self
                        .sessions
                        .list_active_by_teacher_date(&spec.teacher_id, date)
                        .await?
                        .into_iter()
                        .filter(|s| !spec.exclude_session_ids.contains(&s.id))
                        .collect::<Vec<_>>(),
                );
                let mut student_busy: Vec<TimeSlot> = self
                    .sessions
                    .list_active_by_student_date(&spec.student_id, date)
                    .await?
                    .into_iter()
                    .filter(|s| !spec.exclude_session_ids.contains(&s.id))
                    .map(|s| s.slot)
                    .collect();
                let teacher_pending: Vec<BusyInterval> = pending
                    .iter()
                    .flat_map(|r| pending_intervals_on(r, date))
                    .collect();

                // Sessions materialized earlier in this run occupy their
                // slots too.
                for prior in created.iter().filter(|s| s.date == date) {
                    teacher_busy.push(BusyInterval {
                        slot: prior.slot,
                        trial: false,
                    });
                    student_busy.push(prior.slot);
                }

                for slot in &slots {
                    if self.target_met(spec, created.len()) {
                        break 'expansion;
                    }
                    let inputs = ConflictInputs {
                        availability: &resolved,
                        teacher_busy: &teacher_busy,
                        teacher_pending: &teacher_pending,
                        student_busy: &student_busy,
                    };
                    let check = check_base_slot(slot, &inputs);
                    if !check.available {
                        debug!(
                            teacher_id = %spec.teacher_id,
                            %date,
                            %slot,
                            reasons = ?check.reasons,
                            "skipping conflicted slot"
                        );
                        continue;
                    }
                    teacher_busy.push(BusyInterval {
                        slot: *slot,
                        trial: false,
                    });
                    student_busy.push(*slot);
                    created.push(Session::new(NewSessionParams {
                        request_id: spec.request_id.clone(),
                        enrollment_id: spec.enrollment_id.clone(),
                        teacher_id: spec.teacher_id.clone(),
                        student_id: spec.student_id.clone(),
                        course_id: spec.course_id.clone(),
                        date,
                        slot: *slot,
                        trial: false,
                        sequence_no: spec.start_seq + created.len() as i32,
                    }));
                }
            }

            match spec.target {
                Some(target) if (created.len() as i32) < target && cycle < MAX_EXTENSION_CYCLES => {
                    window_start = window_end.succ_opt().ok_or_else(|| {
                        AppError::Validation("Date range extension overflowed".to_string())
                    })?;
                    window_end = extend_window(window_end)?;
                }
                _ => break,
            }
        }

        let shortfall = spec
            .target
            .map(|t| (t - created.len() as i32).max(0))
            .unwrap_or(0);
        Ok((created, shortfall))
    }

    fn target_met(&self, spec: &GenerationSpec, created: usize) -> bool {
        spec.target.is_some_and(|t| created as i32 >= t)
    }
}
