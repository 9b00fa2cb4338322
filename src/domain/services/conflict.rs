use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::models::booking_request::BookingRequest;
use crate::domain::models::session::Session;
use crate::domain::models::timeslot::{base_slot_for, TimeSlot};

/// Why a slot is not bookable. A check accumulates every applicable reason;
/// any single one makes the slot unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictReason {
    TeacherUnavailable,
    ScheduledTrial,
    PendingTrial,
    PendingFormal,
    Busy,
}

/// One occupied interval of a teacher-day, committed or pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub slot: TimeSlot,
    pub trial: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheck {
    pub available: bool,
    pub reasons: Vec<ConflictReason>,
}

impl ConflictCheck {
    fn open() -> Self {
        Self {
            available: true,
            reasons: Vec::new(),
        }
    }

    fn flag(&mut self, reason: ConflictReason) {
        self.available = false;
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

pub struct ConflictInputs<'a> {
    /// Resolved base-slot availability for the date.
    pub availability: &'a [TimeSlot],
    /// Committed non-cancelled occupancy of the teacher.
    pub teacher_busy: &'a [BusyInterval],
    /// Intervals claimed by other pending requests of the teacher.
    pub teacher_pending: &'a [BusyInterval],
    /// Committed non-cancelled occupancy of the student.
    pub student_busy: &'a [TimeSlot],
}

/// Formal (base-slot) availability check.
pub fn check_base_slot(slot: &TimeSlot, inputs: &ConflictInputs) -> ConflictCheck {
    let mut check = ConflictCheck::open();

    if !inputs.availability.iter().any(|b| b.contains(slot)) {
        check.flag(ConflictReason::TeacherUnavailable);
    }

    for busy in inputs.teacher_busy {
        if busy.trial {
            // A trial consumes its whole base slot for formal purposes.
            if let Some(base) = base_slot_for(&busy.slot) {
                if base.overlaps(slot) {
                    check.flag(ConflictReason::ScheduledTrial);
                }
            }
        } else if busy.slot.overlaps(slot) {
            check.flag(ConflictReason::Busy);
        }
    }

    for pending in inputs.teacher_pending {
        if pending.trial {
            if let Some(base) = base_slot_for(&pending.slot) {
                if base.overlaps(slot) {
                    check.flag(ConflictReason::PendingTrial);
                }
            }
        } else if pending.slot.overlaps(slot) {
            check.flag(ConflictReason::PendingFormal);
        }
    }

    for busy in inputs.student_busy {
        if busy.overlaps(slot) {
            check.flag(ConflictReason::Busy);
        }
    }

    check
}

/// 30-minute trial sub-slot check. Unlike the formal check, a sibling trial
/// in the same base slot only blocks the sub-slots it actually overlaps.
pub fn check_trial_sub_slot(sub: &TimeSlot, inputs: &ConflictInputs) -> ConflictCheck {
    let mut check = ConflictCheck::open();

    let inside_availability = base_slot_for(sub)
        .map(|base| inputs.availability.contains(&base))
        .unwrap_or(false);
    if !inside_availability {
        check.flag(ConflictReason::TeacherUnavailable);
    }

    for busy in inputs.teacher_busy {
        if busy.slot.overlaps(sub) {
            check.flag(if busy.trial {
                ConflictReason::ScheduledTrial
            } else {
                ConflictReason::Busy
            });
        }
    }

    for pending in inputs.teacher_pending {
        if pending.slot.overlaps(sub) {
            check.flag(if pending.trial {
                ConflictReason::PendingTrial
            } else {
                ConflictReason::PendingFormal
            });
        }
    }

    for busy in inputs.student_busy {
        if busy.overlaps(sub) {
            check.flag(ConflictReason::Busy);
        }
    }

    check
}

pub fn check_slot(slot: &TimeSlot, trial: bool, inputs: &ConflictInputs) -> ConflictCheck {
    if trial {
        check_trial_sub_slot(slot, inputs)
    } else {
        check_base_slot(slot, inputs)
    }
}

/// Committed occupancy of a list of sessions, active ones only.
pub fn sessions_to_intervals(sessions: &[Session]) -> Vec<BusyInterval> {
    sessions
        .iter()
        .filter(|s| s.is_active())
        .map(|s| BusyInterval {
            slot: s.slot,
            trial: s.trial,
        })
        .collect()
}

/// The intervals a pending request would occupy on a given date.
/// Recurring requests are expanded from their weekday and slot sets.
pub fn pending_intervals_on(req: &BookingRequest, date: NaiveDate) -> Vec<BusyInterval> {
    if req.status != "PENDING" {
        return Vec::new();
    }
    if req.is_recurring() {
        let in_range = match (req.start_date, req.end_date) {
            (Some(start), Some(end)) => date >= start && date <= end,
            _ => false,
        };
        if !in_range || !req.weekdays.contains(&date.weekday().number_from_monday()) {
            return Vec::new();
        }
        req.slots
            .iter()
            .map(|slot| BusyInterval {
                slot: *slot,
                trial: false,
            })
            .collect()
    } else {
        match (req.date, req.slot) {
            (Some(d), Some(slot)) if d == date => vec![BusyInterval {
                slot,
                trial: req.trial,
            }],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::booking_request::{BookingRequest, NewRecurringRequest};
    use crate::domain::models::timeslot::base_slots;

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    fn open_inputs<'a>(availability: &'a [TimeSlot]) -> ConflictInputs<'a> {
        ConflictInputs {
            availability,
            teacher_busy: &[],
            teacher_pending: &[],
            student_busy: &[],
        }
    }

    #[test]
    fn outside_availability_is_teacher_unavailable() {
        let avail = vec![slot("10:00-12:00")];
        let check = check_base_slot(&slot("08:00-10:00"), &open_inputs(&avail));
        assert!(!check.available);
        assert_eq!(check.reasons, vec![ConflictReason::TeacherUnavailable]);
    }

    #[test]
    fn committed_formal_session_is_busy() {
        let avail = base_slots();
        let busy = vec![BusyInterval {
            slot: slot("08:00-10:00"),
            trial: false,
        }];
        let inputs = ConflictInputs {
            availability: &avail,
            teacher_busy: &busy,
            teacher_pending: &[],
            student_busy: &[],
        };
        let check = check_base_slot(&slot("08:00-10:00"), &inputs);
        assert_eq!(check.reasons, vec![ConflictReason::Busy]);
        // Adjacent slot untouched.
        assert!(check_base_slot(&slot("10:00-12:00"), &inputs).available);
    }

    #[test]
    fn leading_trial_blocks_base_but_not_sibling_sub_slots() {
        let avail = base_slots();
        let busy = vec![BusyInterval {
            slot: slot("08:00-08:30"),
            trial: true,
        }];
        let inputs = ConflictInputs {
            availability: &avail,
            teacher_busy: &busy,
            teacher_pending: &[],
            student_busy: &[],
        };

        let formal = check_base_slot(&slot("08:00-10:00"), &inputs);
        assert_eq!(formal.reasons, vec![ConflictReason::ScheduledTrial]);

        let duplicate = check_trial_sub_slot(&slot("08:00-08:30"), &inputs);
        assert_eq!(duplicate.reasons, vec![ConflictReason::ScheduledTrial]);

        let sibling = check_trial_sub_slot(&slot("08:30-09:00"), &inputs);
        assert!(sibling.available);
    }

    #[test]
    fn pending_requests_surface_distinct_tags() {
        let avail = base_slots();
        let pending = vec![
            BusyInterval {
                slot: slot("08:00-08:30"),
                trial: true,
            },
            BusyInterval {
                slot: slot("08:00-10:00"),
                trial: false,
            },
        ];
        let inputs = ConflictInputs {
            availability: &avail,
            teacher_busy: &[],
            teacher_pending: &pending,
            student_busy: &[],
        };
        let check = check_base_slot(&slot("08:00-10:00"), &inputs);
        assert!(!check.available);
        assert!(check.reasons.contains(&ConflictReason::PendingTrial));
        assert!(check.reasons.contains(&ConflictReason::PendingFormal));
    }

    #[test]
    fn student_overlap_is_busy() {
        let avail = base_slots();
        let student = vec![slot("08:00-10:00")];
        let inputs = ConflictInputs {
            availability: &avail,
            teacher_busy: &[],
            teacher_pending: &[],
            student_busy: &student,
        };
        let check = check_base_slot(&slot("08:00-10:00"), &inputs);
        assert_eq!(check.reasons, vec![ConflictReason::Busy]);
    }

    #[test]
    fn recurring_pending_expands_to_matching_weekdays_only() {
        let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        let req = BookingRequest::new_recurring(NewRecurringRequest {
            student_id: "s1".into(),
            teacher_id: "t1".into(),
            course_id: None,
            start_date: monday,
            end_date: monday + chrono::Duration::days(30),
            weekdays: vec![1, 3],
            slots: vec![slot("17:00-19:00")],
            total_count: Some(8),
            hourly_rate_cents: 5000,
        });

        assert_eq!(
            pending_intervals_on(&req, monday),
            vec![BusyInterval {
                slot: slot("17:00-19:00"),
                trial: false
            }]
        );
        // Tuesday not in the weekday set.
        assert!(pending_intervals_on(&req, monday + chrono::Duration::days(1)).is_empty());
        // Outside the range.
        assert!(pending_intervals_on(&req, monday + chrono::Duration::days(35)).is_empty());
    }
}
