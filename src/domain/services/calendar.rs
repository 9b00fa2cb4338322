use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::models::availability::DailyOverride;
use crate::domain::models::booking_request::BookingRequest;
use crate::domain::models::timeslot::{base_slots, TimeSlot};
use crate::domain::services::conflict::{pending_intervals_on, BusyInterval};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Unavailable,
    BusyFormal,
}

#[derive(Debug, Serialize)]
pub struct SlotEntry {
    pub slot: TimeSlot,
    pub status: SlotStatus,
}

#[derive(Debug, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub slots: Vec<SlotEntry>,
}

pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Validation(format!("Invalid month: {}-{}", year, month)))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::Validation(format!("Invalid month: {}-{}", year, month)))?;
    Ok((first, next_first.pred_opt().unwrap_or(first)))
}

/// Month-long slot-status grid for one teacher. Precedence per slot:
/// committed session > pending request > explicit daily override > closed.
///
/// Read-only projection; write-path conflict checks never consult it.
pub fn month_grid(
    year: i32,
    month: u32,
    overrides: &[DailyOverride],
    committed: &HashMap<NaiveDate, Vec<BusyInterval>>,
    pending: &[BookingRequest],
) -> Result<Vec<CalendarDay>, AppError> {
    let (first, last) = month_bounds(year, month)?;
    let override_by_date: HashMap<NaiveDate, &DailyOverride> =
        overrides.iter().map(|o| (o.date, o)).collect();

    let mut days = Vec::new();
    let mut date = first;
    while date <= last {
        let busy = committed.get(&date).map(Vec::as_slice).unwrap_or(&[]);
        let pending_today: Vec<BusyInterval> = pending
            .iter()
            .flat_map(|req| pending_intervals_on(req, date))
            .collect();
        let open_slots = override_by_date.get(&date).map(|o| o.slots.as_slice());

        let slots = base_slots()
            .into_iter()
            .map(|slot| {
                let status = if busy.iter().any(|b| b.slot.overlaps(&slot)) {
                    SlotStatus::BusyFormal
                } else if pending_today.iter().any(|p| p.slot.overlaps(&slot)) {
                    SlotStatus::Unavailable
                } else if open_slots.is_some_and(|open| open.contains(&slot)) {
                    SlotStatus::Available
                } else {
                    SlotStatus::Unavailable
                };
                SlotEntry { slot, status }
            })
            .collect();

        days.push(CalendarDay { date, slots });
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::booking_request::{BookingRequest, NewSingleRequest};

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    #[test]
    fn month_bounds_cover_full_month() {
        let (first, last) = month_bounds(2026, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        let (_, dec_last) = month_bounds(2026, 12).unwrap();
        assert_eq!(dec_last, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        assert!(month_bounds(2026, 13).is_err());
    }

    #[test]
    fn precedence_session_over_pending_over_override() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        let overrides = vec![DailyOverride::new(
            "t1".into(),
            date,
            vec![slot("08:00-10:00"), slot("10:00-12:00"), slot("13:00-15:00")],
        )];

        let mut committed = HashMap::new();
        committed.insert(
            date,
            vec![BusyInterval {
                slot: slot("08:00-08:30"),
                trial: true,
            }],
        );

        let pending = vec![BookingRequest::new_single(NewSingleRequest {
            student_id: "s1".into(),
            teacher_id: "t1".into(),
            course_id: None,
            trial: false,
            date,
            slot: slot("10:00-12:00"),
            hourly_rate_cents: 0,
        })];

        let grid = month_grid(2026, 8, &overrides, &committed, &pending).unwrap();
        let day = grid.iter().find(|d| d.date == date).unwrap();

        // A committed trial makes its base slot busy regardless of availability.
        assert_eq!(day.slots[0].status, SlotStatus::BusyFormal);
        assert_eq!(day.slots[1].status, SlotStatus::Unavailable);
        assert_eq!(day.slots[2].status, SlotStatus::Available);
        // Slot not in the override.
        assert_eq!(day.slots[3].status, SlotStatus::Unavailable);

        // A day without an override is closed in the projection.
        let other = grid.iter().find(|d| d.date != date).unwrap();
        assert!(other
            .slots
            .iter()
            .all(|s| s.status == SlotStatus::Unavailable));
    }
}
