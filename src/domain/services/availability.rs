use chrono::{Datelike, NaiveDate};

use crate::domain::models::availability::{DailyOverride, WeeklyAvailability};
use crate::domain::models::timeslot::{base_slots, TimeSlot};

/// Resolves the bookable base slots for one teacher-day.
///
/// A daily override is authoritative for its date (an empty slot set closes
/// the day). Otherwise the weekly template decides by weekday; a teacher with
/// no weekly rows at all is treated as fully open.
pub fn resolve_base_slots(
    weekly: &[WeeklyAvailability],
    override_rule: Option<&DailyOverride>,
    date: NaiveDate,
) -> Vec<TimeSlot> {
    let declared: Vec<TimeSlot> = if let Some(rule) = override_rule {
        rule.slots.clone()
    } else if weekly.is_empty() {
        return base_slots();
    } else {
        let weekday = date.weekday().number_from_monday();
        weekly
            .iter()
            .find(|w| w.weekday == weekday)
            .map(|w| w.slots.clone())
            .unwrap_or_default()
    };

    // Output is always expressed in the fixed base slots, in day order.
    let mut resolved: Vec<TimeSlot> = base_slots()
        .into_iter()
        .filter(|b| declared.contains(b))
        .collect();
    resolved.sort();
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    fn monday() -> NaiveDate {
        // 2026-08-24 is a Monday.
        NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
    }

    #[test]
    fn no_weekly_rows_means_fully_open() {
        let resolved = resolve_base_slots(&[], None, monday());
        assert_eq!(resolved, base_slots());
    }

    #[test]
    fn weekly_template_restricts_by_weekday() {
        let weekly = vec![
            WeeklyAvailability::new("t1".into(), 1, vec![slot("08:00-10:00"), slot("17:00-19:00")]),
            WeeklyAvailability::new("t1".into(), 3, vec![slot("10:00-12:00")]),
        ];
        let resolved = resolve_base_slots(&weekly, None, monday());
        assert_eq!(resolved, vec![slot("08:00-10:00"), slot("17:00-19:00")]);

        // Tuesday has no row: closed, not fully open.
        let tuesday = monday().succ_opt().unwrap();
        assert!(resolve_base_slots(&weekly, None, tuesday).is_empty());
    }

    #[test]
    fn override_is_authoritative_over_weekly() {
        let weekly = vec![WeeklyAvailability::new(
            "t1".into(),
            1,
            vec![slot("08:00-10:00")],
        )];
        let rule = DailyOverride::new("t1".into(), monday(), vec![slot("19:00-21:00")]);
        let resolved = resolve_base_slots(&weekly, Some(&rule), monday());
        assert_eq!(resolved, vec![slot("19:00-21:00")]);
    }

    #[test]
    fn empty_override_closes_the_day() {
        let rule = DailyOverride::new("t1".into(), monday(), vec![]);
        assert!(resolve_base_slots(&[], Some(&rule), monday()).is_empty());
    }

    #[test]
    fn non_base_declarations_are_dropped() {
        let rule = DailyOverride::new(
            "t1".into(),
            monday(),
            vec![slot("08:00-10:00"), slot("11:00-13:00")],
        );
        let resolved = resolve_base_slots(&[], Some(&rule), monday());
        assert_eq!(resolved, vec![slot("08:00-10:00")]);
    }
}
