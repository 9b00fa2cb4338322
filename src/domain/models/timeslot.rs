use chrono::NaiveTime;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Half-open time interval within a single day, serialized as "HH:MM-HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

pub const TRIAL_DURATION_MIN: i64 = 30;

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AppError> {
        if start >= end {
            return Err(AppError::Validation(format!(
                "Time slot range is inverted or empty: {}-{}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    /// Half-open overlap: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, child: &TimeSlot) -> bool {
        child.start >= self.start && child.end <= self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn is_trial_length(&self) -> bool {
        self.duration_minutes() == TRIAL_DURATION_MIN
    }
}

impl FromStr for TimeSlot {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start_str, end_str) = s
            .split_once('-')
            .ok_or_else(|| AppError::Validation(format!("Invalid time slot format: {}", s)))?;
        let start = NaiveTime::parse_from_str(start_str, "%H:%M")
            .map_err(|_| AppError::Validation(format!("Invalid start time: {}", start_str)))?;
        let end = NaiveTime::parse_from_str(end_str, "%H:%M")
            .map_err(|_| AppError::Validation(format!("Invalid end time: {}", end_str)))?;
        Self::new(start, end)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e: AppError| de::Error::custom(e.to_string()))
    }
}

fn hour_slot(start_hour: u32, end_hour: u32) -> TimeSlot {
    TimeSlot {
        start: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap(),
    }
}

/// The six fixed 2-hour base slots used for formal scheduling.
pub fn base_slots() -> Vec<TimeSlot> {
    vec![
        hour_slot(8, 10),
        hour_slot(10, 12),
        hour_slot(13, 15),
        hour_slot(15, 17),
        hour_slot(17, 19),
        hour_slot(19, 21),
    ]
}

pub fn is_base_slot(slot: &TimeSlot) -> bool {
    base_slots().contains(slot)
}

/// The base slot an interval nests inside, if any.
pub fn base_slot_for(interval: &TimeSlot) -> Option<TimeSlot> {
    base_slots().into_iter().find(|b| b.contains(interval))
}

/// The 30-minute sub-slots of a base slot, used for trial sessions.
pub fn trial_sub_slots(base: &TimeSlot) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    let mut cursor = base.start;
    loop {
        let end = cursor + chrono::Duration::minutes(TRIAL_DURATION_MIN);
        if end > base.end {
            break;
        }
        slots.push(TimeSlot { start: cursor, end });
        if end == base.end {
            break;
        }
        cursor = end;
    }
    slots
}

pub fn parse_slot_list(json: &str) -> Result<Vec<TimeSlot>, AppError> {
    serde_json::from_str(json)
        .map_err(|e| AppError::Validation(format!("Invalid slot list: {}", e)))
}

pub fn slot_list_json(slots: &[TimeSlot]) -> String {
    serde_json::to_string(slots).unwrap_or_else(|_| "[]".to_string())
}
