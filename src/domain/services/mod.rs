pub mod approval;
pub mod availability;
pub mod busy_cache;
pub mod calendar;
pub mod conflict;
pub mod quota;
pub mod recurring;
pub mod reschedule;
pub mod suspension;
