pub mod availability;
pub mod booking;
pub mod calendar;
pub mod conflict;
pub mod health;
pub mod reschedule;
pub mod suspension;
