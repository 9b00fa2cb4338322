pub mod availability;
pub mod booking_request;
pub mod enrollment;
pub mod quota;
pub mod reschedule;
pub mod session;
pub mod suspension;
pub mod timeslot;
