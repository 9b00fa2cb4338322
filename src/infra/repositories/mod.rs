pub mod sqlite_availability_repo;
pub mod sqlite_balance_service;
pub mod sqlite_booking_request_repo;
pub mod sqlite_enrollment_repo;
pub mod sqlite_quota_repo;
pub mod sqlite_reschedule_repo;
pub mod sqlite_session_repo;
pub mod sqlite_suspension_repo;
