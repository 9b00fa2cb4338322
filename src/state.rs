use std::sync::Arc;

use crate::config::Config;
use crate::domain::ports::{
    AvailabilityRepository, BalanceService, BookingRequestRepository, ChangeEventSink,
    EnrollmentRepository, KeyValueCache, LockService, QuotaRepository, RescheduleRepository,
    SessionRepository, SuspensionRepository,
};
use crate::domain::services::approval::ApprovalService;
use crate::domain::services::busy_cache::BusyCache;
use crate::domain::services::quota::QuotaService;
use crate::domain::services::recurring::RecurringGenerator;
use crate::domain::services::reschedule::RescheduleService;
use crate::domain::services::suspension::SuspensionService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub availability_repo: Arc<dyn AvailabilityRepository>,
    pub request_repo: Arc<dyn BookingRequestRepository>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub enrollment_repo: Arc<dyn EnrollmentRepository>,
    pub reschedule_repo: Arc<dyn RescheduleRepository>,
    pub suspension_repo: Arc<dyn SuspensionRepository>,
    pub quota_repo: Arc<dyn QuotaRepository>,
    pub cache: Arc<dyn KeyValueCache>,
    pub lock_service: Arc<dyn LockService>,
    pub balance_service: Arc<dyn BalanceService>,
    pub event_sink: Arc<dyn ChangeEventSink>,
    pub busy_cache: Arc<BusyCache>,
    pub generator: Arc<RecurringGenerator>,
    pub quota_service: Arc<QuotaService>,
    pub approval_service: Arc<ApprovalService>,
    pub reschedule_service: Arc<RescheduleService>,
    pub suspension_service: Arc<SuspensionService>,
}
