use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::services::approval::ApprovalService;
use crate::domain::services::busy_cache::BusyCache;
use crate::domain::services::quota::QuotaService;
use crate::domain::services::recurring::RecurringGenerator;
use crate::domain::services::reschedule::RescheduleService;
use crate::domain::services::suspension::SuspensionService;
use crate::infra::cache::memory::MemoryCache;
use crate::infra::events::LoggingEventSink;
use crate::infra::lock::CacheLockService;
use crate::infra::repositories::{
    sqlite_availability_repo::SqliteAvailabilityRepo,
    sqlite_balance_service::SqliteBalanceService,
    sqlite_booking_request_repo::SqliteBookingRequestRepo,
    sqlite_enrollment_repo::SqliteEnrollmentRepo, sqlite_quota_repo::SqliteQuotaRepo,
    sqlite_reschedule_repo::SqliteRescheduleRepo, sqlite_session_repo::SqliteSessionRepo,
    sqlite_suspension_repo::SqliteSuspensionRepo,
};
use crate::state::AppState;

pub async fn bootstrap_state(config: &Config) -> AppState {
    info!("Initializing SQLite connection with WAL mode...");

    let opts = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Invalid SQLite connection string")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .expect("Failed to connect to SQLite");

    run_migrations(&pool).await;

    build_state(config, pool)
}

pub fn build_state(config: &Config, pool: SqlitePool) -> AppState {
    let availability_repo = Arc::new(SqliteAvailabilityRepo::new(pool.clone()));
    let request_repo = Arc::new(SqliteBookingRequestRepo::new(pool.clone()));
    let session_repo = Arc::new(SqliteSessionRepo::new(pool.clone()));
    let enrollment_repo = Arc::new(SqliteEnrollmentRepo::new(pool.clone()));
    let reschedule_repo = Arc::new(SqliteRescheduleRepo::new(pool.clone()));
    let suspension_repo = Arc::new(SqliteSuspensionRepo::new(pool.clone()));
    let quota_repo = Arc::new(SqliteQuotaRepo::new(pool.clone()));
    let balance_service: Arc<SqliteBalanceService> = Arc::new(SqliteBalanceService::new(pool));

    let cache = Arc::new(MemoryCache::new());
    let lock_service = Arc::new(CacheLockService::new(cache.clone()));
    let event_sink = Arc::new(LoggingEventSink);

    let busy_cache = Arc::new(BusyCache::new(
        cache.clone(),
        session_repo.clone(),
        Duration::from_secs(config.busy_cache_ttl_secs),
        Duration::from_secs(config.busy_cache_negative_ttl_secs),
    ));
    let generator = Arc::new(RecurringGenerator::new(
        availability_repo.clone(),
        session_repo.clone(),
        request_repo.clone(),
    ));
    let quota_service = Arc::new(QuotaService::new(quota_repo.clone()));
    let approval_service = Arc::new(ApprovalService::new(
        request_repo.clone(),
        session_repo.clone(),
        availability_repo.clone(),
        generator.clone(),
        lock_service.clone(),
        busy_cache.clone(),
        event_sink.clone(),
        config,
    ));
    let reschedule_service = Arc::new(RescheduleService::new(
        reschedule_repo.clone(),
        session_repo.clone(),
        enrollment_repo.clone(),
        availability_repo.clone(),
        request_repo.clone(),
        generator.clone(),
        quota_service.clone(),
        lock_service.clone(),
        busy_cache.clone(),
        event_sink.clone(),
        config,
    ));
    let suspension_service = Arc::new(SuspensionService::new(
        suspension_repo.clone(),
        session_repo.clone(),
        enrollment_repo.clone(),
        quota_service.clone(),
        balance_service.clone(),
        lock_service.clone(),
        busy_cache.clone(),
        event_sink.clone(),
        config,
    ));

    AppState {
        config: config.clone(),
        availability_repo,
        request_repo,
        session_repo,
        enrollment_repo,
        reschedule_repo,
        suspension_repo,
        quota_repo,
        cache,
        lock_service,
        balance_service,
        event_sink,
        busy_cache,
        generator,
        quota_service,
        approval_service,
        reschedule_service,
        suspension_service,
    }
}

pub async fn run_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
