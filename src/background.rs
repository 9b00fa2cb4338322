use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};

use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic sweep marking scheduled sessions whose end time has passed as
/// completed.
pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting background session sweep...");

    loop {
        let span = info_span!("session_sweep");
        async {
            let now = Utc::now().naive_utc();
            match state.session_repo.complete_past(now).await {
                Ok(0) => {}
                Ok(count) => info!(count, "marked past sessions completed"),
                Err(e) => error!("session sweep failed: {:?}", e),
            }
        }
        .instrument(span)
        .await;

        sleep(SWEEP_INTERVAL).await;
    }
}
