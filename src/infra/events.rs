use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::domain::ports::ChangeEventSink;

/// Logs change events instead of forwarding to a broker. The sink contract
/// is fire-and-forget either way, so callers never see a failure.
pub struct LoggingEventSink;

#[async_trait]
impl ChangeEventSink for LoggingEventSink {
    async fn publish(&self, kind: &str, payload: Value) {
        info!(kind, payload = %payload, "change event");
    }
}
