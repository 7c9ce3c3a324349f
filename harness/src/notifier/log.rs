use async_trait::async_trait;
use uptime_core::{AlertEvent, Notifier, Result};

/// Always-registered notifier that just logs the event. Grounded on the
/// teacher's own `tracing::warn!`-on-failure convention — this is the
/// adapter that can never be the one that fails.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, event: &AlertEvent) -> Result<()> {
        tracing::info!(
            event = "alert",
            target_id = %event.target_id,
            target_name = %event.target_name,
            status = %event.status,
            incident_id = ?event.incident_id,
            "target {} is now {}",
            event.target_name,
            event.status
        );
        Ok(())
    }
}
