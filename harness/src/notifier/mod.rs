//! Notifier registry.
//!
//! Replaces the source system's per-channel duck typing (any object with an
//! async `send`) with an explicit `Vec<Arc<dyn Notifier>>`, built once at
//! startup from `MonitorConfig` and walked sequentially on every incident
//! transition. A failing adapter is logged and skipped; it must never abort
//! the registry or propagate into the transaction that produced the event.

pub mod log;
pub mod telegram;

use std::sync::Arc;

use uptime_core::{AlertEvent, Notifier};

use crate::config::MonitorConfig;

pub fn build(config: &MonitorConfig) -> Vec<Arc<dyn Notifier>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(log::LogNotifier)];

    if let (Some(token), Some(chat_id)) = (&config.telegram_bot_token, &config.telegram_chat_id) {
        notifiers.push(Arc::new(telegram::TelegramNotifier::new(
            token.clone(),
            chat_id.clone(),
            config.telegram_parse_mode.clone(),
        )));
    }

    notifiers
}

pub async fn dispatch(notifiers: &[Arc<dyn Notifier>], event: &AlertEvent) {
    for notifier in notifiers {
        if let Err(err) = notifier.send(event).await {
            tracing::warn!(
                event = "notifier_failed",
                notifier = notifier.name(),
                target_id = %event.target_id,
                error = %err,
                "notifier delivery failed"
            );
        }
    }
}
