use async_trait::async_trait;
use reqwest::Client;
use uptime_core::{AlertEvent, Notifier, Result};

use crate::constants::TELEGRAM_API_BASE;

/// Grounded on `original_source/app/alerts/telegram.py::TelegramNotifier`.
/// The source system also supports fanning out to every active
/// `notification_channels` row of type "telegram" when no single chat id
/// is configured; that path is out of scope here (§ Non-goals: no
/// multi-channel admin UI), so this adapter only implements the
/// single-chat configuration.
pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: String,
    parse_mode: String,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String, parse_mode: String) -> Self {
        Self {
            client: Client::new(),
            token,
            chat_id,
            parse_mode,
        }
    }

    fn format_message(&self, event: &AlertEvent) -> String {
        let mut text = format!(
            "Site: {}\nURL: {}\nStatus: {}",
            event.target_name, event.url, event.status
        );
        if let Some(prev) = event.previous_status {
            text.push_str(&format!(" (previous: {prev})"));
        }
        if let Some(incident_id) = event.incident_id {
            text.push_str(&format!("\nIncident: {incident_id}"));
        }
        if event.started_at.is_some() || event.ended_at.is_some() {
            let start = event
                .started_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "?".to_string());
            let end = event
                .ended_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "?".to_string());
            text.push_str(&format!("\nWindow: {start} -> {end}"));
        }
        if let Some(error) = &event.error {
            text.push_str(&format!("\nError: {error}"));
        }
        text.push_str(&format!("\nChecked at: {}", event.checked_at.to_rfc3339()));
        text
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, event: &AlertEvent) -> Result<()> {
        let url = format!("{TELEGRAM_API_BASE}/bot{}/sendMessage", self.token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": self.format_message(event),
            "parse_mode": self.parse_mode,
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "telegram sendMessage returned {}",
                response.status()
            )
            .into());
        }

        Ok(())
    }
}
