use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::info;

use super::Notifier;
use crate::config::AppConfig;
use crate::domain::Alert;
use crate::utils::mask_url;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String, client: reqwest::Client) -> Self {
        Self {
            bot_token,
            chat_id,
            api_base: TELEGRAM_API.to_string(),
            client,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn maybe_from_config(config: &AppConfig, client: reqwest::Client) -> Option<Self> {
        match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(Self::new(token.clone(), chat_id.clone(), client)),
            _ => None,
        }
    }

    fn render(alert: &Alert) -> String {
        format!(
            "🚨 *{}*\n\n{}\n\n_Time: {}_",
            alert.title(),
            alert.message(),
            alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": Self::render(alert),
            "parse_mode": "Markdown"
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("request to {} failed: {}", mask_url(&url), e.without_url()))?;

        if response.status().is_success() {
            info!("Alert sent to Telegram: {}", alert.title());
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(anyhow!("Telegram answered {}: {}", status, error_text))
        }
    }
}
