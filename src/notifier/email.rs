use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::Notifier;
use crate::config::AppConfig;
use crate::domain::Alert;

const RESEND_API: &str = "https://api.resend.com";

/// Email through the Resend HTTP API.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    api_key: String,
    from: String,
    to: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

impl EmailNotifier {
    pub fn new(api_key: String, from: String, to: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            from,
            to,
            api_base: RESEND_API.to_string(),
            client,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn maybe_from_config(config: &AppConfig, client: reqwest::Client) -> Option<Self> {
        match (&config.resend_api_key, &config.email_to) {
            (Some(key), Some(to)) => Some(Self::new(key.clone(), config.email_from.clone(), to.clone(), client)),
            _ => None,
        }
    }

    fn subject(alert: &Alert) -> String {
        format!("🚨 {}", alert.title())
    }

    fn render_html(alert: &Alert) -> String {
        let summary = &alert.summary;
        let record = &summary.record;
        let money = |value: Option<f64>| value.map_or_else(|| "n/a".to_string(), |v| format!("₹{v:.2}"));

        let rows = [
            ("Product", record.product_name.clone()),
            ("Current Price (with 3% GST)", money(Some(record.price_with_gst))),
            ("Current Price (without GST)", money(Some(record.price_without_gst))),
            ("Baseline Price", money(summary.baseline)),
            (
                "Drop",
                summary
                    .drop_percent
                    .map_or_else(|| "n/a".to_string(), |d| format!("{d:.2}%")),
            ),
            ("Buy Price", money(Some(record.buy_price))),
            ("Sell Price", money(Some(record.sell_price))),
            ("Last Updated", record.updated_at.clone()),
        ];

        let table: String = rows
            .iter()
            .map(|(label, value)| {
                format!(
                    "<tr><td style=\"padding:8px;border-bottom:1px solid #ddd;\"><strong>{label}</strong></td>\
                     <td style=\"padding:8px;border-bottom:1px solid #ddd;\">{}</td></tr>",
                    escape_html(value)
                )
            })
            .collect();

        format!(
            "<html><body style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto;padding:20px;\">\
             <h1>🪙 Metal Price Alert</h1>\
             <h2 style=\"color:#e74c3c;\">{} has dropped {}% from baseline!</h2>\
             <table style=\"width:100%;border-collapse:collapse;\">{table}</table>\
             <p style=\"color:#666;font-size:12px;\">Automated alert from metalwatch. \
             The baseline now moves to the current price for the next staged alert.</p>\
             </body></html>",
            alert.commodity.label(),
            alert.threshold,
        )
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let payload = serde_json::json!({
            "from": self.from,
            "to": [self.to],
            "subject": Self::subject(alert),
            "html": Self::render_html(alert),
        });

        let response = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Resend answered {}: {}", status, error_text));
        }

        let id = response
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|r| r.id)
            .unwrap_or_else(|| "unknown id".to_string());
        info!("Alert emailed ({}): {}", id, alert.title());
        Ok(())
    }
}
