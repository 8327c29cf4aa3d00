use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::Notifier;
use crate::config::AppConfig;
use crate::domain::Alert;

const FAST2SMS_URL: &str = "https://www.fast2sms.com/dev/bulkV2";
const TEXTBELT_URL: &str = "https://textbelt.com/text";

/// An SMS gateway and the numbers it can reach.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn supports(&self, phone: &str) -> bool;
    async fn send(&self, phone: &str, message: &str) -> Result<()>;
}

/// `+91XXXXXXXXXX` or `91XXXXXXXXXX`, spaces and dashes ignored.
fn indian_local_number(phone: &str) -> Option<String> {
    let compact: String = phone.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    let local = compact.strip_prefix("+91").or_else(|| compact.strip_prefix("91"))?;
    (local.len() == 10 && local.chars().all(|c| c.is_ascii_digit())).then(|| local.to_string())
}

/// India-only gateway, needs an API key.
pub struct Fast2Sms {
    api_key: String,
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Fast2SmsResponse {
    #[serde(rename = "return", default)]
    ok: bool,
    #[serde(default)]
    message: serde_json::Value,
}

impl Fast2Sms {
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            url: FAST2SMS_URL.to_string(),
            client,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl SmsProvider for Fast2Sms {
    fn name(&self) -> &'static str {
        "fast2sms"
    }

    fn supports(&self, phone: &str) -> bool {
        indian_local_number(phone).is_some()
    }

    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        let number = indian_local_number(phone).ok_or_else(|| anyhow!("not an Indian number"))?;
        let payload = serde_json::json!({
            "route": "q",
            "message": message,
            "language": "english",
            "flash": 0,
            "numbers": number,
        });

        let result: Fast2SmsResponse = self
            .client
            .post(&self.url)
            .header("authorization", &self.api_key)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if result.ok {
            Ok(())
        } else {
            Err(anyhow!("Fast2SMS rejected the message: {}", result.message))
        }
    }
}

/// International gateway; works for any number with a valid key.
pub struct Textbelt {
    key: String,
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TextbeltResponse {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

impl Textbelt {
    pub fn new(key: String, client: reqwest::Client) -> Self {
        Self {
            key,
            url: TEXTBELT_URL.to_string(),
            client,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl SmsProvider for Textbelt {
    fn name(&self) -> &'static str {
        "textbelt"
    }

    fn supports(&self, _phone: &str) -> bool {
        true
    }

    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        let result: TextbeltResponse = self
            .client
            .post(&self.url)
            .form(&[("phone", phone), ("message", message), ("key", self.key.as_str())])
            .send()
            .await?
            .json()
            .await?;

        if result.success {
            Ok(())
        } else {
            Err(anyhow!(
                "Textbelt rejected the message: {}",
                result.error.unwrap_or_else(|| "Unknown error".to_string())
            ))
        }
    }
}

/// SMS channel: providers are tried in order until one that supports the number succeeds.
pub struct SmsNotifier {
    phone: String,
    providers: Vec<Box<dyn SmsProvider>>,
}

impl SmsNotifier {
    pub fn new(phone: String, providers: Vec<Box<dyn SmsProvider>>) -> Self {
        Self { phone, providers }
    }

    pub fn maybe_from_config(config: &AppConfig, client: reqwest::Client) -> Option<Self> {
        let phone = config.phone_number.clone()?;
        let mut providers: Vec<Box<dyn SmsProvider>> = Vec::new();
        if let Some(key) = &config.fast2sms_api_key {
            providers.push(Box::new(Fast2Sms::new(key.clone(), client.clone())));
        } else if indian_local_number(&phone).is_some() {
            warn!("Indian number without FAST2SMS_API_KEY; Textbelt may refuse it");
        }
        providers.push(Box::new(Textbelt::new(config.textbelt_key.clone(), client)));
        Some(Self::new(phone, providers))
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    fn channel(&self) -> &'static str {
        "sms"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let message = format!("🚨 {}", alert.message());
        let mut errors = Vec::new();

        for provider in self.providers.iter().filter(|p| p.supports(&self.phone)) {
            match provider.send(&self.phone, &message).await {
                Ok(()) => {
                    info!("Alert sent by SMS via {}", provider.name());
                    return Ok(());
                }
                Err(e) => {
                    debug!("{} failed: {:#}", provider.name(), e);
                    errors.push(format!("{}: {:#}", provider.name(), e));
                }
            }
        }

        if errors.is_empty() {
            Err(anyhow!("no SMS provider can reach this number"))
        } else {
            Err(anyhow!(errors.join("; ")))
        }
    }
}
