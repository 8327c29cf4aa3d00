use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::alert::{Threshold, ThresholdSet};
use crate::domain::Commodity;
use crate::price::DEFAULT_FEED_URL;

const BASELINE_FILE: &str = "baseline_prices.json";
const ALERT_STATE_FILE: &str = "alert_state.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed_url: String,
    pub thresholds: ThresholdSet,
    pub baseline_pins: BTreeMap<Commodity, f64>,
    pub check_interval: Duration,
    pub http_timeout: Duration,
    pub tick_timeout: Duration,
    pub state_dir: PathBuf,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub email_to: Option<String>,
    pub phone_number: Option<String>,
    pub fast2sms_api_key: Option<String>,
    pub textbelt_key: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub console_alerts: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let levels = match get("ALERT_THRESHOLDS") {
            Some(raw) => parse_thresholds(&raw)?,
            None => vec![10, 20],
        };
        let mut thresholds = Vec::with_capacity(levels.len());
        for percent in levels {
            let key = format!("ALERT_{percent}_PERCENT");
            let enabled = match get(&key) {
                Some(raw) => parse_flag(&raw).with_context(|| format!("invalid {key}"))?,
                None => true,
            };
            thresholds.push(Threshold { percent, enabled });
        }

        let mut baseline_pins = BTreeMap::new();
        for commodity in Commodity::ALL {
            let key = format!("{}_BASELINE_PRICE", commodity.label());
            if let Some(raw) = get(&key) {
                let price: f64 = raw
                    .parse()
                    .map_err(|_| anyhow!("{key} must be a number, got '{raw}'"))?;
                if price > 0.0 {
                    baseline_pins.insert(commodity, price);
                }
            }
        }

        let check_interval_minutes = parse_u64(get("CHECK_INTERVAL_MINUTES"), 30, "CHECK_INTERVAL_MINUTES")?;
        if check_interval_minutes == 0 {
            bail!("CHECK_INTERVAL_MINUTES must be greater than zero");
        }
        let http_timeout_secs = parse_u64(get("HTTP_TIMEOUT_SECS"), 30, "HTTP_TIMEOUT_SECS")?.max(1);
        let tick_timeout_secs = parse_u64(get("TICK_TIMEOUT_SECS"), 300, "TICK_TIMEOUT_SECS")?.max(1);

        let console_alerts = match get("NOTIFY_CONSOLE") {
            Some(raw) => parse_flag(&raw).context("invalid NOTIFY_CONSOLE")?,
            None => false,
        };

        Ok(Self {
            feed_url: get("PRICE_FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            thresholds: ThresholdSet::new(thresholds),
            baseline_pins,
            check_interval: Duration::from_secs(check_interval_minutes * 60),
            http_timeout: Duration::from_secs(http_timeout_secs),
            tick_timeout: Duration::from_secs(tick_timeout_secs),
            state_dir: get("STATE_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            resend_api_key: get("RESEND_API_KEY"),
            email_from: get("EMAIL_FROM")
                .unwrap_or_else(|| "Metal Price Tracker <onboarding@resend.dev>".to_string()),
            email_to: get("EMAIL_TO"),
            phone_number: get("PHONE_NUMBER"),
            fast2sms_api_key: get("FAST2SMS_API_KEY"),
            textbelt_key: get("TEXTBELT_KEY").unwrap_or_else(|| "textbelt".to_string()),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: get("TELEGRAM_CHAT_ID"),
            console_alerts,
        })
    }

    pub fn baseline_path(&self) -> PathBuf {
        self.state_dir.join(BASELINE_FILE)
    }

    pub fn alert_state_path(&self) -> PathBuf {
        self.state_dir.join(ALERT_STATE_FILE)
    }

    pub fn is_email_configured(&self) -> bool {
        self.resend_api_key.is_some() && self.email_to.is_some()
    }

    pub fn is_sms_configured(&self) -> bool {
        self.phone_number.is_some()
    }

    pub fn is_telegram_configured(&self) -> bool {
        self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }
}

/// Comma-separated percentages, returned ascending without duplicates.
pub fn parse_thresholds(raw: &str) -> Result<Vec<u32>> {
    let mut levels = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('%')
                .parse::<u32>()
                .ok()
                .filter(|p| (1..100).contains(p))
                .ok_or_else(|| anyhow!("invalid threshold '{s}' (expected 1-99)"))
        })
        .collect::<Result<Vec<_>>>()?;

    if levels.is_empty() {
        bail!("ALERT_THRESHOLDS cannot be empty");
    }
    levels.sort_unstable();
    levels.dedup();
    Ok(levels)
}

pub fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected true/false, got '{other}'")),
    }
}

fn parse_u64(raw: Option<String>, default: u64, key: &str) -> Result<u64> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow!("{key} must be a whole number, got '{raw}'")),
        None => Ok(default),
    }
}
