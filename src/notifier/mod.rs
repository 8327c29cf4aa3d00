mod console;
mod email;
mod sms;
mod telegram;

pub use console::ConsoleNotifier;
pub use email::EmailNotifier;
pub use sms::{Fast2Sms, SmsNotifier, SmsProvider, Textbelt};
pub use telegram::TelegramNotifier;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::Alert;

/// One delivery channel. Failures are reported, never retried here.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;
    async fn send(&self, alert: &Alert) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: &'static str,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DeliveryReport {
    pub fn any_succeeded(&self) -> bool {
        self.outcomes.iter().any(|o| o.error.is_none())
    }

    pub fn delivered(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_none())
            .map(|o| o.channel)
            .collect()
    }

    pub fn failed(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .map(|o| o.channel)
            .collect()
    }
}

/// Fans an alert out to every configured channel, in priority order.
pub struct NotifierHub {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierHub {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn from_config(config: &AppConfig, client: &reqwest::Client) -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        match EmailNotifier::maybe_from_config(config, client.clone()) {
            Some(email) => {
                info!("📧 Email notifications enabled");
                channels.push(Box::new(email));
            }
            None => info!("📧 Email notifications disabled (no credentials)"),
        }
        match SmsNotifier::maybe_from_config(config, client.clone()) {
            Some(sms) => {
                info!("📱 SMS notifications enabled");
                channels.push(Box::new(sms));
            }
            None => info!("📱 SMS notifications disabled (no phone number)"),
        }
        match TelegramNotifier::maybe_from_config(config, client.clone()) {
            Some(telegram) => {
                info!("💬 Telegram notifications enabled");
                channels.push(Box::new(telegram));
            }
            None => info!("💬 Telegram notifications disabled (no credentials)"),
        }
        if config.console_alerts {
            channels.push(Box::new(ConsoleNotifier::new()));
        }

        Self::new(channels)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.channel()).collect()
    }

    /// Tries every channel; one failing never stops the others.
    pub async fn deliver(&self, alert: &Alert) -> DeliveryReport {
        let mut outcomes = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let error = match channel.send(alert).await {
                Ok(()) => None,
                Err(e) => {
                    warn!("{} notification failed: {:#}", channel.channel(), e);
                    Some(format!("{e:#}"))
                }
            };
            outcomes.push(ChannelOutcome {
                channel: channel.channel(),
                error,
            });
        }
        DeliveryReport { outcomes }
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::Notifier;
    use crate::domain::Alert;

    /// Records what it was asked to send; can be flipped to fail.
    #[derive(Clone)]
    pub struct StubNotifier {
        name: &'static str,
        failing: Arc<AtomicBool>,
        attempts: Arc<AtomicUsize>,
        sent: Arc<Mutex<Vec<(String, u32)>>>,
    }

    impl StubNotifier {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                failing: Arc::new(AtomicBool::new(false)),
                attempts: Arc::new(AtomicUsize::new(0)),
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn failing(name: &'static str) -> Self {
            let stub = Self::new(name);
            stub.set_failing(true);
            stub
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        pub fn sent(&self) -> Vec<(String, u32)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for StubNotifier {
        fn channel(&self) -> &'static str {
            self.name
        }

        async fn send(&self, alert: &Alert) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(anyhow!("{} unavailable", self.name));
            }
            self.sent
                .lock()
                .unwrap()
                .push((alert.commodity.to_string(), alert.threshold));
            Ok(())
        }
    }
}
