use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::Notifier;
use crate::domain::Alert;

#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn channel(&self) -> &'static str {
        "console"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        println!("🚨 {}\n{}", alert.title(), alert.message());
        info!("Alert sent to console: {}", alert.title());
        Ok(())
    }
}
