pub mod alert;
pub mod baseline;
pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod notifier;
pub mod price;
pub mod scheduler;
pub mod store;
pub mod timestamp;
pub mod utils;

use alert::DropEvaluator;
use baseline::BaselineStore;
use cli::Commands;
use config::AppConfig;
use coordinator::AlertCoordinator;
use ledger::AlertLedger;
use notifier::NotifierHub;
use price::AuraPriceFeed;
use store::JsonFileStore;

use anyhow::{Context, Result};
use tracing::{info, warn};

/// Wires the components from one immutable configuration value.
pub fn build_coordinator(config: &AppConfig) -> Result<AlertCoordinator> {
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let source = AuraPriceFeed::new(client.clone(), config.feed_url.clone());
    let baselines = BaselineStore::new(
        Box::new(JsonFileStore::new(config.baseline_path())),
        config.baseline_pins.clone(),
    );
    let ledger = AlertLedger::new(
        Box::new(JsonFileStore::new(config.alert_state_path())),
        config.thresholds.percents(),
    );
    let notifier = NotifierHub::from_config(config, &client);
    if notifier.is_empty() {
        warn!("⚠️  No notification channel configured; alerts will be reported but not sent");
    }

    Ok(AlertCoordinator::new(
        Box::new(source),
        DropEvaluator::new(config.thresholds.clone()),
        baselines,
        ledger,
        notifier,
    ))
}

pub async fn run(command: Commands) -> Result<()> {
    let config = AppConfig::from_env()?;
    info!("🪙 Metal price tracker, feed: {}", config.feed_url);
    let mut coordinator = build_coordinator(&config)?;

    match command {
        Commands::Check => commands::check(&mut coordinator, &config).await,
        Commands::Daemon => commands::daemon(&mut coordinator, &config).await,
        Commands::SetBaseline(args) => commands::set_baseline(&mut coordinator, &args).await?,
        Commands::ResetAlerts(args) => commands::reset_alerts(&mut coordinator, &args)?,
        Commands::Status => commands::status(&coordinator, &config).await,
    }
    Ok(())
}
