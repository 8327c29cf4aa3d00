// metalwatch - Gold & Silver Price Drop Monitor
// Polls the Aura Gold price feed and alerts when prices fall 10%/20% below baseline.
// After each alert the baseline moves to the current price, ready for the next staged drop.

use anyhow::Result;
use clap::Parser;
use metalwatch::cli::{Cli, Commands};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match dotenv::dotenv() {
        Ok(path) => info!("📄 Loaded .env from {:?}", path),
        Err(e) => warn!("⚠️  Could not load .env file: {}", e),
    }

    println!("\n{}", "=".repeat(50));
    println!("  🪙 Metal Price Tracker");
    println!("  Data Source: Aura Gold (auragold.netlify.app)");
    println!("{}\n", "=".repeat(50));

    metalwatch::run(cli.command.unwrap_or(Commands::Check)).await
}
