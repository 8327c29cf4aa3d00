//! Command-line surface.

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::Commodity;

#[derive(Parser, Debug)]
#[command(name = "metalwatch")]
#[command(author, version, about = "Gold and silver price-drop alerts with staged baselines")]
pub struct Cli {
    /// Log level (RUST_LOG takes precedence when set)
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Check prices once and send any due alerts (default)
    Check,
    /// Keep checking on the configured interval until Ctrl-C
    Daemon,
    /// Set the baseline to the current price, or to --price
    SetBaseline(SetBaselineArgs),
    /// Forget which alerts were sent, keeping baselines
    ResetAlerts(ResetAlertsArgs),
    /// Show configuration, baselines and current prices
    Status,
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct SetBaselineArgs {
    /// Only this commodity
    #[arg(short, long)]
    pub commodity: Option<Commodity>,

    /// Explicit baseline price instead of the live one
    #[arg(short, long, requires = "commodity")]
    pub price: Option<f64>,
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct ResetAlertsArgs {
    /// Only this commodity
    #[arg(short, long)]
    pub commodity: Option<Commodity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["metalwatch"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level.as_filter(), "info");
    }

    #[test]
    fn parses_manual_baseline() {
        let cli = Cli::try_parse_from(["metalwatch", "set-baseline", "--commodity", "gold", "--price", "7250.5"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::SetBaseline(SetBaselineArgs {
                commodity: Some(Commodity::Gold),
                price: Some(7250.5),
            }))
        );
    }

    #[test]
    fn price_requires_commodity() {
        assert!(Cli::try_parse_from(["metalwatch", "set-baseline", "--price", "100"]).is_err());
    }

    #[test]
    fn parses_scoped_reset_and_global_log_level() {
        let cli = Cli::try_parse_from(["metalwatch", "reset-alerts", "-c", "silver", "--log-level", "debug"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::ResetAlerts(ResetAlertsArgs {
                commodity: Some(Commodity::Silver),
            }))
        );
        assert_eq!(cli.log_level.as_filter(), "debug");
    }
}
