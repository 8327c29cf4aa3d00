//! Operator-facing commands and their terminal output.

use std::fmt::Write as _;

use anyhow::{bail, Result};
use tracing::info;

use crate::cli::{ResetAlertsArgs, SetBaselineArgs};
use crate::config::AppConfig;
use crate::coordinator::{
    AlertCoordinator, BaselineUpdate, CommodityOutcome, CommodityStatus, ThresholdOutcome, TickReport,
};
use crate::ledger::ResetScope;
use crate::scheduler;
use crate::utils::{mask_phone, mask_secret};

pub async fn check(coordinator: &mut AlertCoordinator, config: &AppConfig) {
    println!("Checking prices...");
    match scheduler::run_tick(coordinator, config.tick_timeout).await {
        Some(report) => print!("{}", render_tick(&report)),
        None => println!("  ⚠️  Check timed out; nothing was changed after the timeout"),
    }
}

pub async fn daemon(coordinator: &mut AlertCoordinator, config: &AppConfig) {
    println!(
        "🔄 Checking every {} minute(s). Press Ctrl+C to stop.",
        config.check_interval.as_secs() / 60
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let ticks = scheduler::run_every(
        coordinator,
        config.check_interval,
        config.tick_timeout,
        shutdown,
        |report| print!("{}", render_tick(report)),
    )
    .await;

    info!("Daemon ran {} check(s)", ticks);
    println!("\n👋 Daemon stopped.");
}

pub async fn set_baseline(coordinator: &mut AlertCoordinator, args: &SetBaselineArgs) -> Result<()> {
    let updates = match (args.commodity, args.price) {
        (Some(commodity), Some(price)) => {
            if price <= 0.0 {
                bail!("--price must be positive, got {price}");
            }
            vec![coordinator.set_baseline(commodity, price)]
        }
        (commodity, _) => {
            println!("Setting current prices as baseline...");
            coordinator.set_baselines_from_feed(commodity).await
        }
    };

    for update in &updates {
        match update {
            BaselineUpdate::Set { commodity, price } => {
                println!("  ✅ {}: ₹{:.2} (alert state reset)", commodity.label(), price)
            }
            BaselineUpdate::FetchFailed { commodity } => {
                println!("  ⚠️  Could not fetch {} price, baseline unchanged", commodity)
            }
            BaselineUpdate::WriteFailed { commodity, error } => {
                println!("  ❌ {}: baseline not saved ({})", commodity.label(), error)
            }
        }
    }
    Ok(())
}

pub fn reset_alerts(coordinator: &mut AlertCoordinator, args: &ResetAlertsArgs) -> Result<()> {
    println!("{}", reset_alerts_message(coordinator, args));
    Ok(())
}

fn reset_alerts_message(coordinator: &mut AlertCoordinator, args: &ResetAlertsArgs) -> String {
    if let Err(e) = coordinator.reset_alerts(ResetScope::from(args.commodity)) {
        return format!("❌ Alert state not saved ({e:#})");
    }
    match args.commodity {
        Some(commodity) => format!("✅ Alert state has been reset for {commodity}."),
        None => "✅ Alert state has been reset.".to_string(),
    }
}

pub async fn status(coordinator: &AlertCoordinator, config: &AppConfig) {
    let statuses = coordinator.status().await;
    print!("{}", render_status(config, &coordinator.channel_names(), &statuses));
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "✅"
    } else {
        "❌"
    }
}

pub fn render_tick(report: &TickReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n[{}]", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));

    for outcome in &report.outcomes {
        let commodity = outcome.commodity();
        match outcome {
            CommodityOutcome::FetchFailed { .. } => {
                let _ = writeln!(out, "  ⚠️  Could not fetch {commodity} price");
            }
            CommodityOutcome::BaselineNotSet { record } => {
                let _ = writeln!(out, "\n  📊 {}:", commodity.label());
                let _ = writeln!(out, "     Current Price: ₹{:.2} (with 3% GST)", record.display_price());
                let _ = writeln!(out, "     ⚠️  Baseline not set. Run `metalwatch set-baseline` to set it.");
            }
            CommodityOutcome::Evaluated {
                summary,
                thresholds,
                rebase,
            } => {
                let _ = writeln!(out, "\n  📊 {}:", commodity.label());
                let _ = writeln!(out, "     Current Price: ₹{:.2} (with 3% GST)", summary.current_price());
                if let Some(baseline) = summary.baseline {
                    let _ = writeln!(out, "     Baseline: ₹{baseline:.2}");
                }
                if let (Some(label), Some(drop)) = (summary.change_label(), summary.drop_percent) {
                    let arrow = if drop > 0.0 { "📉" } else { "📈" };
                    let _ = writeln!(out, "     Change: {arrow} {label}");
                }

                for result in thresholds {
                    let _ = writeln!(
                        out,
                        "\n  🚨 ALERT: {} has dropped {}% from baseline!",
                        commodity.label(),
                        result.threshold
                    );
                    let line = match &result.outcome {
                        ThresholdOutcome::AlreadySent => "(Alert was already sent previously)".to_string(),
                        ThresholdOutcome::Delivered { channels } => {
                            format!("✅ Sent via {}", channels.join(", "))
                        }
                        ThresholdOutcome::AllChannelsFailed { channels } => {
                            format!("❌ Delivery failed on {}; will retry next check", channels.join(", "))
                        }
                        ThresholdOutcome::NoChannels => {
                            "⚠️  No notifications sent (check configuration)".to_string()
                        }
                    };
                    let _ = writeln!(out, "     {line}");
                }

                if let Some(rebase) = rebase {
                    let from = rebase
                        .from
                        .map_or_else(|| "unset".to_string(), |from| format!("₹{from:.2}"));
                    let _ = writeln!(out, "     📊 Baseline updated: {} → ₹{:.2}", from, rebase.to);
                    let _ = writeln!(out, "     🔄 Ready for the next drop alert");
                }
            }
        }
    }
    out
}

pub fn render_status(config: &AppConfig, channels: &[&'static str], statuses: &[CommodityStatus]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n📋 Configuration Status:");
    let email = match (&config.resend_api_key, &config.email_to) {
        (Some(key), Some(to)) => format!("✅ {} (key {})", to, mask_secret(key)),
        _ => yes_no(false).to_string(),
    };
    let _ = writeln!(out, "  Email configured: {email}");
    let sms = config
        .phone_number
        .as_deref()
        .map_or_else(|| yes_no(false).to_string(), |phone| format!("✅ {}", mask_phone(phone)));
    let _ = writeln!(out, "  SMS configured: {sms}");
    let _ = writeln!(out, "  Telegram configured: {}", yes_no(config.is_telegram_configured()));
    let active = if channels.is_empty() {
        "none".to_string()
    } else {
        channels.join(", ")
    };
    let _ = writeln!(out, "  Active channels: {active}");
    let _ = writeln!(out, "  Check interval: {} minutes", config.check_interval.as_secs() / 60);
    for threshold in config.thresholds.all() {
        let _ = writeln!(out, "  {}% alert: {}", threshold.percent, yes_no(threshold.enabled));
    }

    let _ = writeln!(out, "\n📊 Baseline Prices:");
    for status in statuses {
        let label = status.commodity.label();
        match status.baseline {
            Some(baseline) if status.pinned => {
                let _ = writeln!(out, "  {label}: ₹{baseline:.2} (pinned by {label}_BASELINE_PRICE)");
            }
            Some(baseline) => {
                let since = status
                    .stored
                    .as_ref()
                    .map(|entry| format!(" (set {})", entry.set_at.format("%Y-%m-%d %H:%M UTC")))
                    .unwrap_or_default();
                let _ = writeln!(out, "  {label}: ₹{baseline:.2}{since}");
            }
            None => {
                let _ = writeln!(out, "  {label}: Not set");
            }
        }
        for (threshold, sent_at) in &status.sent {
            if let Some(sent_at) = sent_at {
                let _ = writeln!(
                    out,
                    "    {}% alert sent {}",
                    threshold,
                    sent_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }
    }

    let _ = writeln!(out, "\n💰 Current Prices:");
    for status in statuses {
        let Some(summary) = &status.price else {
            let _ = writeln!(out, "\n  {}: could not fetch price", status.commodity.label());
            continue;
        };
        let record = &summary.record;
        let _ = writeln!(out, "\n  {}:", status.commodity.label());
        let _ = writeln!(out, "    Product: {}", record.product_name);
        let _ = writeln!(out, "    Price (with GST): ₹{:.2}", record.price_with_gst);
        let _ = writeln!(out, "    Price (without GST): ₹{:.2}", record.price_without_gst);
        let _ = writeln!(out, "    Buy Price: ₹{:.2}", record.buy_price);
        let _ = writeln!(out, "    Sell Price: ₹{:.2}", record.sell_price);
        let _ = writeln!(out, "    Updated: {}", record.updated_at);
        if let Some(label) = summary.change_label() {
            let _ = writeln!(out, "    Change from baseline: {label}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::alert::{DropEvaluator, ThresholdSet};
    use crate::baseline::{BaselineDocument, BaselineStore};
    use crate::coordinator::{Rebase, ThresholdResult};
    use crate::domain::{sample_record, Commodity, PriceSummary};
    use crate::ledger::{AlertLedger, LedgerDocument};
    use crate::notifier::NotifierHub;
    use crate::price::AuraPriceFeed;
    use crate::store::memory::MemoryStore;

    fn offline_coordinator(ledger_store: MemoryStore<LedgerDocument>) -> AlertCoordinator {
        let thresholds = ThresholdSet::default();
        AlertCoordinator::new(
            Box::new(AuraPriceFeed::new(reqwest::Client::new(), "http://127.0.0.1:9")),
            DropEvaluator::new(thresholds.clone()),
            BaselineStore::new(Box::new(MemoryStore::<BaselineDocument>::new()), Default::default()),
            AlertLedger::new(Box::new(ledger_store), thresholds.percents()),
            NotifierHub::new(Vec::new()),
        )
    }

    #[test]
    fn reset_alerts_reports_write_failure_without_erroring() {
        let mut coordinator = offline_coordinator(MemoryStore::failing());
        let args = ResetAlertsArgs { commodity: None };

        let message = reset_alerts_message(&mut coordinator, &args);
        assert!(message.starts_with("❌ Alert state not saved"));
        assert!(message.contains("disk full"));
        assert!(reset_alerts(&mut coordinator, &args).is_ok());
    }

    #[test]
    fn reset_alerts_confirms_scope() {
        let ledger_store = MemoryStore::new();
        let mut coordinator = offline_coordinator(ledger_store.clone());
        let args = ResetAlertsArgs {
            commodity: Some(Commodity::Silver),
        };

        assert_eq!(
            reset_alerts_message(&mut coordinator, &args),
            "✅ Alert state has been reset for silver."
        );
        assert_eq!(ledger_store.saves(), 1);
    }

    #[test]
    fn tick_output_covers_each_outcome() {
        let report = TickReport {
            started_at: Utc::now(),
            outcomes: vec![
                CommodityOutcome::Evaluated {
                    summary: PriceSummary::new(sample_record(Commodity::Gold, 1500.0), Some(2000.0), Some(25.0)),
                    thresholds: vec![
                        ThresholdResult {
                            threshold: 10,
                            outcome: ThresholdOutcome::AlreadySent,
                        },
                        ThresholdResult {
                            threshold: 20,
                            outcome: ThresholdOutcome::Delivered {
                                channels: vec!["email", "sms"],
                            },
                        },
                    ],
                    rebase: Some(Rebase {
                        from: Some(2000.0),
                        to: 1500.0,
                    }),
                },
                CommodityOutcome::FetchFailed {
                    commodity: Commodity::Silver,
                },
            ],
        };

        let out = render_tick(&report);
        assert!(out.contains("Change: 📉 down 25.00%"));
        assert!(out.contains("(Alert was already sent previously)"));
        assert!(out.contains("✅ Sent via email, sms"));
        assert!(out.contains("Baseline updated: ₹2000.00 → ₹1500.00"));
        assert!(out.contains("Could not fetch silver price"));
    }

    #[test]
    fn tick_output_flags_missing_baseline() {
        let report = TickReport {
            started_at: Utc::now(),
            outcomes: vec![CommodityOutcome::BaselineNotSet {
                record: sample_record(Commodity::Silver, 92.0),
            }],
        };
        let out = render_tick(&report);
        assert!(out.contains("SILVER"));
        assert!(out.contains("Baseline not set"));
    }

    #[test]
    fn status_masks_secrets_and_marks_pins() {
        let config = AppConfig::from_lookup(|key| match key {
            "RESEND_API_KEY" => Some("re_supersecret9876".into()),
            "EMAIL_TO" => Some("me@example.com".into()),
            "PHONE_NUMBER" => Some("+919876543210".into()),
            "ALERT_20_PERCENT" => Some("false".into()),
            _ => None,
        })
        .unwrap();
        let statuses = vec![
            CommodityStatus {
                commodity: Commodity::Gold,
                baseline: Some(7250.0),
                pinned: true,
                stored: None,
                sent: vec![(10, Some(Utc::now())), (20, None)],
                price: Some(PriceSummary::new(sample_record(Commodity::Gold, 7000.0), Some(7250.0), Some(3.45))),
            },
            CommodityStatus {
                commodity: Commodity::Silver,
                baseline: None,
                pinned: false,
                stored: None,
                sent: vec![(10, None), (20, None)],
                price: None,
            },
        ];

        let out = render_status(&config, &["email", "sms"], &statuses);
        assert!(out.contains("me@example.com (key ****9876)"));
        assert!(!out.contains("supersecret"));
        assert!(out.contains("+****3210"));
        assert!(out.contains("20% alert: ❌"));
        assert!(out.contains("pinned by GOLD_BASELINE_PRICE"));
        assert!(out.contains("10% alert sent"));
        assert!(out.contains("SILVER: Not set"));
        assert!(out.contains("SILVER: could not fetch price"));
        assert!(out.contains("Change from baseline: down 3.45%"));
    }
}
