use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::alert::DropEvaluator;
use crate::baseline::{BaselineEntry, BaselineStore};
use crate::domain::{Alert, Commodity, PriceRecord, PriceSummary};
use crate::ledger::{AlertLedger, ResetScope};
use crate::notifier::NotifierHub;
use crate::price::PriceSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdOutcome {
    /// Delivered earlier since the last rebase; skipped.
    AlreadySent,
    Delivered { channels: Vec<&'static str> },
    AllChannelsFailed { channels: Vec<&'static str> },
    NoChannels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdResult {
    pub threshold: u32,
    pub outcome: ThresholdOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rebase {
    pub from: Option<f64>,
    pub to: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommodityOutcome {
    FetchFailed {
        commodity: Commodity,
    },
    BaselineNotSet {
        record: PriceRecord,
    },
    Evaluated {
        summary: PriceSummary,
        thresholds: Vec<ThresholdResult>,
        rebase: Option<Rebase>,
    },
}

impl CommodityOutcome {
    pub fn commodity(&self) -> Commodity {
        match self {
            CommodityOutcome::FetchFailed { commodity } => *commodity,
            CommodityOutcome::BaselineNotSet { record } => record.commodity,
            CommodityOutcome::Evaluated { summary, .. } => summary.record.commodity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<CommodityOutcome>,
}

impl TickReport {
    pub fn alerts_delivered(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                CommodityOutcome::Evaluated { thresholds, .. } => thresholds
                    .iter()
                    .filter(|t| matches!(t.outcome, ThresholdOutcome::Delivered { .. }))
                    .count(),
                _ => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BaselineUpdate {
    Set { commodity: Commodity, price: f64 },
    FetchFailed { commodity: Commodity },
    WriteFailed { commodity: Commodity, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommodityStatus {
    pub commodity: Commodity,
    pub baseline: Option<f64>,
    pub pinned: bool,
    pub stored: Option<BaselineEntry>,
    pub sent: Vec<(u32, Option<DateTime<Utc>>)>,
    pub price: Option<PriceSummary>,
}

/// Runs fetch, evaluate, alert and rebase for each commodity.
///
/// Takes `&mut self` throughout, so one commodity's sequence always completes
/// before another touches the baseline or ledger.
pub struct AlertCoordinator {
    source: Box<dyn PriceSource>,
    evaluator: DropEvaluator,
    baselines: BaselineStore,
    ledger: AlertLedger,
    notifier: NotifierHub,
}

impl AlertCoordinator {
    pub fn new(
        source: Box<dyn PriceSource>,
        evaluator: DropEvaluator,
        baselines: BaselineStore,
        ledger: AlertLedger,
        notifier: NotifierHub,
    ) -> Self {
        Self {
            source,
            evaluator,
            baselines,
            ledger,
            notifier,
        }
    }

    pub fn evaluator(&self) -> &DropEvaluator {
        &self.evaluator
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.notifier.channel_names()
    }

    pub async fn tick(&mut self) -> TickReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(Commodity::ALL.len());
        for commodity in Commodity::ALL {
            outcomes.push(self.check(commodity).await);
        }
        TickReport { started_at, outcomes }
    }

    pub async fn check(&mut self, commodity: Commodity) -> CommodityOutcome {
        let Some(record) = self.source.fetch(commodity).await else {
            return CommodityOutcome::FetchFailed { commodity };
        };

        let baseline = self.baselines.get(commodity);
        let Some(drop) = DropEvaluator::drop_percent(baseline, record.display_price()) else {
            warn!("⚠️  {} baseline not set, skipping alert checks", commodity);
            return CommodityOutcome::BaselineNotSet { record };
        };

        let summary = PriceSummary::new(record, baseline, Some(drop));
        info!(
            "📊 {} ₹{:.2} vs baseline ₹{:.2} ({:+.2}% drop)",
            commodity,
            summary.current_price(),
            baseline.unwrap_or_default(),
            drop
        );

        // Ledger state is read once, before any delivery in this tick.
        let crossed: Vec<(u32, bool)> = self
            .evaluator
            .crossed_thresholds(drop)
            .into_iter()
            .map(|threshold| (threshold, self.ledger.was_sent(commodity, threshold)))
            .collect();

        let pending = crossed.iter().filter(|(_, sent)| !sent).count();
        if pending > 0 && self.notifier.is_empty() {
            warn!("⚠️  No notification channel configured, {} alert(s) not sent", pending);
        }

        let mut thresholds = Vec::with_capacity(crossed.len());
        let mut delivered_any = false;
        for (threshold, already_sent) in crossed {
            let outcome = if already_sent {
                info!("{} {}% alert already sent, skipping", commodity, threshold);
                ThresholdOutcome::AlreadySent
            } else if self.notifier.is_empty() {
                ThresholdOutcome::NoChannels
            } else {
                self.dispatch(Alert::new(commodity, threshold, summary.clone())).await
            };
            delivered_any |= matches!(outcome, ThresholdOutcome::Delivered { .. });
            thresholds.push(ThresholdResult { threshold, outcome });
        }

        let rebase = if delivered_any {
            self.rebase(commodity, summary.current_price())
        } else {
            None
        };

        CommodityOutcome::Evaluated {
            summary,
            thresholds,
            rebase,
        }
    }

    async fn dispatch(&mut self, alert: Alert) -> ThresholdOutcome {
        info!("🚨 {} dropped {}% from baseline", alert.commodity.label(), alert.threshold);
        let report = self.notifier.deliver(&alert).await;

        if !report.any_succeeded() {
            warn!("All channels failed for {} {}% alert", alert.commodity, alert.threshold);
            return ThresholdOutcome::AllChannelsFailed {
                channels: report.failed(),
            };
        }

        if let Err(e) = self.ledger.mark_sent(alert.commodity, alert.threshold) {
            warn!("Failed to record {} {}% alert: {:#}", alert.commodity, alert.threshold, e);
        }
        ThresholdOutcome::Delivered {
            channels: report.delivered(),
        }
    }

    /// Moves the baseline to `price` and clears the commodity's ledger.
    /// The ledger is left alone if the baseline write fails, so sent alerts stay suppressed.
    fn rebase(&mut self, commodity: Commodity, price: f64) -> Option<Rebase> {
        let from = self.baselines.get(commodity);
        if let Err(e) = self.baselines.set(commodity, price) {
            warn!("Failed to rebase {} baseline: {:#}", commodity, e);
            return None;
        }
        if self.baselines.pinned_price(commodity).is_some() {
            warn!("{} baseline is pinned by configuration; reads still use the pinned price", commodity);
        }
        if let Err(e) = self.ledger.reset(ResetScope::Commodity(commodity)) {
            warn!("Failed to reset {} alert state: {:#}", commodity, e);
        }
        info!(
            "📊 {} baseline updated: ₹{:.2} → ₹{:.2}",
            commodity,
            from.unwrap_or_default(),
            price
        );
        Some(Rebase { from, to: price })
    }

    /// Sets baselines to the live price for one or all commodities.
    pub async fn set_baselines_from_feed(&mut self, commodity: Option<Commodity>) -> Vec<BaselineUpdate> {
        let targets: Vec<Commodity> = match commodity {
            Some(commodity) => vec![commodity],
            None => Commodity::ALL.to_vec(),
        };

        let mut updates = Vec::with_capacity(targets.len());
        for commodity in targets {
            let update = match self.source.fetch(commodity).await {
                Some(record) => self.set_baseline(commodity, record.display_price()),
                None => BaselineUpdate::FetchFailed { commodity },
            };
            updates.push(update);
        }
        updates
    }

    /// Manual rebase to an operator-supplied price.
    pub fn set_baseline(&mut self, commodity: Commodity, price: f64) -> BaselineUpdate {
        match self.baselines.set(commodity, price) {
            Ok(()) => {
                if let Err(e) = self.ledger.reset(ResetScope::Commodity(commodity)) {
                    warn!("Failed to reset {} alert state: {:#}", commodity, e);
                }
                BaselineUpdate::Set { commodity, price }
            }
            Err(e) => BaselineUpdate::WriteFailed {
                commodity,
                error: format!("{e:#}"),
            },
        }
    }

    pub fn reset_alerts(&mut self, scope: ResetScope) -> Result<()> {
        self.ledger.reset(scope)
    }

    pub async fn status(&self) -> Vec<CommodityStatus> {
        let mut statuses = Vec::with_capacity(Commodity::ALL.len());
        for commodity in Commodity::ALL {
            let baseline = self.baselines.get(commodity);
            let price = self.source.fetch(commodity).await.map(|record| {
                let drop = DropEvaluator::drop_percent(baseline, record.display_price());
                PriceSummary::new(record, baseline, drop)
            });
            let sent = self
                .evaluator
                .thresholds()
                .percents()
                .into_iter()
                .map(|threshold| (threshold, self.ledger.sent_at(commodity, threshold)))
                .collect();

            statuses.push(CommodityStatus {
                commodity,
                baseline,
                pinned: self.baselines.pinned_price(commodity).is_some(),
                stored: self.baselines.stored(commodity).cloned(),
                sent,
                price,
            });
        }
        statuses
    }
}
