use std::future::Future;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::coordinator::{AlertCoordinator, TickReport};

/// One tick, abandoned if it outlives `limit`.
pub async fn run_tick(coordinator: &mut AlertCoordinator, limit: Duration) -> Option<TickReport> {
    match time::timeout(limit, coordinator.tick()).await {
        Ok(report) => Some(report),
        Err(_) => {
            warn!("⏱️  Tick exceeded {:?}, abandoned until the next interval", limit);
            None
        }
    }
}

/// Ticks immediately, then every `every`, until `shutdown` resolves.
///
/// A shutdown request is honoured between ticks; a tick in flight runs to
/// completion or its timeout.
pub async fn run_every<S, F>(
    coordinator: &mut AlertCoordinator,
    every: Duration,
    tick_limit: Duration,
    shutdown: S,
    mut on_tick: F,
) -> usize
where
    S: Future<Output = ()>,
    F: FnMut(&TickReport),
{
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut ticks = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("👋 Stopping after {} tick(s)", ticks);
                break;
            }
            _ = ticker.tick() => {
                ticks += 1;
                if let Some(report) = run_tick(coordinator, tick_limit).await {
                    on_tick(&report);
                }
            }
        }
    }
    ticks
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;

    use super::*;
    use crate::alert::{DropEvaluator, ThresholdSet};
    use crate::baseline::{BaselineDocument, BaselineStore};
    use crate::domain::{sample_record, Commodity, PriceRecord};
    use crate::ledger::{AlertLedger, LedgerDocument};
    use crate::notifier::NotifierHub;
    use crate::price::PriceSource;
    use crate::store::memory::MemoryStore;

    struct DelayedFeed {
        delay: Duration,
    }

    #[async_trait]
    impl PriceSource for DelayedFeed {
        async fn fetch(&self, commodity: Commodity) -> Option<PriceRecord> {
            time::sleep(self.delay).await;
            Some(sample_record(commodity, 2000.0))
        }
    }

    fn coordinator(delay: Duration) -> AlertCoordinator {
        let thresholds = ThresholdSet::default();
        AlertCoordinator::new(
            Box::new(DelayedFeed { delay }),
            DropEvaluator::new(thresholds.clone()),
            BaselineStore::new(Box::new(MemoryStore::<BaselineDocument>::new()), BTreeMap::new()),
            AlertLedger::new(Box::new(MemoryStore::<LedgerDocument>::new()), thresholds.percents()),
            NotifierHub::new(Vec::new()),
        )
    }

    #[tokio::test]
    async fn tick_within_limit_returns_report() {
        let mut coordinator = coordinator(Duration::from_millis(1));
        let report = run_tick(&mut coordinator, Duration::from_secs(5)).await.expect("report");
        assert_eq!(report.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn slow_tick_is_abandoned() {
        let mut coordinator = coordinator(Duration::from_millis(500));
        assert!(run_tick(&mut coordinator, Duration::from_millis(20)).await.is_none());
    }

    #[tokio::test]
    async fn ticks_immediately_and_repeats_until_shutdown() {
        let mut coordinator = coordinator(Duration::ZERO);
        let mut reports = 0;

        let ticks = run_every(
            &mut coordinator,
            Duration::from_millis(40),
            Duration::from_secs(5),
            time::sleep(Duration::from_millis(150)),
            |_| reports += 1,
        )
        .await;

        assert!(ticks >= 2, "expected repeated ticks, got {ticks}");
        assert_eq!(reports, ticks);
    }

    #[tokio::test]
    async fn immediate_shutdown_still_allows_clean_exit() {
        let mut coordinator = coordinator(Duration::ZERO);
        let ticks = run_every(
            &mut coordinator,
            Duration::from_secs(3600),
            Duration::from_secs(5),
            time::sleep(Duration::from_millis(50)),
            |_| {},
        )
        .await;
        assert_eq!(ticks, 1);
    }
}
