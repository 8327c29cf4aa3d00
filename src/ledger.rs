use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::domain::Commodity;
use crate::store::StateStore;
use crate::timestamp::LenientTime;

/// Per commodity, per threshold: when the alert last went out, or `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerDocument {
    #[serde(deserialize_with = "deserialize_alerts")]
    pub alerts: BTreeMap<Commodity, BTreeMap<u32, Option<DateTime<Utc>>>>,
}

fn deserialize_alerts<'de, D>(deserializer: D) -> Result<BTreeMap<Commodity, BTreeMap<u32, Option<DateTime<Utc>>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<Commodity, BTreeMap<u32, Option<LenientTime>>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(commodity, levels)| {
            let levels = levels.into_iter().map(|(level, at)| (level, at.map(|at| at.0))).collect();
            (commodity, levels)
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    Commodity(Commodity),
    All,
}

impl From<Option<Commodity>> for ResetScope {
    fn from(commodity: Option<Commodity>) -> Self {
        commodity.map_or(ResetScope::All, ResetScope::Commodity)
    }
}

/// Remembers which threshold alerts were delivered since the last rebase or reset.
pub struct AlertLedger {
    store: Box<dyn StateStore<LedgerDocument>>,
    doc: LedgerDocument,
    levels: Vec<u32>,
}

impl AlertLedger {
    pub fn new(store: Box<dyn StateStore<LedgerDocument>>, levels: Vec<u32>) -> Self {
        let doc = store.load();
        Self { store, doc, levels }
    }

    pub fn was_sent(&self, commodity: Commodity, threshold: u32) -> bool {
        self.sent_at(commodity, threshold).is_some()
    }

    pub fn sent_at(&self, commodity: Commodity, threshold: u32) -> Option<DateTime<Utc>> {
        self.doc
            .alerts
            .get(&commodity)
            .and_then(|levels| levels.get(&threshold))
            .copied()
            .flatten()
    }

    pub fn mark_sent(&mut self, commodity: Commodity, threshold: u32) -> Result<()> {
        let mut next = self.doc.clone();
        next.alerts
            .entry(commodity)
            .or_insert_with(|| self.blank())
            .insert(threshold, Some(Utc::now()));
        self.store.save(&next)?;
        self.doc = next;
        Ok(())
    }

    pub fn reset(&mut self, scope: ResetScope) -> Result<()> {
        let mut next = self.doc.clone();
        match scope {
            ResetScope::Commodity(commodity) => {
                next.alerts.insert(commodity, self.blank());
            }
            ResetScope::All => {
                next.alerts = Commodity::ALL.iter().map(|c| (*c, self.blank())).collect();
            }
        }
        self.store.save(&next)?;
        self.doc = next;

        match scope {
            ResetScope::Commodity(commodity) => info!("🔄 Alert state reset for {}", commodity),
            ResetScope::All => info!("🔄 Alert state reset for all commodities"),
        }
        Ok(())
    }

    fn blank(&self) -> BTreeMap<u32, Option<DateTime<Utc>>> {
        self.levels.iter().map(|level| (*level, None)).collect()
    }
}
