use std::collections::BTreeMap;

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::Commodity;
use crate::store::StateStore;
use crate::timestamp::LenientTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub price: f64,
    pub set_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BaselineLayout")]
pub struct BaselineDocument {
    pub baselines: BTreeMap<Commodity, BaselineEntry>,
}

/// On-disk shapes: the keyed layout written here, or the flat
/// `{"gold": .., "silver": .., "set_at": ..}` layout with one shared timestamp.
#[derive(Deserialize)]
#[serde(untagged)]
enum BaselineLayout {
    Keyed {
        baselines: BTreeMap<Commodity, StoredEntry>,
    },
    Flat(FlatBaselines),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FlatBaselines {
    gold: Option<f64>,
    silver: Option<f64>,
    set_at: Option<LenientTime>,
}

#[derive(Deserialize)]
struct StoredEntry {
    price: f64,
    set_at: LenientTime,
}

impl From<BaselineLayout> for BaselineDocument {
    fn from(layout: BaselineLayout) -> Self {
        let baselines = match layout {
            BaselineLayout::Keyed { baselines } => baselines
                .into_iter()
                .map(|(commodity, entry)| {
                    let entry = BaselineEntry {
                        price: entry.price,
                        set_at: entry.set_at.0,
                    };
                    (commodity, entry)
                })
                .collect(),
            BaselineLayout::Flat(FlatBaselines { gold, silver, set_at }) => {
                let set_at = set_at.map(|at| at.0).unwrap_or_default();
                [(Commodity::Gold, gold), (Commodity::Silver, silver)]
                    .into_iter()
                    .filter_map(|(commodity, price)| {
                        let price = price.filter(|price| *price > 0.0)?;
                        Some((commodity, BaselineEntry { price, set_at }))
                    })
                    .collect()
            }
        };
        Self { baselines }
    }
}

/// Reference prices that drops are measured against.
///
/// A positive pinned price (from configuration) shadows the stored value on
/// reads. Writes always go to storage, so a later unpin exposes whatever the
/// coordinator rebased to in the meantime.
pub struct BaselineStore {
    store: Box<dyn StateStore<BaselineDocument>>,
    doc: BaselineDocument,
    pinned: BTreeMap<Commodity, f64>,
}

impl BaselineStore {
    pub fn new(store: Box<dyn StateStore<BaselineDocument>>, pinned: BTreeMap<Commodity, f64>) -> Self {
        let doc = store.load();
        Self { store, doc, pinned }
    }

    pub fn get(&self, commodity: Commodity) -> Option<f64> {
        if let Some(price) = self.pinned_price(commodity) {
            return Some(price);
        }
        self.doc.baselines.get(&commodity).map(|entry| entry.price)
    }

    pub fn pinned_price(&self, commodity: Commodity) -> Option<f64> {
        self.pinned.get(&commodity).copied().filter(|price| *price > 0.0)
    }

    pub fn stored(&self, commodity: Commodity) -> Option<&BaselineEntry> {
        self.doc.baselines.get(&commodity)
    }

    /// Persists `price` as the new baseline. Memory is only updated once the write lands.
    pub fn set(&mut self, commodity: Commodity, price: f64) -> Result<()> {
        ensure!(price > 0.0, "baseline for {commodity} must be positive, got {price}");

        let mut next = self.doc.clone();
        next.baselines.insert(
            commodity,
            BaselineEntry {
                price,
                set_at: Utc::now(),
            },
        );
        self.store.save(&next)?;
        self.doc = next;

        info!("📌 Baseline set for {}: ₹{:.2}", commodity, price);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::JsonFileStore;
    use tempfile::tempdir;

    fn pins(entries: &[(Commodity, f64)]) -> BTreeMap<Commodity, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn unset_until_first_write() {
        let store = BaselineStore::new(Box::new(MemoryStore::<BaselineDocument>::new()), BTreeMap::new());
        assert_eq!(store.get(Commodity::Gold), None);
        assert!(store.stored(Commodity::Gold).is_none());
    }

    #[test]
    fn set_persists_and_records_time() {
        let memory = MemoryStore::<BaselineDocument>::new();
        let mut store = BaselineStore::new(Box::new(memory.clone()), BTreeMap::new());

        let before = Utc::now();
        store.set(Commodity::Silver, 95.5).unwrap();

        assert_eq!(store.get(Commodity::Silver), Some(95.5));
        assert_eq!(memory.saves(), 1);
        let entry = memory.stored().unwrap().baselines[&Commodity::Silver].clone();
        assert_eq!(entry.price, 95.5);
        assert!(entry.set_at >= before);
    }

    #[test]
    fn pinned_price_shadows_reads_but_not_writes() {
        let memory = MemoryStore::<BaselineDocument>::new();
        let mut store = BaselineStore::new(Box::new(memory.clone()), pins(&[(Commodity::Gold, 2500.0)]));

        store.set(Commodity::Gold, 1800.0).unwrap();

        assert_eq!(store.get(Commodity::Gold), Some(2500.0));
        assert_eq!(store.stored(Commodity::Gold).map(|e| e.price), Some(1800.0));
        assert_eq!(memory.stored().unwrap().baselines[&Commodity::Gold].price, 1800.0);
    }

    #[test]
    fn non_positive_pin_is_ignored() {
        let mut store = BaselineStore::new(Box::new(MemoryStore::<BaselineDocument>::new()), pins(&[(Commodity::Gold, 0.0)]));
        assert_eq!(store.get(Commodity::Gold), None);

        store.set(Commodity::Gold, 2000.0).unwrap();
        assert_eq!(store.get(Commodity::Gold), Some(2000.0));
    }

    #[test]
    fn rejects_non_positive_baseline() {
        let memory = MemoryStore::<BaselineDocument>::new();
        let mut store = BaselineStore::new(Box::new(memory.clone()), BTreeMap::new());
        assert!(store.set(Commodity::Gold, 0.0).is_err());
        assert_eq!(memory.saves(), 0);
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let mut store = BaselineStore::new(Box::new(MemoryStore::<BaselineDocument>::failing()), BTreeMap::new());
        assert!(store.set(Commodity::Gold, 2000.0).is_err());
        assert_eq!(store.get(Commodity::Gold), None);
    }

    #[test]
    fn reads_flat_layout_with_naive_timestamp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline_prices.json");
        std::fs::write(
            &path,
            r#"{"gold": 7210.5, "silver": null, "set_at": "2026-10-01T10:00:00.123456"}"#,
        )
        .unwrap();

        let store = BaselineStore::new(Box::new(JsonFileStore::new(&path)), BTreeMap::new());

        assert_eq!(store.get(Commodity::Gold), Some(7210.5));
        assert_eq!(store.get(Commodity::Silver), None);
        assert_eq!(
            store.stored(Commodity::Gold).map(|e| e.set_at),
            crate::timestamp::parse("2026-10-01T10:00:00.123456")
        );
    }

    #[test]
    fn flat_layout_upgrades_on_next_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline_prices.json");
        std::fs::write(&path, r#"{"gold": 7210.5, "silver": 90.0, "set_at": null}"#).unwrap();

        let mut store = BaselineStore::new(Box::new(JsonFileStore::new(&path)), BTreeMap::new());
        assert_eq!(store.get(Commodity::Silver), Some(90.0));
        store.set(Commodity::Silver, 85.0).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["baselines"]["gold"]["price"], 7210.5);
        assert_eq!(raw["baselines"]["silver"]["price"], 85.0);

        let reopened = BaselineStore::new(Box::new(JsonFileStore::new(&path)), BTreeMap::new());
        assert_eq!(reopened.get(Commodity::Gold), Some(7210.5));
        assert_eq!(reopened.get(Commodity::Silver), Some(85.0));
    }

    #[test]
    fn malformed_keyed_layout_is_not_read_as_flat() {
        let doc: Result<BaselineDocument, _> =
            serde_json::from_str(r#"{"baselines": {"gold": {"price": 7210.5, "set_at": "soon"}}}"#);
        assert!(doc.is_err());
    }

    #[test]
    fn survives_restart_through_file_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline_prices.json");

        let mut store = BaselineStore::new(Box::new(JsonFileStore::new(&path)), BTreeMap::new());
        store.set(Commodity::Gold, 7210.0).unwrap();

        let reopened = BaselineStore::new(Box::new(JsonFileStore::new(&path)), BTreeMap::new());
        assert_eq!(reopened.get(Commodity::Gold), Some(7210.0));
        assert_eq!(reopened.get(Commodity::Silver), None);
    }
}
