use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use clap::ValueEnum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Commodity {
    Gold,
    Silver,
}

impl Commodity {
    pub const ALL: [Commodity; 2] = [Commodity::Gold, Commodity::Silver];

    pub fn as_str(&self) -> &'static str {
        match self {
            Commodity::Gold => "gold",
            Commodity::Silver => "silver",
        }
    }

    /// Upper-case label used in alert titles and status output.
    pub fn label(&self) -> &'static str {
        match self {
            Commodity::Gold => "GOLD",
            Commodity::Silver => "SILVER",
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commodity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gold" => Ok(Commodity::Gold),
            "silver" => Ok(Commodity::Silver),
            other => Err(anyhow!("unknown commodity '{other}'")),
        }
    }
}

/// Latest observation from the price feed for one commodity.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub commodity: Commodity,
    pub product_name: String,
    pub price_with_gst: f64,
    pub price_without_gst: f64,
    pub buy_price: f64,
    pub sell_price: f64,
    pub updated_at: String,
}

impl PriceRecord {
    /// All comparisons are made against the tax-inclusive price.
    pub fn display_price(&self) -> f64 {
        self.price_with_gst
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub record: PriceRecord,
    pub baseline: Option<f64>,
    pub drop_percent: Option<f64>,
}

impl PriceSummary {
    pub fn new(record: PriceRecord, baseline: Option<f64>, drop_percent: Option<f64>) -> Self {
        Self {
            record,
            baseline,
            drop_percent,
        }
    }

    pub fn current_price(&self) -> f64 {
        self.record.display_price()
    }

    /// "down 12.50%" / "up 3.10%" relative to the baseline.
    pub fn change_label(&self) -> Option<String> {
        self.drop_percent.map(|drop| {
            let direction = if drop > 0.0 { "down" } else { "up" };
            format!("{direction} {:.2}%", drop.abs())
        })
    }
}

/// A rendered threshold-crossing alert handed to the notification channels.
#[derive(Debug, Clone)]
pub struct Alert {
    pub commodity: Commodity,
    pub threshold: u32,
    pub summary: PriceSummary,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(commodity: Commodity, threshold: u32, summary: PriceSummary) -> Self {
        Self {
            commodity,
            threshold,
            summary,
            timestamp: Utc::now(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} Price Alert: {}% Drop!", self.commodity.label(), self.threshold)
    }

    /// Plain-text body shared by the SMS, console and Telegram channels.
    pub fn message(&self) -> String {
        let summary = &self.summary;
        let mut lines = vec![
            format!("{} price dropped {}%!", self.commodity.label(), self.threshold),
            format!("Current: ₹{:.2}", summary.current_price()),
        ];
        if let Some(baseline) = summary.baseline {
            lines.push(format!("Baseline: ₹{baseline:.2}"));
        }
        if let Some(drop) = summary.drop_percent {
            lines.push(format!("Drop: {drop:.2}%"));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
pub(crate) fn sample_record(commodity: Commodity, price: f64) -> PriceRecord {
    PriceRecord {
        commodity,
        product_name: format!("Aura Digital {} 24K", commodity.label()),
        price_with_gst: price,
        price_without_gst: price / 1.03,
        buy_price: price / 1.03,
        sell_price: price / 1.03 * 0.98,
        updated_at: "2026-10-17T09:30:00Z".to_string(),
    }
}
