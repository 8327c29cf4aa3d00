use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{Commodity, PriceRecord};
use crate::error::FetchError;

pub const DEFAULT_FEED_URL: &str = "https://auragold.netlify.app/api/prices";

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest observation for `commodity`, or `None` when the feed could not supply one.
    async fn fetch(&self, commodity: Commodity) -> Option<PriceRecord>;
}

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    product_name: String,
    price_with_gst: f64,
    price_without_gst: f64,
    aura_buy_price: f64,
    aura_sell_price: f64,
    updated_at: String,
}

pub struct AuraPriceFeed {
    client: reqwest::Client,
    base_url: String,
}

impl AuraPriceFeed {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn try_fetch(&self, commodity: Commodity) -> Result<PriceRecord, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("metal", commodity.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        parse_feed(commodity, &body)
    }
}

#[async_trait]
impl PriceSource for AuraPriceFeed {
    async fn fetch(&self, commodity: Commodity) -> Option<PriceRecord> {
        match self.try_fetch(commodity).await {
            Ok(record) => {
                debug!("Fetched {} at ₹{:.2}", commodity, record.display_price());
                Some(record)
            }
            Err(e) => {
                warn!("⚠️  Could not fetch {} price: {}", commodity, e);
                None
            }
        }
    }
}

/// Decodes the feed envelope and keeps the last (most recent) observation.
fn parse_feed(commodity: Commodity, body: &str) -> Result<PriceRecord, FetchError> {
    let envelope: FeedEnvelope = serde_json::from_str(body)?;
    if !envelope.success {
        return Err(FetchError::Unsuccessful);
    }

    let latest = envelope.data.into_iter().last().ok_or(FetchError::EmptyFeed)?;
    Ok(PriceRecord {
        commodity,
        product_name: latest.product_name,
        price_with_gst: latest.price_with_gst,
        price_without_gst: latest.price_without_gst,
        buy_price: latest.aura_buy_price,
        sell_price: latest.aura_sell_price,
        updated_at: latest.updated_at,
    })
}
