use crate::chains::{Chain, CHAIN_SPECS};
use crate::config::PriceConfig;
use crate::error::PriceError;
use log::warn;
use once_cell::sync::Lazy;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Comma-joined, deduplicated asset ids for the batched price request.
static ASSET_IDS: Lazy<String> = Lazy::new(|| {
    let mut ids: Vec<&str> = CHAIN_SPECS.iter().map(|spec| spec.price_asset).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.join(",")
});

/// USD prices for the native assets of the supported chains, captured once
/// per poll cycle. A missing entry means "unknown", never zero.
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    usd_by_asset: HashMap<String, f64>,
}

impl PriceSnapshot {
    /// Snapshot with every price unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: &str, usd: f64) {
        self.usd_by_asset.insert(asset.to_string(), usd);
    }

    /// USD price of one native unit on `chain`, if known this cycle.
    pub fn usd(&self, chain: Chain) -> Option<f64> {
        self.usd_by_asset.get(chain.spec().price_asset).copied()
    }
}

/// Best-effort USD price feed (CoinGecko simple/price shape). One batched
/// lookup per poll cycle; failures degrade to an empty snapshot.
pub struct PriceOracle {
    client: Client,
    api_base: String,
}

impl PriceOracle {
    pub fn from_config(config: &PriceConfig) -> Result<Self, PriceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// Fetch the cycle's price snapshot. Never fails: on any upstream
    /// problem the snapshot simply has all entries unknown.
    pub async fn refresh(&self) -> PriceSnapshot {
        match self.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("price refresh failed, USD amounts unavailable this cycle: {}", e);
                PriceSnapshot::empty()
            }
        }
    }

    async fn fetch(&self) -> Result<PriceSnapshot, PriceError> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.api_base, *ASSET_IDS
        );
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::Status(status.as_u16()));
        }

        // { "<asset>": { "usd": <f64> }, ... } — missing assets are valid.
        let body: HashMap<String, HashMap<String, f64>> = response.json().await?;

        let mut snapshot = PriceSnapshot::empty();
        for (asset, quotes) in body {
            if let Some(usd) = quotes.get("usd") {
                snapshot.insert(&asset, *usd);
            }
        }
        Ok(snapshot)
    }
}
