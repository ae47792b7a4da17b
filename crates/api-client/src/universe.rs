use crate::error::ApiError;
use crate::responses::CoinMarket;
use async_trait::async_trait;
use std::collections::HashSet;

/// Supplies the set of base assets to scan.
#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// Returns up to `limit` base assets (upper case), minus the denylist.
    async fn list_symbols(&self, limit: usize) -> Result<Vec<String>, ApiError>;
}

/// Top coins by market capitalisation from CoinGecko.
pub struct CoinGeckoUniverse {
    client: reqwest::Client,
    url: String,
    denylist: HashSet<String>,
}

impl CoinGeckoUniverse {
    pub fn new(client: reqwest::Client, url: impl Into<String>, denylist: &[String]) -> Self {
        Self {
            client,
            url: url.into(),
            denylist: denylist.iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

/// Upper-cases, drops denylisted assets and de-duplicates while keeping rank order.
pub fn filter_universe(markets: Vec<CoinMarket>, denylist: &HashSet<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    markets
        .into_iter()
        .filter(|m| !denylist.contains(&m.symbol.to_lowercase()))
        .map(|m| m.symbol.to_uppercase())
        .filter(|s| seen.insert(s.clone()))
        .take(limit)
        .collect()
}

#[async_trait]
impl UniverseSource for CoinGeckoUniverse {
    async fn list_symbols(&self, limit: usize) -> Result<Vec<String>, ApiError> {
        tracing::info!(limit, "Fetching top coins by market cap");
        let markets: Vec<CoinMarket> = self
            .client
            .get(&self.url)
            .query(&[
                ("vs_currency", "usd".to_string()),
                ("order", "market_cap_desc".to_string()),
                // CoinGecko caps a page at 250 entries.
                ("per_page", limit.clamp(1, 250).to_string()),
                ("page", "1".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(filter_universe(markets, &self.denylist, limit))
    }
}
