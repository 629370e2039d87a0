//! USD price lookups
//!
//! Best effort only: a failed or missing price never fails an
//! investigation, it just leaves the USD snapshot at 0.0.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Spot USD price for a native symbol, `None` when unknown
    async fn usd_price(&self, symbol: &str) -> Result<Option<f64>>;
}

/// CoinGecko simple-price client
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn coin_id(symbol: &str) -> Option<&'static str> {
        match symbol.to_uppercase().as_str() {
            "BTC" => Some("bitcoin"),
            "ETH" => Some("ethereum"),
            "BNB" => Some("binancecoin"),
            "MATIC" => Some("matic-network"),
            "AVAX" => Some("avalanche-2"),
            "ARB" => Some("arbitrum"),
            "OP" => Some("optimism"),
            "SOL" => Some("solana"),
            _ => None,
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn usd_price(&self, symbol: &str) -> Result<Option<f64>> {
        let Some(id) = Self::coin_id(symbol) else {
            return Ok(None);
        };

        let body: Value = self
            .client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[("ids", id), ("vs_currencies", "usd")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.get(id).and_then(|c| c.get("usd")).and_then(Value::as_f64))
    }
}

/// Fixed symbol-to-price table; used when lookups are disabled and in tests
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: HashMap<String, f64>,
}

impl StaticPriceSource {
    pub fn new(prices: HashMap<String, f64>) -> Self {
        Self { prices }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn usd_price(&self, symbol: &str) -> Result<Option<f64>> {
        Ok(self.prices.get(&symbol.to_uppercase()).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_symbols_map_to_coin_ids() {
        assert_eq!(CoinGeckoClient::coin_id("btc"), Some("bitcoin"));
        assert_eq!(CoinGeckoClient::coin_id("SOL"), Some("solana"));
        assert_eq!(CoinGeckoClient::coin_id("DOGE"), None);
    }

    #[tokio::test]
    async fn static_source_answers_from_table() {
        let source = StaticPriceSource::new(HashMap::from([("ETH".to_string(), 3_000.0)]));
        assert_eq!(source.usd_price("eth").await.unwrap(), Some(3_000.0));
        assert_eq!(source.usd_price("BTC").await.unwrap(), None);
        assert_eq!(
            StaticPriceSource::empty().usd_price("ETH").await.unwrap(),
            None
        );
    }
}
