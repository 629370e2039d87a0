//! Bitcoin chain adapter
//!
//! Esplora (Blockstream-style) is the primary source for both balance and
//! history; BlockCypher is the secondary. UTXO transactions are flattened
//! to a from/to/value view relative to the investigated address: an
//! address appearing in any input makes the transaction outbound.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::chain::{detect, fallback, synthetic, ChainAdapter, Sourced};
use crate::error::Result;
use crate::types::{
    scaled_u64, Balance, ChainInfo, ChainKind, Transaction, TxKind, TxStatus,
};

pub struct BitcoinAdapter {
    info: ChainInfo,
    client: reqwest::Client,
    esplora_url: String,
    /// Empty base URL disables the BlockCypher rung
    blockcypher_url: String,
    blockcypher_token: String,
}

impl BitcoinAdapter {
    pub fn new(
        client: reqwest::Client,
        esplora_url: String,
        blockcypher_url: String,
        blockcypher_token: String,
    ) -> Self {
        Self {
            info: ChainKind::Bitcoin.info(),
            client,
            esplora_url,
            blockcypher_url,
            blockcypher_token,
        }
    }

    async fn esplora_balance(&self, address: &str) -> Result<Balance> {
        let stats: EsploraAddress = self
            .client
            .get(format!("{}/address/{}", self.esplora_url, address))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let sats = stats
            .chain_stats
            .funded_txo_sum
            .saturating_sub(stats.chain_stats.spent_txo_sum);

        Ok(Balance {
            amount: scaled_u64(sats, self.info.decimals),
            symbol: self.info.symbol.clone(),
            usd_value: 0.0,
            fetched_at: Utc::now(),
        })
    }

    async fn esplora_transactions(&self, address: &str, limit: usize) -> Result<Vec<Transaction>> {
        let txs: Vec<EsploraTx> = self
            .client
            .get(format!("{}/address/{}/txs", self.esplora_url, address))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(txs
            .iter()
            .take(limit)
            .map(|tx| self.map_esplora_tx(address, tx))
            .collect())
    }

    fn map_esplora_tx(&self, address: &str, tx: &EsploraTx) -> Transaction {
        let outbound = tx.vin.iter().any(|i| {
            i.prevout
                .as_ref()
                .is_some_and(|p| p.scriptpubkey_address.as_deref() == Some(address))
        });

        let (from, to, sats) = if outbound {
            let spent: u64 = tx
                .vout
                .iter()
                .filter(|o| o.scriptpubkey_address.as_deref() != Some(address))
                .map(|o| o.value)
                .sum();
            let dest = tx
                .vout
                .iter()
                .find(|o| o.scriptpubkey_address.as_deref() != Some(address))
                .and_then(|o| o.scriptpubkey_address.clone())
                .unwrap_or_else(|| "unknown".to_string());
            (address.to_string(), dest, spent)
        } else {
            let received: u64 = tx
                .vout
                .iter()
                .filter(|o| o.scriptpubkey_address.as_deref() == Some(address))
                .map(|o| o.value)
                .sum();
            let origin = tx
                .vin
                .iter()
                .filter_map(|i| i.prevout.as_ref())
                .filter_map(|p| p.scriptpubkey_address.clone())
                .next()
                .unwrap_or_else(|| "unknown".to_string());
            (origin, address.to_string(), received)
        };

        let timestamp = tx
            .status
            .block_time
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);

        Transaction {
            hash: tx.txid.clone(),
            block_height: tx.status.block_height.unwrap_or(0),
            timestamp,
            from,
            to,
            value: scaled_u64(sats, self.info.decimals),
            currency: self.info.symbol.clone(),
            status: if tx.status.confirmed {
                TxStatus::Success
            } else {
                TxStatus::Pending
            },
            kind: TxKind::Transfer,
            fee: Some(scaled_u64(tx.fee, self.info.decimals)),
            gas_used: None,
        }
    }

    fn blockcypher_enabled(&self) -> bool {
        !self.blockcypher_url.is_empty()
    }

    fn blockcypher_addr_url(&self, address: &str, suffix: &str) -> String {
        let mut url = format!(
            "{}/btc/main/addrs/{}{}",
            self.blockcypher_url, address, suffix
        );
        if !self.blockcypher_token.is_empty() {
            url.push_str(&format!("?token={}", self.blockcypher_token));
        }
        url
    }

    async fn blockcypher_balance(&self, address: &str) -> Result<Balance> {
        let body: BlockCypherBalance = self
            .client
            .get(self.blockcypher_addr_url(address, "/balance"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Balance {
            amount: scaled_u64(body.final_balance, self.info.decimals),
            symbol: self.info.symbol.clone(),
            usd_value: 0.0,
            fetched_at: Utc::now(),
        })
    }

    /// BlockCypher txrefs only carry per-address deltas, so counterparties
    /// come back as "unknown"
    async fn blockcypher_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let body: BlockCypherAddress = self
            .client
            .get(self.blockcypher_addr_url(address, ""))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body
            .txrefs
            .iter()
            .take(limit)
            .map(|r| {
                let outbound = r.tx_input_n >= 0;
                let (from, to) = if outbound {
                    (address.to_string(), "unknown".to_string())
                } else {
                    ("unknown".to_string(), address.to_string())
                };
                Transaction {
                    hash: r.tx_hash.clone(),
                    block_height: r.block_height.max(0) as u64,
                    timestamp: r.confirmed.unwrap_or_else(Utc::now),
                    from,
                    to,
                    value: scaled_u64(r.value, self.info.decimals),
                    currency: self.info.symbol.clone(),
                    status: TxStatus::Success,
                    kind: TxKind::Transfer,
                    fee: None,
                    gas_used: None,
                }
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl ChainAdapter for BitcoinAdapter {
    fn chain_info(&self) -> &ChainInfo {
        &self.info
    }

    fn validate_address(&self, address: &str) -> bool {
        detect::validate(address, ChainKind::Bitcoin)
    }

    async fn fetch_balance(&self, address: &str) -> Result<Sourced<Balance>> {
        let secondary = self
            .blockcypher_enabled()
            .then_some(|| self.blockcypher_balance(address));
        Ok(fallback(
            "balance",
            &self.info,
            || self.esplora_balance(address),
            secondary,
            || synthetic::balance(address, &self.info),
        )
        .await)
    }

    async fn fetch_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Sourced<Vec<Transaction>>> {
        let secondary = self
            .blockcypher_enabled()
            .then_some(|| self.blockcypher_transactions(address, limit));
        Ok(fallback(
            "history",
            &self.info,
            || self.esplora_transactions(address, limit),
            secondary,
            || synthetic::transactions(address, &self.info, limit),
        )
        .await)
    }
}

#[derive(Debug, Deserialize)]
struct EsploraAddress {
    chain_stats: EsploraStats,
}

#[derive(Debug, Deserialize)]
struct EsploraStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraTx {
    txid: String,
    status: EsploraTxStatus,
    vin: Vec<EsploraVin>,
    vout: Vec<EsploraVout>,
    #[serde(default)]
    fee: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraTxStatus {
    confirmed: bool,
    #[serde(default)]
    block_height: Option<u64>,
    #[serde(default)]
    block_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EsploraVin {
    #[serde(default)]
    prevout: Option<EsploraVout>,
}

#[derive(Debug, Deserialize)]
struct EsploraVout {
    #[serde(default)]
    scriptpubkey_address: Option<String>,
    #[serde(default)]
    value: u64,
}

#[derive(Debug, Deserialize)]
struct BlockCypherBalance {
    final_balance: u64,
}

#[derive(Debug, Deserialize)]
struct BlockCypherAddress {
    #[serde(default)]
    txrefs: Vec<BlockCypherTxRef>,
}

#[derive(Debug, Deserialize)]
struct BlockCypherTxRef {
    tx_hash: String,
    #[serde(default)]
    block_height: i64,
    #[serde(default)]
    confirmed: Option<DateTime<Utc>>,
    value: u64,
    #[serde(default = "neg_one")]
    tx_input_n: i64,
}

fn neg_one() -> i64 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::ToPrimitive;

    const ADDR: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
    const OTHER: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    fn adapter() -> BitcoinAdapter {
        BitcoinAdapter::new(
            reqwest::Client::new(),
            "https://esplora.example".to_string(),
            String::new(),
            String::new(),
        )
    }

    fn vout(addr: &str, value: u64) -> EsploraVout {
        EsploraVout {
            scriptpubkey_address: Some(addr.to_string()),
            value,
        }
    }

    #[test]
    fn inbound_tx_sums_outputs_to_address() {
        let tx = EsploraTx {
            txid: "t1".to_string(),
            status: EsploraTxStatus {
                confirmed: true,
                block_height: Some(800_000),
                block_time: Some(1_700_000_000),
            },
            vin: vec![EsploraVin {
                prevout: Some(vout(OTHER, 200_000_000)),
            }],
            vout: vec![vout(ADDR, 150_000_000), vout(OTHER, 49_000_000)],
            fee: 1_000_000,
        };

        let mapped = adapter().map_esplora_tx(ADDR, &tx);
        assert_eq!(mapped.from, OTHER);
        assert_eq!(mapped.to, ADDR);
        assert_eq!(mapped.value.to_f64().unwrap(), 1.5);
        assert_eq!(mapped.status, TxStatus::Success);
    }

    #[test]
    fn outbound_tx_excludes_change() {
        let tx = EsploraTx {
            txid: "t2".to_string(),
            status: EsploraTxStatus {
                confirmed: true,
                block_height: Some(800_001),
                block_time: Some(1_700_000_600),
            },
            vin: vec![EsploraVin {
                prevout: Some(vout(ADDR, 300_000_000)),
            }],
            // 2 BTC out, 0.9 BTC change back
            vout: vec![vout(OTHER, 200_000_000), vout(ADDR, 90_000_000)],
            fee: 10_000_000,
        };

        let mapped = adapter().map_esplora_tx(ADDR, &tx);
        assert_eq!(mapped.from, ADDR);
        assert_eq!(mapped.to, OTHER);
        assert_eq!(mapped.value.to_f64().unwrap(), 2.0);
        assert_eq!(mapped.fee.unwrap().to_f64().unwrap(), 0.1);
    }

    #[test]
    fn unconfirmed_tx_is_pending() {
        let tx = EsploraTx {
            txid: "t3".to_string(),
            status: EsploraTxStatus {
                confirmed: false,
                block_height: None,
                block_time: None,
            },
            vin: vec![],
            vout: vec![vout(ADDR, 1_000)],
            fee: 100,
        };
        let mapped = adapter().map_esplora_tx(ADDR, &tx);
        assert_eq!(mapped.status, TxStatus::Pending);
        assert_eq!(mapped.block_height, 0);
    }

    #[test]
    fn validates_bitcoin_addresses_only() {
        let a = adapter();
        assert!(a.validate_address(ADDR));
        assert!(a.validate_address(OTHER));
        assert!(!a.validate_address("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"));
    }
}
