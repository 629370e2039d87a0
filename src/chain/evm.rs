//! EVM chain adapter
//!
//! One adapter instance per EVM chain, all speaking the Etherscan v2
//! multi-chain API as the primary source. Balance lookups fall back to a
//! plain JSON-RPC `eth_getBalance` when an endpoint is configured for the
//! chain; history has no real secondary and degrades straight to
//! synthetic data.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::chain::{detect, fallback, synthetic, ChainAdapter, Sourced};
use crate::error::{Error, Result};
use crate::types::{scaled, Balance, ChainInfo, ChainKind, Transaction, TxKind, TxStatus};

const ETHERSCAN_V2_API: &str = "https://api.etherscan.io/v2/api";

pub struct EvmAdapter {
    info: ChainInfo,
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    /// Optional JSON-RPC endpoint, used as the secondary balance source
    rpc_url: Option<String>,
}

impl EvmAdapter {
    pub fn new(
        chain: ChainKind,
        client: reqwest::Client,
        api_key: String,
        rpc_url: Option<String>,
    ) -> Self {
        Self {
            info: chain.info(),
            client,
            api_base: ETHERSCAN_V2_API.to_string(),
            api_key,
            rpc_url,
        }
    }

    async fn scan_balance(&self, address: &str) -> Result<Balance> {
        let chain_id = self.info.chain_id.to_string();
        let response: ScanResponse<String> = self
            .client
            .get(&self.api_base)
            .query(&[
                ("chainid", chain_id.as_str()),
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "1" {
            return Err(Error::Upstream(format!(
                "explorer balance lookup: {}",
                response.message
            )));
        }

        let amount = scaled(&response.result, self.info.decimals)
            .ok_or_else(|| Error::Upstream("non-numeric balance from explorer".to_string()))?;

        Ok(Balance {
            amount,
            symbol: self.info.symbol.clone(),
            usd_value: 0.0,
            fetched_at: Utc::now(),
        })
    }

    /// `eth_getBalance` against the configured RPC endpoint
    async fn rpc_balance(&self, address: &str) -> Result<Balance> {
        let url = self
            .rpc_url
            .as_deref()
            .ok_or_else(|| Error::AdapterUnavailable {
                chain: self.info.kind,
                reason: "no RPC endpoint configured".to_string(),
            })?;

        let response: RpcResponse = self
            .client
            .post(url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "eth_getBalance",
                "params": [address, "latest"],
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hex = response
            .result
            .ok_or_else(|| Error::Upstream("RPC balance call returned no result".to_string()))?;
        let wei = parse_hex_quantity(&hex)
            .ok_or_else(|| Error::Upstream(format!("unparseable RPC balance {hex}")))?;

        Ok(Balance {
            amount: BigDecimal::new(wei, self.info.decimals as i64),
            symbol: self.info.symbol.clone(),
            usd_value: 0.0,
            fetched_at: Utc::now(),
        })
    }

    async fn scan_transactions(&self, address: &str, limit: usize) -> Result<Vec<Transaction>> {
        let entries = self.scan_list(address, "txlist", limit).await?;
        Ok(entries
            .iter()
            .filter_map(|e| self.map_entry(e, false))
            .collect())
    }

    async fn scan_token_transfers(&self, address: &str, limit: usize) -> Result<Vec<Transaction>> {
        let entries = self.scan_list(address, "tokentx", limit).await?;
        Ok(entries
            .iter()
            .filter_map(|e| self.map_entry(e, true))
            .collect())
    }

    async fn scan_list(
        &self,
        address: &str,
        action: &str,
        limit: usize,
    ) -> Result<Vec<ScanTx>> {
        let chain_id = self.info.chain_id.to_string();
        let offset = limit.to_string();
        let response: ScanResponse<serde_json::Value> = self
            .client
            .get(&self.api_base)
            .query(&[
                ("chainid", chain_id.as_str()),
                ("module", "account"),
                ("action", action),
                ("address", address),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // "No transactions found" comes back with status "0" and an empty
        // result array; that's a valid empty history, not a failure.
        if response.status != "1" {
            if response.result.as_array().is_some_and(|a| a.is_empty()) {
                return Ok(Vec::new());
            }
            return Err(Error::Upstream(format!(
                "explorer {action} lookup: {}",
                response.message
            )));
        }

        serde_json::from_value(response.result).map_err(Error::from)
    }

    fn map_entry(&self, entry: &ScanTx, token: bool) -> Option<Transaction> {
        let timestamp = entry
            .time_stamp
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))?;

        let decimals = if token {
            entry
                .token_decimal
                .as_deref()
                .and_then(|d| d.parse::<u8>().ok())
                .unwrap_or(18)
        } else {
            self.info.decimals
        };
        let value = scaled(&entry.value, decimals)?;

        let status = if entry.is_error.as_deref() == Some("1") {
            TxStatus::Failed
        } else {
            TxStatus::Success
        };

        let kind = if token {
            TxKind::Token
        } else if entry
            .input
            .as_deref()
            .is_some_and(|i| !i.is_empty() && i != "0x")
        {
            TxKind::Contract
        } else {
            TxKind::Transfer
        };

        let gas_used = entry.gas_used.as_deref().and_then(|g| g.parse::<u64>().ok());
        let fee = gas_used.zip(
            entry
                .gas_price
                .as_deref()
                .and_then(|p| p.parse::<u64>().ok()),
        ).map(|(gas, price)| {
            BigDecimal::new(BigInt::from(gas) * BigInt::from(price), self.info.decimals as i64)
        });

        Some(Transaction {
            hash: entry.hash.clone(),
            block_height: entry.block_number.parse().unwrap_or(0),
            timestamp,
            from: entry.from.clone(),
            to: entry.to.clone(),
            value,
            currency: if token {
                entry
                    .token_symbol
                    .clone()
                    .unwrap_or_else(|| "TOKEN".to_string())
            } else {
                self.info.symbol.clone()
            },
            status,
            kind,
            fee,
            gas_used,
        })
    }
}

fn parse_hex_quantity(hex: &str) -> Option<BigInt> {
    let stripped = hex.strip_prefix("0x").unwrap_or(hex);
    BigInt::parse_bytes(stripped.as_bytes(), 16)
}

#[async_trait::async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain_info(&self) -> &ChainInfo {
        &self.info
    }

    fn validate_address(&self, address: &str) -> bool {
        detect::validate(address, self.info.kind)
    }

    async fn fetch_balance(&self, address: &str) -> Result<Sourced<Balance>> {
        let secondary = self.rpc_url.is_some().then_some(|| self.rpc_balance(address));
        Ok(fallback(
            "balance",
            &self.info,
            || self.scan_balance(address),
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
        Ok(fallback(
            "history",
            &self.info,
            || self.scan_transactions(address, limit),
            None::<fn() -> std::future::Ready<Result<Vec<Transaction>>>>,
            || synthetic::transactions(address, &self.info, limit),
        )
        .await)
    }

    async fn fetch_token_transfers(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Sourced<Vec<Transaction>>> {
        Ok(fallback(
            "token-transfers",
            &self.info,
            || self.scan_token_transfers(address, limit),
            None::<fn() -> std::future::Ready<Result<Vec<Transaction>>>>,
            || {
                synthetic::transactions(address, &self.info, limit)
                    .into_iter()
                    .filter(|t| t.kind == TxKind::Token)
                    .collect()
            },
        )
        .await)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScanResponse<T> {
    status: String,
    #[serde(default)]
    message: String,
    result: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanTx {
    hash: String,
    block_number: String,
    time_stamp: String,
    from: String,
    #[serde(default)]
    to: String,
    value: String,
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    is_error: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    gas_price: Option<String>,
    #[serde(default)]
    token_symbol: Option<String>,
    #[serde(default)]
    token_decimal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::ToPrimitive;

    fn adapter() -> EvmAdapter {
        EvmAdapter::new(
            ChainKind::Ethereum,
            reqwest::Client::new(),
            String::new(),
            None,
        )
    }

    fn entry(value: &str) -> ScanTx {
        ScanTx {
            hash: "0xabc".to_string(),
            block_number: "19000000".to_string(),
            time_stamp: "1700000000".to_string(),
            from: "0x1111111111111111111111111111111111111111".to_string(),
            to: "0x2222222222222222222222222222222222222222".to_string(),
            value: value.to_string(),
            input: Some("0x".to_string()),
            is_error: Some("0".to_string()),
            gas_used: Some("21000".to_string()),
            gas_price: Some("20000000000".to_string()),
            token_symbol: None,
            token_decimal: None,
        }
    }

    #[test]
    fn maps_plain_transfer() {
        let tx = adapter().map_entry(&entry("1500000000000000000"), false).unwrap();
        assert_eq!(tx.kind, TxKind::Transfer);
        assert_eq!(tx.status, TxStatus::Success);
        assert_eq!(tx.value.to_f64().unwrap(), 1.5);
        assert_eq!(tx.gas_used, Some(21_000));
        // 21000 * 20 gwei = 0.00042 ETH
        assert_eq!(tx.fee.unwrap().to_f64().unwrap(), 0.00042);
    }

    #[test]
    fn contract_call_detected_from_input() {
        let mut e = entry("0");
        e.input = Some("0xa9059cbb0000".to_string());
        let tx = adapter().map_entry(&e, false).unwrap();
        assert_eq!(tx.kind, TxKind::Contract);
    }

    #[test]
    fn failed_flag_maps_to_status() {
        let mut e = entry("0");
        e.is_error = Some("1".to_string());
        let tx = adapter().map_entry(&e, false).unwrap();
        assert_eq!(tx.status, TxStatus::Failed);
    }

    #[test]
    fn token_entry_uses_token_decimals() {
        let mut e = entry("2500000");
        e.token_symbol = Some("USDC".to_string());
        e.token_decimal = Some("6".to_string());
        let tx = adapter().map_entry(&e, true).unwrap();
        assert_eq!(tx.kind, TxKind::Token);
        assert_eq!(tx.currency, "USDC");
        assert_eq!(tx.value.to_f64().unwrap(), 2.5);
    }

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_hex_quantity("0x0"), Some(BigInt::from(0)));
        assert_eq!(
            parse_hex_quantity("0xde0b6b3a7640000"),
            Some(BigInt::from(1_000_000_000_000_000_000u64))
        );
        assert_eq!(parse_hex_quantity("0xzz"), None);
    }

    #[test]
    fn validates_evm_addresses() {
        let a = adapter();
        assert!(a.validate_address("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"));
        assert!(!a.validate_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
    }
}
