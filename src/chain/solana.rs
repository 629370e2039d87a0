//! Solana chain adapter
//!
//! Single JSON-RPC endpoint, no secondary. `getSignaturesForAddress`
//! gives signature-level history only; amounts and counterparties are
//! not resolved (that would need one `getTransaction` per signature),
//! so Solana history carries zero values with failure status intact.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::chain::{detect, fallback, synthetic, ChainAdapter, Sourced};
use crate::error::{Error, Result};
use crate::types::{
    scaled_u64, Balance, ChainInfo, ChainKind, Transaction, TxKind, TxStatus,
};

pub struct SolanaAdapter {
    info: ChainInfo,
    client: reqwest::Client,
    rpc_url: String,
}

impl SolanaAdapter {
    pub fn new(client: reqwest::Client, rpc_url: String) -> Self {
        Self {
            info: ChainKind::Solana.info(),
            client,
            rpc_url,
        }
    }

    async fn rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let response: RpcEnvelope<T> = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(Error::Upstream(format!("{method}: {}", err.message)));
        }
        response
            .result
            .ok_or_else(|| Error::Upstream(format!("{method}: empty result")))
    }

    async fn rpc_balance(&self, address: &str) -> Result<Balance> {
        let result: BalanceResult = self.rpc("getBalance", json!([address])).await?;
        Ok(Balance {
            amount: scaled_u64(result.value, self.info.decimals),
            symbol: self.info.symbol.clone(),
            usd_value: 0.0,
            fetched_at: Utc::now(),
        })
    }

    async fn rpc_signatures(&self, address: &str, limit: usize) -> Result<Vec<Transaction>> {
        let sigs: Vec<SignatureInfo> = self
            .rpc(
                "getSignaturesForAddress",
                json!([address, { "limit": limit }]),
            )
            .await?;

        Ok(sigs
            .iter()
            .map(|s| Transaction {
                hash: s.signature.clone(),
                block_height: s.slot,
                timestamp: s
                    .block_time
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                    .unwrap_or_else(Utc::now),
                from: address.to_string(),
                to: "unknown".to_string(),
                value: scaled_u64(0, self.info.decimals),
                currency: self.info.symbol.clone(),
                status: if s.err.is_some() {
                    TxStatus::Failed
                } else {
                    TxStatus::Success
                },
                kind: TxKind::Transfer,
                fee: None,
                gas_used: None,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl ChainAdapter for SolanaAdapter {
    fn chain_info(&self) -> &ChainInfo {
        &self.info
    }

    fn validate_address(&self, address: &str) -> bool {
        detect::validate(address, ChainKind::Solana)
    }

    async fn fetch_balance(&self, address: &str) -> Result<Sourced<Balance>> {
        Ok(fallback(
            "balance",
            &self.info,
            || self.rpc_balance(address),
            None::<fn() -> std::future::Ready<Result<Balance>>>,
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
            || self.rpc_signatures(address, limit),
            None::<fn() -> std::future::Ready<Result<Vec<Transaction>>>>,
            || synthetic::transactions(address, &self.info, limit),
        )
        .await)
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResult {
    value: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureInfo {
    signature: String,
    slot: u64,
    #[serde(default)]
    block_time: Option<i64>,
    #[serde(default)]
    err: Option<serde_json::Value>,
}
