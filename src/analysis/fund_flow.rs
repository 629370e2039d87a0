//! Fund flow tracing
//!
//! Labels each transaction's counterparty against known entity name
//! fragments (exchanges, forex brokers, banks, DeFi protocols) and
//! reduces the history to a directed flow list plus a summary. Matching
//! is case-insensitive substring over the counterparty string; real
//! deployments feed labeled addresses through the same path.

use serde::{Deserialize, Serialize};

use crate::types::Transaction;

// Checked in priority order; the first category that matches wins
const EXCHANGE_LABELS: &[&str] = &[
    "binance",
    "coinbase",
    "kraken",
    "kucoin",
    "huobi",
    "okx",
    "bybit",
    "bitfinex",
    "gemini",
    "ftx",
    "crypto.com",
    "robinhood",
    "webull",
];
// Two-letter broker fragments (ig, xm) are omitted: as substrings they
// match far too many unrelated counterparty strings
const FOREX_LABELS: &[&str] = &[
    "oanda",
    "fxcm",
    "saxo",
    "dukascopy",
    "pepperstone",
    "avatrade",
    "fxpro",
    "icmarkets",
    "fbs",
    "hotforex",
    "octafx",
];
const BANK_LABELS: &[&str] = &["bank", "fiat", "usd", "eur", "gbp", "wire", "ach", "sepa"];
const DEFI_LABELS: &[&str] = &[
    "uniswap",
    "sushiswap",
    "pancakeswap",
    "curve",
    "aave",
    "compound",
    "maker",
    "yearn",
    "balancer",
    "synthetix",
    "dydx",
    "opensea",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowCategory {
    Exchange,
    Forex,
    Bank,
    Defi,
    Unknown,
}

/// One directed movement of funds relative to the investigated wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundFlow {
    pub tx_hash: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub direction: FlowDirection,
    pub counterparty: String,
    /// Native units
    pub amount: f64,
    pub currency: String,
    pub category: FlowCategory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowSummary {
    pub total_incoming: f64,
    pub total_outgoing: f64,
    pub exchange_count: usize,
    pub forex_count: usize,
    pub bank_count: usize,
    pub defi_count: usize,
    pub unknown_count: usize,
    pub largest_flow: f64,
    pub avg_flow: f64,
}

/// Trace all flows for a wallet, newest first
pub fn trace(address: &str, txs: &[Transaction]) -> Vec<FundFlow> {
    let mut flows: Vec<FundFlow> = txs
        .iter()
        .map(|tx| {
            let outbound = tx.from.eq_ignore_ascii_case(address);
            let counterparty = if outbound { &tx.to } else { &tx.from };
            FundFlow {
                tx_hash: tx.hash.clone(),
                timestamp: tx.timestamp,
                direction: if outbound {
                    FlowDirection::Outgoing
                } else {
                    FlowDirection::Incoming
                },
                counterparty: counterparty.clone(),
                amount: tx.value_f64(),
                currency: tx.currency.clone(),
                category: categorize(counterparty),
            }
        })
        .collect();

    flows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.tx_hash.cmp(&b.tx_hash)));
    flows
}

/// First matching category in priority order
pub fn categorize(counterparty: &str) -> FlowCategory {
    let lowered = counterparty.to_lowercase();
    let matches = |labels: &[&str]| labels.iter().any(|l| lowered.contains(l));

    if matches(EXCHANGE_LABELS) {
        FlowCategory::Exchange
    } else if matches(FOREX_LABELS) {
        FlowCategory::Forex
    } else if matches(BANK_LABELS) {
        FlowCategory::Bank
    } else if matches(DEFI_LABELS) {
        FlowCategory::Defi
    } else {
        FlowCategory::Unknown
    }
}

pub fn summarize(flows: &[FundFlow]) -> FlowSummary {
    let mut summary = FlowSummary::default();
    for flow in flows {
        match flow.direction {
            FlowDirection::Incoming => summary.total_incoming += flow.amount,
            FlowDirection::Outgoing => summary.total_outgoing += flow.amount,
        }
        match flow.category {
            FlowCategory::Exchange => summary.exchange_count += 1,
            FlowCategory::Forex => summary.forex_count += 1,
            FlowCategory::Bank => summary.bank_count += 1,
            FlowCategory::Defi => summary.defi_count += 1,
            FlowCategory::Unknown => summary.unknown_count += 1,
        }
        summary.largest_flow = summary.largest_flow.max(flow.amount);
    }
    if !flows.is_empty() {
        summary.avg_flow = (summary.total_incoming + summary.total_outgoing) / flows.len() as f64;
    }
    summary
}
