//! Transaction statistics
//!
//! Aggregates a wallet's history into totals, distributions, temporal
//! histograms, counterparty rankings and anomaly flags. Values are
//! native units as f64; exact decimals stay on the transactions
//! themselves.

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{ChainFamily, Transaction, TxKind, TxStatus};

/// Reference gas cost of a plain EVM transfer
const BASE_TRANSFER_GAS: f64 = 21_000.0;

/// Monday first, matching the weekday histogram
const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Index of the largest nonzero bucket; first wins on ties
fn argmax(histogram: &[u32]) -> Option<usize> {
    let (idx, &max) = histogram
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
    (max > 0).then_some(idx)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionAnalysis {
    pub total_transactions: usize,
    pub sent_count: usize,
    pub received_count: usize,
    pub failed_count: usize,
    pub contract_count: usize,
    pub token_count: usize,

    /// Sums and means in native units; min/median over positive values
    pub total_value: f64,
    pub total_fees: f64,
    pub avg_value: f64,
    pub max_value: f64,
    pub min_value: f64,
    pub median_value: f64,
    /// Transactions per active day (span between first and last seen)
    pub avg_per_day: f64,

    pub value_distribution: ValueDistribution,

    /// Histogram over UTC hour of day (24 buckets)
    pub hourly: Vec<u32>,
    /// Histogram over day of week, Monday first (7 buckets)
    pub weekday: Vec<u32>,
    /// Histogram over calendar month (12 buckets)
    pub monthly: Vec<u32>,

    /// Busiest UTC hour and weekday name; first wins on ties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_active_hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_active_day: Option<String>,

    pub unique_counterparties: usize,
    /// Top 10 by interaction count; ties broken by total value
    pub top_counterparties: Vec<Counterparty>,
    /// Distinct sender (`from`) and recipient (`to`) addresses seen
    pub outgoing_address_count: usize,
    pub incoming_address_count: usize,

    pub total_gas_used: u64,
    /// Transactions burning over 100k gas
    pub high_gas_transactions: usize,
    /// Mean gas per tx relative to a plain transfer; EVM chains only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_efficiency: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<chrono::DateTime<chrono::Utc>>,

    /// Human-readable anomaly flags with an aggregate score in [0, 100]
    pub flags: Vec<String>,
    pub flag_score: f64,
}

/// Bucketed distribution of positive transaction values (native units)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDistribution {
    pub up_to_0_001: u32,
    pub up_to_0_01: u32,
    pub up_to_0_1: u32,
    pub up_to_1: u32,
    pub up_to_10: u32,
    pub up_to_100: u32,
    pub over_100: u32,
}

impl ValueDistribution {
    fn record(&mut self, value: f64) {
        // Zero-value entries (approvals, signature-only records) are skipped
        if value <= 0.0 {
            return;
        }
        if value <= 0.001 {
            self.up_to_0_001 += 1;
        } else if value <= 0.01 {
            self.up_to_0_01 += 1;
        } else if value <= 0.1 {
            self.up_to_0_1 += 1;
        } else if value <= 1.0 {
            self.up_to_1 += 1;
        } else if value <= 10.0 {
            self.up_to_10 += 1;
        } else if value <= 100.0 {
            self.up_to_100 += 1;
        } else {
            self.over_100 += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterparty {
    pub address: String,
    pub count: u32,
    pub total_value: f64,
}

/// Compute the full statistics block for one wallet's history
pub fn analyze(address: &str, txs: &[Transaction], family: ChainFamily) -> TransactionAnalysis {
    let mut out = TransactionAnalysis {
        total_transactions: txs.len(),
        hourly: vec![0; 24],
        weekday: vec![0; 7],
        monthly: vec![0; 12],
        ..Default::default()
    };

    if txs.is_empty() {
        return out;
    }

    let mut counterparties: HashMap<String, (u32, f64)> = HashMap::new();
    let mut senders: HashSet<String> = HashSet::new();
    let mut recipients: HashSet<String> = HashSet::new();
    let mut positive_values: Vec<f64> = Vec::new();
    let mut gas_samples: usize = 0;
    let mut large_transfers = 0usize;

    for tx in txs {
        let value = tx.value_f64();
        let outbound = tx.from.eq_ignore_ascii_case(address);

        if outbound {
            out.sent_count += 1;
        } else {
            out.received_count += 1;
        }
        match tx.status {
            TxStatus::Failed => out.failed_count += 1,
            TxStatus::Success | TxStatus::Pending => {}
        }
        match tx.kind {
            TxKind::Contract => out.contract_count += 1,
            TxKind::Token => out.token_count += 1,
            TxKind::Transfer | TxKind::Other => {}
        }

        out.total_value += value;
        out.max_value = out.max_value.max(value);
        if value > 0.0 {
            positive_values.push(value);
        }
        if value > 100.0 {
            large_transfers += 1;
        }
        if let Some(fee) = &tx.fee {
            out.total_fees += bigdecimal::ToPrimitive::to_f64(fee).unwrap_or(0.0);
        }
        if let Some(gas) = tx.gas_used {
            out.total_gas_used += gas;
            gas_samples += 1;
            if gas > 100_000 {
                out.high_gas_transactions += 1;
            }
        }

        out.value_distribution.record(value);

        out.hourly[tx.timestamp.hour() as usize] += 1;
        out.weekday[tx.timestamp.weekday().num_days_from_monday() as usize] += 1;
        out.monthly[tx.timestamp.month0() as usize] += 1;

        let other = if outbound { &tx.to } else { &tx.from };
        if !other.is_empty() && !other.eq_ignore_ascii_case(address) && other != "unknown" {
            let entry = counterparties.entry(other.to_lowercase()).or_default();
            entry.0 += 1;
            entry.1 += value;
        }
        if !tx.from.is_empty() {
            senders.insert(tx.from.to_lowercase());
        }
        if !tx.to.is_empty() {
            recipients.insert(tx.to.to_lowercase());
        }

        out.first_seen = Some(match out.first_seen {
            Some(seen) => seen.min(tx.timestamp),
            None => tx.timestamp,
        });
        out.last_seen = Some(match out.last_seen {
            Some(seen) => seen.max(tx.timestamp),
            None => tx.timestamp,
        });
    }

    out.avg_value = out.total_value / txs.len() as f64;

    if !positive_values.is_empty() {
        positive_values.sort_by(f64::total_cmp);
        out.min_value = positive_values[0];
        out.median_value = positive_values[positive_values.len() / 2];
    }

    out.most_active_hour = argmax(&out.hourly).map(|h| h as u32);
    out.most_active_day = argmax(&out.weekday).map(|d| WEEKDAYS[d].to_string());

    if let (Some(first), Some(last)) = (out.first_seen, out.last_seen) {
        let span_days = ((last - first).num_seconds() as f64 / 86_400.0).ceil().max(1.0);
        out.avg_per_day = txs.len() as f64 / span_days;
    }

    out.outgoing_address_count = senders.len();
    out.incoming_address_count = recipients.len();
    out.unique_counterparties = counterparties.len();
    let mut ranked: Vec<Counterparty> = counterparties
        .into_iter()
        .map(|(address, (count, total_value))| Counterparty {
            address,
            count,
            total_value,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(b.total_value.total_cmp(&a.total_value))
            .then(a.address.cmp(&b.address))
    });
    ranked.truncate(10);
    out.top_counterparties = ranked;

    if family == ChainFamily::Evm && gas_samples > 0 {
        out.fee_efficiency =
            Some(out.total_gas_used as f64 / gas_samples as f64 / BASE_TRANSFER_GAS);
    }

    let (flags, flag_score) = flag_anomalies(&out, large_transfers);
    out.flags = flags;
    out.flag_score = flag_score;

    out
}

/// Threshold-based anomaly flags; the score is the capped sum of the
/// per-flag weights and feeds the risk assessment
fn flag_anomalies(analysis: &TransactionAnalysis, large_transfers: usize) -> (Vec<String>, f64) {
    let mut flags = Vec::new();
    let mut score: f64 = 0.0;

    if analysis.total_transactions > 100 {
        flags.push("High Transaction Frequency".to_string());
        score += 20.0;
    }
    if large_transfers > 5 {
        flags.push("Large Value Transfers".to_string());
        score += 15.0;
    }
    if analysis.failed_count > 10 {
        flags.push("Multiple Failed Transactions".to_string());
        score += 10.0;
    }
    if analysis.contract_count > 20 {
        flags.push("Heavy Contract Interaction".to_string());
        score += 5.0;
    }
    if analysis.token_count > 50 {
        flags.push("High Token Transfer Activity".to_string());
        score += 10.0;
    }

    (flags, score.min(100.0))
}
