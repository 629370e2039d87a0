//! Core data model for wallet investigations
//!
//! Native-unit amounts are `BigDecimal` built exactly from raw integer
//! units (wei/satoshi/lamport); USD values are display-grade snapshots
//! where 0.0 means "unknown".

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::fund_flow::FundFlow;
use crate::analysis::opinion::WalletOpinion;
use crate::analysis::risk::RiskAssessment;
use crate::analysis::stats::TransactionAnalysis;

/// Supported blockchains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    Bitcoin,
    Ethereum,
    Binance,
    Polygon,
    Avalanche,
    Arbitrum,
    Optimism,
    Base,
    Solana,
}

/// Address/transaction model shared by a group of chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    /// UTXO-based (Bitcoin)
    Utxo,
    /// EVM account model with gas
    Evm,
    /// Non-EVM account model (Solana)
    Account,
}

impl ChainKind {
    pub const ALL: [ChainKind; 9] = [
        ChainKind::Bitcoin,
        ChainKind::Ethereum,
        ChainKind::Binance,
        ChainKind::Polygon,
        ChainKind::Avalanche,
        ChainKind::Arbitrum,
        ChainKind::Optimism,
        ChainKind::Base,
        ChainKind::Solana,
    ];

    pub fn family(self) -> ChainFamily {
        match self {
            ChainKind::Bitcoin => ChainFamily::Utxo,
            ChainKind::Solana => ChainFamily::Account,
            _ => ChainFamily::Evm,
        }
    }

    /// Stable lowercase identifier used in config keys and CLI arguments
    pub fn id(self) -> &'static str {
        match self {
            ChainKind::Bitcoin => "bitcoin",
            ChainKind::Ethereum => "ethereum",
            ChainKind::Binance => "binance",
            ChainKind::Polygon => "polygon",
            ChainKind::Avalanche => "avalanche",
            ChainKind::Arbitrum => "arbitrum",
            ChainKind::Optimism => "optimism",
            ChainKind::Base => "base",
            ChainKind::Solana => "solana",
        }
    }

    pub fn from_id(id: &str) -> Option<ChainKind> {
        ChainKind::ALL.iter().copied().find(|c| c.id() == id)
    }

    /// Static per-chain metadata, declared once
    pub fn info(self) -> ChainInfo {
        let (name, symbol, chain_id, explorer_url, decimals) = match self {
            ChainKind::Bitcoin => ("Bitcoin", "BTC", 0, "https://blockstream.info", 8),
            ChainKind::Ethereum => ("Ethereum", "ETH", 1, "https://etherscan.io", 18),
            ChainKind::Binance => ("Binance Smart Chain", "BNB", 56, "https://bscscan.com", 18),
            ChainKind::Polygon => ("Polygon", "MATIC", 137, "https://polygonscan.com", 18),
            ChainKind::Avalanche => ("Avalanche", "AVAX", 43114, "https://snowtrace.io", 18),
            ChainKind::Arbitrum => ("Arbitrum One", "ARB", 42161, "https://arbiscan.io", 18),
            ChainKind::Optimism => ("Optimism", "OP", 10, "https://optimistic.etherscan.io", 18),
            ChainKind::Base => ("Base", "ETH", 8453, "https://basescan.org", 18),
            ChainKind::Solana => ("Solana", "SOL", 101, "https://explorer.solana.com", 9),
        };
        ChainInfo {
            kind: self,
            name: name.to_string(),
            symbol: symbol.to_string(),
            chain_id,
            explorer_url: explorer_url.to_string(),
            decimals,
            family: self.family(),
        }
    }
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Chain metadata attached to investigation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub kind: ChainKind,
    pub name: String,
    pub symbol: String,
    pub chain_id: u64,
    pub explorer_url: String,
    pub decimals: u8,
    pub family: ChainFamily,
}

/// Where the data for an investigation actually came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProvenance {
    /// Primary upstream source answered
    Primary,
    /// Primary failed, configured secondary answered
    Secondary,
    /// All real sources failed; deterministic placeholder data
    Synthetic,
}

impl DataProvenance {
    pub fn is_degraded(self) -> bool {
        self == DataProvenance::Synthetic
    }

    /// The worse of two provenances (synthetic dominates)
    pub fn worst(self, other: DataProvenance) -> DataProvenance {
        self.max(other)
    }
}

/// A classified wallet address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedAddress {
    pub address: String,
    pub chain: ChainKind,
    /// Pattern-match confidence in [0, 1]
    pub confidence: f64,
}

/// Native balance snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    /// Native-unit amount, exact
    pub amount: BigDecimal,
    pub symbol: String,
    /// USD snapshot; 0.0 when the price lookup failed
    pub usd_value: f64,
    pub fetched_at: DateTime<Utc>,
}

impl Balance {
    pub fn zero(symbol: &str) -> Self {
        Self {
            amount: BigDecimal::from(0),
            symbol: symbol.to_string(),
            usd_value: 0.0,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Transfer,
    Contract,
    Token,
    Other,
}

/// One externally-sourced transaction. Core fields are immutable facts;
/// the pipeline only derives metadata alongside them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
    pub from: String,
    pub to: String,
    pub value: BigDecimal,
    pub currency: String,
    pub status: TxStatus,
    pub kind: TxKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
}

impl Transaction {
    /// Native value as f64 for statistics; exact representation stays in `value`
    pub fn value_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or(0.0)
    }
}

/// Convert raw integer units into an exact native-unit decimal,
/// e.g. `scaled("1500000000", 9)` == 1.5 SOL
pub fn scaled(raw: &str, decimals: u8) -> Option<BigDecimal> {
    let int: BigInt = raw.parse().ok()?;
    Some(BigDecimal::new(int, decimals as i64))
}

/// Same, from an unsigned integer amount
pub fn scaled_u64(raw: u64, decimals: u8) -> BigDecimal {
    BigDecimal::new(BigInt::from(raw), decimals as i64)
}

/// The aggregate root: one investigation per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInvestigation {
    pub address: String,
    pub chain: ChainKind,
    pub chain_info: ChainInfo,
    pub classification_confidence: f64,
    pub balance: Balance,
    pub transactions: Vec<Transaction>,
    pub analysis: TransactionAnalysis,
    pub fund_flows: Vec<FundFlow>,
    pub risk: RiskAssessment,
    pub opinion: WalletOpinion,
    /// True when any fetch fell through to synthetic data
    pub degraded: bool,
    pub data_source: DataProvenance,
    pub investigated_at: DateTime<Utc>,
}
