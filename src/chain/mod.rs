//! Chain adapters: per-family upstream clients behind one async trait
//!
//! Every fetch returns a [`Sourced`] value carrying its provenance. An
//! adapter tries its primary upstream once, then its secondary (if any)
//! once, then falls back to deterministic synthetic data. No retries.

pub mod bitcoin;
pub mod detect;
pub mod evm;
pub mod registry;
pub mod solana;
pub mod synthetic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::types::{Balance, ChainInfo, DataProvenance, Transaction};

/// A fetched value together with where it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub provenance: DataProvenance,
}

impl<T> Sourced<T> {
    pub fn primary(value: T) -> Self {
        Self {
            value,
            provenance: DataProvenance::Primary,
        }
    }

    pub fn secondary(value: T) -> Self {
        Self {
            value,
            provenance: DataProvenance::Secondary,
        }
    }

    pub fn synthetic(value: T) -> Self {
        Self {
            value,
            provenance: DataProvenance::Synthetic,
        }
    }
}

/// One blockchain data source. Implementations own their HTTP clients
/// and endpoint configuration; the registry hands them out by chain.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Metadata for the chain this adapter serves
    fn chain_info(&self) -> &ChainInfo;

    /// Structural validity of an address for this chain
    fn validate_address(&self, address: &str) -> bool;

    /// Current native balance
    async fn fetch_balance(&self, address: &str) -> Result<Sourced<Balance>>;

    /// Recent transaction history, newest first, at most `limit` entries
    async fn fetch_transactions(&self, address: &str, limit: usize)
        -> Result<Sourced<Vec<Transaction>>>;

    /// Token transfer history where the chain has one; empty otherwise
    async fn fetch_token_transfers(
        &self,
        _address: &str,
        _limit: usize,
    ) -> Result<Sourced<Vec<Transaction>>> {
        Ok(Sourced::primary(Vec::new()))
    }
}

/// Run the primary fetch, then the secondary, then synthesize.
///
/// Each rung is attempted exactly once; failures are logged and the
/// ladder moves on. The synthetic rung is infallible by construction.
pub(crate) async fn fallback<T, P, S, PFut, SFut>(
    what: &'static str,
    chain: &ChainInfo,
    primary: P,
    secondary: Option<S>,
    synthesize: impl FnOnce() -> T,
) -> Sourced<T>
where
    P: FnOnce() -> PFut,
    S: FnOnce() -> SFut,
    PFut: std::future::Future<Output = Result<T>>,
    SFut: std::future::Future<Output = Result<T>>,
{
    match primary().await {
        Ok(value) => return Sourced::primary(value),
        Err(e) => {
            warn!(chain = %chain.kind, what, error = %e, "primary source failed");
        }
    }

    if let Some(secondary) = secondary {
        match secondary().await {
            Ok(value) => return Sourced::secondary(value),
            Err(e) => {
                warn!(chain = %chain.kind, what, error = %e, "secondary source failed");
            }
        }
    }

    warn!(chain = %chain.kind, what, "all sources failed, using synthetic data");
    Sourced::synthetic(synthesize())
}
