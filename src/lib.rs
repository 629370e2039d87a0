//! Wallet investigation pipeline
//!
//! Classifies an address onto a chain, pulls balance and history from
//! upstream sources with a primary/secondary/synthetic fallback ladder,
//! and reduces the result to statistics, fund flows, a risk assessment
//! and a wallet opinion.

pub mod analysis;
pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod investigate;
pub mod price;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use investigate::{InvestigateOptions, Investigator};
pub use types::WalletInvestigation;
