//! Address classification
//!
//! Structural pattern matching only; no checksum validation. Ties between
//! chains sharing an alphabet (Bitcoin legacy Base58 vs Solana Base58) are
//! broken by a fixed priority order plus length/leading-character checks.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::types::{ChainKind, ClassifiedAddress};

static BTC_LEGACY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[13][a-km-zA-HJ-NP-Z1-9]{25,34}$").unwrap());
static BTC_BECH32: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bc1[a-z0-9]{39,59}$").unwrap());
static BTC_P2SH_COMPAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^2[a-km-zA-HJ-NP-Z1-9]{25,34}$").unwrap());
static SOLANA_BASE58: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").unwrap());
static EVM_HEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());

/// Classify a raw address string into its most likely chain.
///
/// A `0x` hex address could belong to any EVM chain; Ethereum is reported
/// at reduced confidence and explicit-chain callers can override.
pub fn classify(address: &str) -> Result<ClassifiedAddress> {
    let trimmed = address.trim();

    if let Some(found) = classify_exact(trimmed) {
        return Ok(found);
    }

    if let Some(found) = classify_relaxed(trimmed) {
        return Ok(found);
    }

    Err(Error::UnrecognizedAddress(address.to_string()))
}

/// First pass: exact structural patterns
fn classify_exact(address: &str) -> Option<ClassifiedAddress> {
    // Bitcoin first: a 32-34 character Base58 string with leading '1' or
    // '3' also satisfies the Solana pattern, and the priority order plus
    // the length threshold settle that tie in Bitcoin's favor.
    if BTC_BECH32.is_match(address) || BTC_LEGACY.is_match(address) {
        return Some(hit(address, ChainKind::Bitcoin, 0.95));
    }

    if BTC_P2SH_COMPAT.is_match(address) {
        return Some(hit(address, ChainKind::Bitcoin, 0.9));
    }

    if SOLANA_BASE58.is_match(address) {
        return Some(hit(address, ChainKind::Solana, 0.95));
    }

    if EVM_HEX.is_match(address) {
        return Some(hit(address, ChainKind::Ethereum, 0.7));
    }

    None
}

/// Second pass: case-normalized near-misses at reduced confidence
fn classify_relaxed(address: &str) -> Option<ClassifiedAddress> {
    let lowered = address.to_lowercase();

    if BTC_BECH32.is_match(&lowered) {
        return Some(hit(address, ChainKind::Bitcoin, 0.9));
    }

    if EVM_HEX.is_match(&lowered) {
        return Some(hit(address, ChainKind::Ethereum, 0.6));
    }

    None
}

fn hit(address: &str, chain: ChainKind, confidence: f64) -> ClassifiedAddress {
    ClassifiedAddress {
        address: address.to_string(),
        chain,
        confidence,
    }
}

/// Check whether an address is structurally valid for a specific chain
pub fn validate(address: &str, chain: ChainKind) -> bool {
    let trimmed = address.trim();
    match chain {
        ChainKind::Bitcoin => {
            BTC_LEGACY.is_match(trimmed)
                || BTC_BECH32.is_match(trimmed)
                || BTC_P2SH_COMPAT.is_match(trimmed)
        }
        ChainKind::Solana => SOLANA_BASE58.is_match(trimmed),
        // All EVM chains share the address format
        _ => EVM_HEX.is_match(trimmed),
    }
}
