//! CLI command implementations

use anyhow::{anyhow, Result};
use tracing::{error, info};

use crate::chain::detect;
use crate::config::Config;
use crate::investigate::{InvestigateOptions, Investigator};
use crate::types::ChainKind;

/// Investigate one or more wallet addresses
pub async fn investigate(
    config: &Config,
    addresses: &[String],
    chain: Option<&str>,
    max_transactions: Option<usize>,
    include_token_transfers: bool,
    pretty: bool,
) -> Result<()> {
    if addresses.is_empty() {
        return Err(anyhow!("at least one address is required"));
    }

    let chain = chain
        .map(|id| {
            ChainKind::from_id(id)
                .ok_or_else(|| anyhow!("unknown chain '{id}', see `chains` for the list"))
        })
        .transpose()?;

    let investigator = Investigator::from_config(config)?;
    let options = InvestigateOptions {
        max_transactions,
        include_token_transfers,
    };

    let mut failures = 0usize;
    if let [address] = addresses {
        // Single address: print the report alone, fail loudly
        let report = match chain {
            Some(chain) => investigator.investigate_on(chain, address, &options).await,
            None => investigator.investigate(address, &options).await,
        }?;
        print_json(&report, pretty)?;
        return Ok(());
    }

    let results = match chain {
        Some(chain) => {
            let mut out = Vec::with_capacity(addresses.len());
            for address in addresses {
                out.push((
                    address.clone(),
                    investigator.investigate_on(chain, address, &options).await,
                ));
            }
            out
        }
        None => investigator.investigate_many(addresses, &options).await,
    };

    for (address, result) in results {
        match result {
            Ok(report) => print_json(&report, pretty)?,
            Err(e) => {
                failures += 1;
                error!(address, code = e.code(), "investigation failed: {e}");
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{failures} of {} investigations failed", addresses.len()));
    }
    Ok(())
}

/// Classify an address without fetching anything
pub fn validate(address: &str) -> Result<()> {
    match detect::classify(address) {
        Ok(found) => {
            let info = found.chain.info();
            println!(
                "{} -> {} ({}) confidence {:.2}",
                found.address, info.name, info.symbol, found.confidence
            );
            Ok(())
        }
        Err(e) => Err(anyhow!("{e}")),
    }
}

/// List supported chains and their metadata
pub fn chains(config: &Config) -> Result<()> {
    let investigator = Investigator::from_config(config)?;
    for chain in investigator.supported_chains() {
        let info = chain.info();
        println!(
            "{:<12} {:<22} {:>6}  decimals {:>2}  {}",
            chain.id(),
            info.name,
            info.symbol,
            info.decimals,
            info.explorer_url
        );
    }
    Ok(())
}

/// Show the resolved configuration with secrets masked
pub fn show_config(config: &Config) -> Result<()> {
    info!("Resolved configuration:");
    println!("http.timeout_secs = {}", config.http.timeout_secs);
    println!(
        "http.max_connections_per_host = {}",
        config.http.max_connections_per_host
    );
    println!("chains.etherscan_api_key = {}", mask(&config.chains.etherscan_api_key));
    println!("chains.esplora_url = {}", config.chains.esplora_url);
    println!("chains.blockcypher_url = {}", config.chains.blockcypher_url);
    println!(
        "chains.blockcypher_token = {}",
        mask(&config.chains.blockcypher_token)
    );
    println!("chains.solana_rpc_url = {}", config.chains.solana_rpc_url);
    for (chain, url) in &config.chains.evm_rpc {
        println!("chains.evm_rpc.{chain} = {url}");
    }
    println!("analysis.max_transactions = {}", config.analysis.max_transactions);
    println!(
        "analysis.transaction_ceiling = {}",
        config.analysis.transaction_ceiling
    );
    println!("price.enabled = {}", config.price.enabled);
    println!("price.coingecko_url = {}", config.price.coingecko_url);
    println!(
        "storage.dir = {}",
        config.storage.dir.as_deref().unwrap_or("(disabled)")
    );
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let body = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{body}");
    Ok(())
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else if secret.len() <= 8 {
        "****".to_string()
    } else {
        format!("{}****{}", &secret[..4], &secret[secret.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_hides_the_middle() {
        assert_eq!(mask(""), "(not set)");
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("ABCD1234EFGH5678"), "ABCD****5678");
    }

    #[test]
    fn validate_accepts_known_formats() {
        assert!(validate("0x742d35Cc6634C0532925a3b844Bc454e4438f44e").is_ok());
        assert!(validate("not-an-address").is_err());
    }
}
