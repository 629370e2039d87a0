//! Adapter registry
//!
//! Maps a [`ChainKind`] to a shared [`ChainAdapter`]. The orchestrator
//! takes a registry rather than constructing adapters itself, so tests
//! swap in doubles without touching the network.

use std::collections::HashMap;
use std::sync::Arc;

use crate::chain::{bitcoin::BitcoinAdapter, evm::EvmAdapter, solana::SolanaAdapter, ChainAdapter};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{ChainFamily, ChainKind};

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ChainKind, Arc<dyn ChainAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the production registry with one adapter per supported chain
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = config
            .http_client()
            .map_err(|e| Error::Config(e.to_string()))?;

        let mut registry = Self::new();

        registry.register(Arc::new(BitcoinAdapter::new(
            client.clone(),
            config.chains.esplora_url.clone(),
            config.chains.blockcypher_url.clone(),
            config.chains.blockcypher_token.clone(),
        )));

        registry.register(Arc::new(SolanaAdapter::new(
            client.clone(),
            config.chains.solana_rpc_url.clone(),
        )));

        for chain in ChainKind::ALL {
            if chain.family() != ChainFamily::Evm {
                continue;
            }
            let rpc_url = config.chains.evm_rpc.get(chain.id()).cloned();
            registry.register(Arc::new(EvmAdapter::new(
                chain,
                client.clone(),
                config.chains.etherscan_api_key.clone(),
                rpc_url,
            )));
        }

        Ok(registry)
    }

    /// Register (or replace) the adapter for its chain
    pub fn register(&mut self, adapter: Arc<dyn ChainAdapter>) {
        self.adapters.insert(adapter.chain_info().kind, adapter);
    }

    pub fn get(&self, chain: ChainKind) -> Result<Arc<dyn ChainAdapter>> {
        self.adapters
            .get(&chain)
            .cloned()
            .ok_or_else(|| Error::AdapterUnavailable {
                chain,
                reason: "no adapter registered".to_string(),
            })
    }

    /// Chains with a registered adapter, in declaration order
    pub fn supported(&self) -> Vec<ChainKind> {
        ChainKind::ALL
            .into_iter()
            .filter(|c| self.adapters.contains_key(c))
            .collect()
    }
}
