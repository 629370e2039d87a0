//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub chains: ChainsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub price: PriceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Outbound HTTP client settings shared by all chain adapters
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout; the fallback ladder never retries a timed-out call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bounded in-flight connections per upstream host
    #[serde(default = "default_max_conns_per_host")]
    pub max_connections_per_host: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_connections_per_host: default_max_conns_per_host(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}
fn default_max_conns_per_host() -> usize {
    4
}
fn default_user_agent() -> String {
    concat!("chainsleuth/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Upstream data-source endpoints and keys, per chain family
#[derive(Debug, Clone, Deserialize)]
pub struct ChainsConfig {
    /// Etherscan-compatible API key shared by the EVM explorers
    #[serde(default)]
    pub etherscan_api_key: String,

    /// Esplora-style Bitcoin API (primary)
    #[serde(default = "default_esplora_url")]
    pub esplora_url: String,

    /// BlockCypher Bitcoin API (secondary); empty base URL disables it
    #[serde(default = "default_blockcypher_url")]
    pub blockcypher_url: String,
    #[serde(default)]
    pub blockcypher_token: String,

    /// Solana JSON-RPC endpoint
    #[serde(default = "default_solana_rpc")]
    pub solana_rpc_url: String,

    /// Optional JSON-RPC endpoints per EVM chain (keyed by chain id,
    /// e.g. "ethereum"); used as the secondary balance source
    #[serde(default)]
    pub evm_rpc: HashMap<String, String>,
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self {
            etherscan_api_key: String::new(),
            esplora_url: default_esplora_url(),
            blockcypher_url: default_blockcypher_url(),
            blockcypher_token: String::new(),
            solana_rpc_url: default_solana_rpc(),
            evm_rpc: HashMap::new(),
        }
    }
}

fn default_esplora_url() -> String {
    "https://blockstream.info/api".to_string()
}
fn default_blockcypher_url() -> String {
    "https://api.blockcypher.com/v1".to_string()
}
fn default_solana_rpc() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

/// Pipeline-wide analysis settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Default transaction-history window when the request doesn't set one
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
    /// Hard ceiling a request may ask for
    #[serde(default = "default_transaction_ceiling")]
    pub transaction_ceiling: usize,
    #[serde(default)]
    pub risk: RiskConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_transactions: default_max_transactions(),
            transaction_ceiling: default_transaction_ceiling(),
            risk: RiskConfig::default(),
        }
    }
}

fn default_max_transactions() -> usize {
    500
}
fn default_transaction_ceiling() -> usize {
    10_000
}

/// Risk-heuristic thresholds. These are policy knobs, not verified
/// calibrations; defaults match the long-standing upstream values.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Native-unit amount above which a transfer counts as "large"
    #[serde(default = "default_rapid_transfer_amount")]
    pub rapid_transfer_amount: f64,
    /// More than this many large transfers flags rapid-large-transfers
    #[serde(default = "default_rapid_transfer_count")]
    pub rapid_transfer_count: usize,

    /// Mixing pattern: unique counterparties above this...
    #[serde(default = "default_mixing_min_counterparties")]
    pub mixing_min_counterparties: usize,
    /// ...combined with a mean transfer value below this
    #[serde(default = "default_mixing_max_avg_value")]
    pub mixing_max_avg_value: f64,

    /// Pump-and-dump: share of >100-unit transactions above this fraction
    #[serde(default = "default_pump_dump_large_share")]
    pub pump_dump_large_share: f64,

    /// Wash trading: any single counterparty seen more than this often
    #[serde(default = "default_wash_trade_interactions")]
    pub wash_trade_interactions: usize,

    /// Risk factor thresholds
    #[serde(default = "default_high_frequency_per_day")]
    pub high_frequency_per_day: f64,
    #[serde(default = "default_large_value_max")]
    pub large_value_max: f64,
    #[serde(default = "default_exchange_activity_count")]
    pub exchange_activity_count: usize,
    #[serde(default = "default_forex_activity_count")]
    pub forex_activity_count: usize,
    #[serde(default = "default_defi_activity_count")]
    pub defi_activity_count: usize,
    #[serde(default = "default_gas_inefficiency_ratio")]
    pub gas_inefficiency_ratio: f64,
    #[serde(default = "default_counterparty_diversity")]
    pub counterparty_diversity: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            rapid_transfer_amount: default_rapid_transfer_amount(),
            rapid_transfer_count: default_rapid_transfer_count(),
            mixing_min_counterparties: default_mixing_min_counterparties(),
            mixing_max_avg_value: default_mixing_max_avg_value(),
            pump_dump_large_share: default_pump_dump_large_share(),
            wash_trade_interactions: default_wash_trade_interactions(),
            high_frequency_per_day: default_high_frequency_per_day(),
            large_value_max: default_large_value_max(),
            exchange_activity_count: default_exchange_activity_count(),
            forex_activity_count: default_forex_activity_count(),
            defi_activity_count: default_defi_activity_count(),
            gas_inefficiency_ratio: default_gas_inefficiency_ratio(),
            counterparty_diversity: default_counterparty_diversity(),
        }
    }
}

fn default_rapid_transfer_amount() -> f64 {
    10_000.0
}
fn default_rapid_transfer_count() -> usize {
    3
}
fn default_mixing_min_counterparties() -> usize {
    50
}
fn default_mixing_max_avg_value() -> f64 {
    0.1
}
fn default_pump_dump_large_share() -> f64 {
    0.2
}
fn default_wash_trade_interactions() -> usize {
    20
}
fn default_high_frequency_per_day() -> f64 {
    20.0
}
fn default_large_value_max() -> f64 {
    50_000.0
}
fn default_exchange_activity_count() -> usize {
    10
}
fn default_forex_activity_count() -> usize {
    5
}
fn default_defi_activity_count() -> usize {
    20
}
fn default_gas_inefficiency_ratio() -> f64 {
    5.0
}
fn default_counterparty_diversity() -> usize {
    100
}

/// Price-lookup settings
#[derive(Debug, Clone, Deserialize)]
pub struct PriceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_coingecko_url")]
    pub coingecko_url: String,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            coingecko_url: default_coingecko_url(),
        }
    }
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

/// Where finished investigations get written (optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Directory for JSON investigation files; unset disables persistence
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix CHAINSLEUTH_)
            .add_source(
                config::Environment::with_prefix("CHAINSLEUTH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be positive");
        }

        if self.analysis.max_transactions == 0 {
            anyhow::bail!("analysis.max_transactions must be positive");
        }

        if self.analysis.max_transactions > self.analysis.transaction_ceiling {
            anyhow::bail!(
                "analysis.max_transactions ({}) exceeds transaction_ceiling ({})",
                self.analysis.max_transactions,
                self.analysis.transaction_ceiling
            );
        }

        let share = self.analysis.risk.pump_dump_large_share;
        if !(share > 0.0 && share <= 1.0) {
            anyhow::bail!("analysis.risk.pump_dump_large_share must be in (0, 1]");
        }

        Ok(())
    }

    /// Build the shared outbound HTTP client from this configuration
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.http.timeout_secs))
            .pool_max_idle_per_host(self.http.max_connections_per_host)
            .user_agent(self.http.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")
    }
}
