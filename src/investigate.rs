//! Investigation orchestrator
//!
//! Wires the pipeline end to end: classify the address, pick an adapter,
//! fetch balance/history/token transfers concurrently, then run the pure
//! analysis stages over whatever data came back. Degraded data flows
//! through the same path as real data; only the provenance marker
//! differs.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::{fund_flow, opinion, risk, stats};
use crate::chain::detect;
use crate::chain::registry::AdapterRegistry;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::price::{CoinGeckoClient, PriceSource, StaticPriceSource};
use crate::storage::{InvestigationStore, JsonFileStore};
use crate::types::{Balance, ChainKind, ClassifiedAddress, Transaction, WalletInvestigation};

#[derive(Debug, Clone)]
pub struct InvestigateOptions {
    /// History window override; bounded by the configured ceiling
    pub max_transactions: Option<usize>,
    /// Merge token transfers into the history where the chain has them
    pub include_token_transfers: bool,
}

impl Default for InvestigateOptions {
    fn default() -> Self {
        Self {
            max_transactions: None,
            include_token_transfers: true,
        }
    }
}

pub struct Investigator {
    registry: AdapterRegistry,
    price: Arc<dyn PriceSource>,
    store: Option<Arc<dyn InvestigationStore>>,
    config: Config,
}

impl Investigator {
    pub fn new(
        registry: AdapterRegistry,
        price: Arc<dyn PriceSource>,
        store: Option<Arc<dyn InvestigationStore>>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            price,
            store,
            config,
        }
    }

    /// Production wiring from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = AdapterRegistry::from_config(config)?;

        let price: Arc<dyn PriceSource> = if config.price.enabled {
            let client = config
                .http_client()
                .map_err(|e| Error::Config(e.to_string()))?;
            Arc::new(CoinGeckoClient::new(
                client,
                config.price.coingecko_url.clone(),
            ))
        } else {
            Arc::new(StaticPriceSource::empty())
        };

        let store: Option<Arc<dyn InvestigationStore>> = config
            .storage
            .dir
            .as_ref()
            .map(|dir| Arc::new(JsonFileStore::new(dir)) as Arc<dyn InvestigationStore>);

        Ok(Self::new(registry, price, store, config.clone()))
    }

    /// Investigate with automatic chain detection
    pub async fn investigate(
        &self,
        address: &str,
        options: &InvestigateOptions,
    ) -> Result<WalletInvestigation> {
        let classified = detect::classify(address).map_err(|e| e.at_stage("classify"))?;
        self.run(classified, options).await
    }

    /// Investigate on an explicitly chosen chain, skipping detection
    pub async fn investigate_on(
        &self,
        chain: ChainKind,
        address: &str,
        options: &InvestigateOptions,
    ) -> Result<WalletInvestigation> {
        let trimmed = address.trim();
        let adapter = self.registry.get(chain)?;
        if !adapter.validate_address(trimmed) {
            return Err(Error::InvalidRequest(format!(
                "address {trimmed} is not valid for chain {chain}"
            )));
        }
        let classified = ClassifiedAddress {
            address: trimmed.to_string(),
            chain,
            confidence: 1.0,
        };
        self.run(classified, options).await
    }

    /// Investigate a batch concurrently, preserving input order
    pub async fn investigate_many(
        &self,
        addresses: &[String],
        options: &InvestigateOptions,
    ) -> Vec<(String, Result<WalletInvestigation>)> {
        let futures = addresses
            .iter()
            .map(|a| async move { (a.clone(), self.investigate(a, options).await) });
        join_all(futures).await
    }

    async fn run(
        &self,
        classified: ClassifiedAddress,
        options: &InvestigateOptions,
    ) -> Result<WalletInvestigation> {
        let limit = self.history_limit(options)?;
        let adapter = self.registry.get(classified.chain)?;
        let info = adapter.chain_info().clone();
        let address = classified.address.as_str();

        info!(address, chain = %classified.chain, limit, "starting investigation");

        let token_limit = if options.include_token_transfers { limit } else { 0 };
        let (balance, history, tokens) = tokio::join!(
            adapter.fetch_balance(address),
            adapter.fetch_transactions(address, limit),
            async {
                if token_limit == 0 {
                    return Ok(crate::chain::Sourced::primary(Vec::new()));
                }
                adapter.fetch_token_transfers(address, token_limit).await
            },
        );
        let balance = balance.map_err(|e| e.at_stage("balance-fetch"))?;
        let history = history.map_err(|e| e.at_stage("history-fetch"))?;
        let tokens = tokens.map_err(|e| e.at_stage("token-fetch"))?;

        let data_source = balance
            .provenance
            .worst(history.provenance)
            .worst(tokens.provenance);

        let transactions = merge_histories(history.value, tokens.value, limit);
        let balance = self.with_usd(balance.value).await;

        let analysis = stats::analyze(address, &transactions, info.family);
        let fund_flows = fund_flow::trace(address, &transactions);
        let flow_summary = fund_flow::summarize(&fund_flows);
        let risk = risk::assess(
            &analysis,
            &flow_summary,
            &transactions,
            &self.config.analysis.risk,
        );
        let opinion = opinion::synthesize(&analysis, &flow_summary, balance.usd_value);

        let investigation = WalletInvestigation {
            address: address.to_string(),
            chain: classified.chain,
            chain_info: info,
            classification_confidence: classified.confidence,
            balance,
            transactions,
            analysis,
            fund_flows,
            risk,
            opinion,
            degraded: data_source.is_degraded(),
            data_source,
            investigated_at: chrono::Utc::now(),
        };

        if let Some(store) = &self.store {
            // Persistence is best effort; the result is already complete
            if let Err(e) = store.store(&investigation).await {
                warn!(address, error = %e, "failed to store investigation");
            }
        }

        info!(
            address,
            risk_score = investigation.risk.score,
            degraded = investigation.degraded,
            "investigation complete"
        );

        Ok(investigation)
    }

    fn history_limit(&self, options: &InvestigateOptions) -> Result<usize> {
        let limit = options
            .max_transactions
            .unwrap_or(self.config.analysis.max_transactions);
        if limit == 0 {
            return Err(Error::InvalidRequest(
                "max_transactions must be positive".to_string(),
            ));
        }
        if limit > self.config.analysis.transaction_ceiling {
            return Err(Error::InvalidRequest(format!(
                "max_transactions {} exceeds ceiling {}",
                limit, self.config.analysis.transaction_ceiling
            )));
        }
        Ok(limit)
    }

    async fn with_usd(&self, mut balance: Balance) -> Balance {
        match self.price.usd_price(&balance.symbol).await {
            Ok(Some(price)) => {
                let amount = bigdecimal::ToPrimitive::to_f64(&balance.amount).unwrap_or(0.0);
                balance.usd_value = amount * price;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(symbol = balance.symbol, error = %e, "price lookup failed");
            }
        }
        balance
    }

    pub fn supported_chains(&self) -> Vec<ChainKind> {
        self.registry.supported()
    }
}

/// Merge native history and token transfers, newest first, deduplicated
/// by hash (a token transfer can shadow its carrier transaction)
fn merge_histories(
    mut history: Vec<Transaction>,
    tokens: Vec<Transaction>,
    limit: usize,
) -> Vec<Transaction> {
    let known: std::collections::HashSet<String> =
        history.iter().map(|t| t.hash.clone()).collect();
    history.extend(tokens.into_iter().filter(|t| !known.contains(&t.hash)));
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.hash.cmp(&b.hash)));
    history.truncate(limit);
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{synthetic, ChainAdapter, Sourced};
    use crate::types::{scaled_u64, ChainInfo, DataProvenance, TxKind, TxStatus};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;

    const ETH_ADDR: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    /// Serves canned data at a fixed provenance
    struct StubAdapter {
        info: ChainInfo,
        balance: Balance,
        txs: Vec<Transaction>,
        provenance: DataProvenance,
    }

    impl StubAdapter {
        fn new(chain: ChainKind, txs: Vec<Transaction>) -> Self {
            Self {
                info: chain.info(),
                balance: Balance {
                    amount: scaled_u64(2_000_000, 6),
                    symbol: chain.info().symbol,
                    usd_value: 0.0,
                    fetched_at: Utc::now(),
                },
                txs,
                provenance: DataProvenance::Primary,
            }
        }
    }

    #[async_trait]
    impl ChainAdapter for StubAdapter {
        fn chain_info(&self) -> &ChainInfo {
            &self.info
        }

        fn validate_address(&self, address: &str) -> bool {
            detect::validate(address, self.info.kind)
        }

        async fn fetch_balance(&self, _address: &str) -> Result<Sourced<Balance>> {
            Ok(Sourced {
                value: self.balance.clone(),
                provenance: self.provenance,
            })
        }

        async fn fetch_transactions(
            &self,
            _address: &str,
            limit: usize,
        ) -> Result<Sourced<Vec<Transaction>>> {
            let mut txs = self.txs.clone();
            txs.truncate(limit);
            Ok(Sourced {
                value: txs,
                provenance: self.provenance,
            })
        }
    }

    /// Models an adapter whose every upstream is down
    struct DownAdapter {
        info: ChainInfo,
    }

    #[async_trait]
    impl ChainAdapter for DownAdapter {
        fn chain_info(&self) -> &ChainInfo {
            &self.info
        }

        fn validate_address(&self, address: &str) -> bool {
            detect::validate(address, self.info.kind)
        }

        async fn fetch_balance(&self, address: &str) -> Result<Sourced<Balance>> {
            Ok(Sourced::synthetic(synthetic::balance(address, &self.info)))
        }

        async fn fetch_transactions(
            &self,
            address: &str,
            limit: usize,
        ) -> Result<Sourced<Vec<Transaction>>> {
            Ok(Sourced::synthetic(synthetic::transactions(
                address, &self.info, limit,
            )))
        }
    }

    fn tx(i: i64, value_millis: u64, outbound: bool) -> Transaction {
        let other = "0x00000000000000000000000000000000000000aa".to_string();
        let (from, to) = if outbound {
            (ETH_ADDR.to_lowercase(), other)
        } else {
            (other, ETH_ADDR.to_lowercase())
        };
        Transaction {
            hash: format!("0x{i:064x}"),
            block_height: 19_000_000 + i as u64,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(i),
            from,
            to,
            value: scaled_u64(value_millis, 3),
            currency: "ETH".to_string(),
            status: TxStatus::Success,
            kind: TxKind::Transfer,
            fee: None,
            gas_used: Some(21_000),
        }
    }

    fn investigator(adapter: Arc<dyn ChainAdapter>) -> Investigator {
        let mut registry = AdapterRegistry::new();
        registry.register(adapter);
        let price = StaticPriceSource::new(HashMap::from([("ETH".to_string(), 3_000.0)]));
        Investigator::new(registry, Arc::new(price), None, Config::default())
    }

    #[tokio::test]
    async fn empty_wallet_produces_zeroed_report() {
        let investigator = investigator(Arc::new(StubAdapter::new(
            ChainKind::Ethereum,
            Vec::new(),
        )));
        let report = investigator
            .investigate(ETH_ADDR, &InvestigateOptions::default())
            .await
            .unwrap();

        assert_eq!(report.chain, ChainKind::Ethereum);
        assert_eq!(report.analysis.total_transactions, 0);
        assert_eq!(report.analysis.total_value, 0.0);
        assert_eq!(report.risk.score, 0.0);
        assert!(!report.degraded);
        // 2.0 ETH at the static price
        assert!((report.balance.usd_value - 6_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn busy_wallet_gets_flagged_and_scored() {
        let mut txs: Vec<Transaction> = (0..144).map(|i| tx(i, 1_000, i % 2 == 0)).collect();
        for i in 144..150 {
            txs.push(tx(i, 250_000, true));
        }
        let investigator = investigator(Arc::new(StubAdapter::new(ChainKind::Ethereum, txs)));
        let report = investigator
            .investigate(ETH_ADDR, &InvestigateOptions::default())
            .await
            .unwrap();

        assert_eq!(report.analysis.total_transactions, 150);
        assert!(report
            .analysis
            .flags
            .contains(&"High Transaction Frequency".to_string()));
        assert!(report
            .analysis
            .flags
            .contains(&"Large Value Transfers".to_string()));
        assert!(report.analysis.flag_score >= 30.0);
        assert_eq!(report.analysis.failed_count, 0);
    }

    #[tokio::test]
    async fn all_sources_down_degrades_deterministically() {
        let investigator = investigator(Arc::new(DownAdapter {
            info: ChainKind::Ethereum.info(),
        }));
        let options = InvestigateOptions::default();

        let first = investigator.investigate(ETH_ADDR, &options).await.unwrap();
        let second = investigator.investigate(ETH_ADDR, &options).await.unwrap();

        assert!(first.degraded);
        assert_eq!(first.data_source, DataProvenance::Synthetic);
        assert!(!first.transactions.is_empty());
        assert_eq!(
            first.analysis.total_transactions,
            second.analysis.total_transactions
        );
        assert_eq!(first.balance.amount, second.balance.amount);
        assert_eq!(first.risk.score, second.risk.score);
    }

    #[tokio::test]
    async fn unrecognized_address_fails_at_classify() {
        let investigator = investigator(Arc::new(StubAdapter::new(
            ChainKind::Ethereum,
            Vec::new(),
        )));
        let err = investigator
            .investigate("not-an-address", &InvestigateOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UnrecognizedAddress");
        assert!(err.to_string().contains("classify"));
    }

    #[tokio::test]
    async fn explicit_chain_overrides_detection() {
        let investigator = investigator(Arc::new(StubAdapter::new(
            ChainKind::Polygon,
            Vec::new(),
        )));
        // detection would say Ethereum; the explicit chain wins
        let report = investigator
            .investigate_on(ChainKind::Polygon, ETH_ADDR, &InvestigateOptions::default())
            .await
            .unwrap();
        assert_eq!(report.chain, ChainKind::Polygon);
        assert_eq!(report.classification_confidence, 1.0);
    }

    #[tokio::test]
    async fn explicit_chain_rejects_wrong_format() {
        let investigator = investigator(Arc::new(StubAdapter::new(
            ChainKind::Ethereum,
            Vec::new(),
        )));
        let err = investigator
            .investigate_on(
                ChainKind::Ethereum,
                "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
                &InvestigateOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidRequest");
    }

    #[tokio::test]
    async fn limit_above_ceiling_is_invalid() {
        let investigator = investigator(Arc::new(StubAdapter::new(
            ChainKind::Ethereum,
            Vec::new(),
        )));
        let err = investigator
            .investigate(
                ETH_ADDR,
                &InvestigateOptions {
                    max_transactions: Some(1_000_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidRequest");
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let investigator = investigator(Arc::new(StubAdapter::new(
            ChainKind::Ethereum,
            Vec::new(),
        )));
        let addresses = vec![
            ETH_ADDR.to_string(),
            "garbage".to_string(),
            "0x00000000000000000000000000000000000000aa".to_string(),
        ];
        let results = investigator
            .investigate_many(&addresses, &InvestigateOptions::default())
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, ETH_ADDR);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
    }

    #[test]
    fn merge_dedupes_and_sorts() {
        let a = tx(1, 100, true);
        let mut dup = tx(1, 999, true);
        dup.kind = TxKind::Token;
        let b = tx(5, 100, false);
        let merged = merge_histories(vec![a.clone()], vec![dup, b.clone()], 10);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].hash, b.hash);
        assert_eq!(merged[1].kind, TxKind::Transfer);
    }
}
