//! Wallet opinion synthesis
//!
//! Folds the statistics and flow summary into a human-readable verdict:
//! behavioral characteristics, an archetype, an activity level, a value
//! estimate and a confidence figure that grows with the amount of
//! evidence seen.

use serde::{Deserialize, Serialize};

use crate::analysis::fund_flow::FlowSummary;
use crate::analysis::risk::RiskLevel;
use crate::analysis::stats::TransactionAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletType {
    ExchangeWallet,
    DefiUser,
    MainWallet,
    SecondaryWallet,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
}

impl ActivityLevel {
    fn from_daily_rate(per_day: f64) -> Self {
        if per_day > 20.0 {
            ActivityLevel::VeryHigh
        } else if per_day > 10.0 {
            ActivityLevel::High
        } else if per_day > 3.0 {
            ActivityLevel::Moderate
        } else {
            ActivityLevel::Low
        }
    }
}

/// Boolean behavior profile; the archetype rules combine these
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCharacteristics {
    pub is_active: bool,
    pub is_high_value: bool,
    pub is_defi_user: bool,
    pub is_exchange_user: bool,
    pub has_multiple_wallets: bool,
    pub is_institutional: bool,
}

/// USD estimate of the wallet plus gross transfer volume in native units
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimatedValue {
    pub total_usd: f64,
    pub incoming_transfers: f64,
    pub outgoing_transfers: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletOpinion {
    pub wallet_type: WalletType,
    pub activity_level: ActivityLevel,
    pub characteristics: WalletCharacteristics,
    /// Human-readable observations backing the characteristics
    pub reasoning: Vec<String>,
    pub estimated_value: EstimatedValue,
    /// Banded from the statistics anomaly sub-score
    pub risk_level: RiskLevel,
    /// Confidence in [0, 100]; more evidence raises it
    pub confidence: f64,
}

/// Derive the opinion for one wallet
pub fn synthesize(
    analysis: &TransactionAnalysis,
    flows: &FlowSummary,
    usd_value: f64,
) -> WalletOpinion {
    let characteristics = profile(analysis, flows, usd_value);
    WalletOpinion {
        wallet_type: classify_archetype(&characteristics),
        activity_level: ActivityLevel::from_daily_rate(analysis.avg_per_day),
        reasoning: explain(&characteristics),
        estimated_value: EstimatedValue {
            total_usd: usd_value,
            incoming_transfers: flows.total_incoming,
            outgoing_transfers: flows.total_outgoing,
        },
        risk_level: RiskLevel::from_score(analysis.flag_score),
        confidence: confidence(analysis, flows),
        characteristics,
    }
}

fn profile(
    analysis: &TransactionAnalysis,
    flows: &FlowSummary,
    usd_value: f64,
) -> WalletCharacteristics {
    WalletCharacteristics {
        is_active: analysis.total_transactions > 10,
        is_high_value: usd_value > 10_000.0,
        is_defi_user: flows.defi_count > 5,
        is_exchange_user: flows.exchange_count > 3,
        has_multiple_wallets: analysis.unique_counterparties > 20,
        is_institutional: analysis.max_value > 10_000.0
            && (analysis.avg_per_day > 5.0 || flows.exchange_count > 3 || flows.forex_count > 0),
    }
}

fn explain(c: &WalletCharacteristics) -> Vec<String> {
    let mut out = Vec::new();
    if c.is_active {
        out.push("Active wallet with regular transactions".to_string());
    }
    if c.is_high_value {
        out.push("Holds significant value".to_string());
    }
    if c.is_defi_user {
        out.push("Frequent DeFi protocol user".to_string());
    }
    if c.is_exchange_user {
        out.push("Regular exchange user".to_string());
    }
    if c.has_multiple_wallets {
        out.push("Diversified counterparty set".to_string());
    }
    if c.is_institutional {
        out.push("Possible institutional or whale activity".to_string());
    }
    out
}

/// Archetype decision list, first matching rule wins; every rule needs
/// both of its characteristics
fn classify_archetype(c: &WalletCharacteristics) -> WalletType {
    if c.is_exchange_user && c.is_high_value {
        WalletType::ExchangeWallet
    } else if c.is_defi_user && c.is_active {
        WalletType::DefiUser
    } else if c.is_high_value && c.is_active {
        WalletType::MainWallet
    } else if c.has_multiple_wallets && c.is_active {
        WalletType::SecondaryWallet
    } else {
        WalletType::Unknown
    }
}

fn confidence(analysis: &TransactionAnalysis, flows: &FlowSummary) -> f64 {
    let mut confidence: f64 = 50.0;

    if analysis.total_transactions > 50 {
        confidence += 20.0;
    } else if analysis.total_transactions > 20 {
        confidence += 10.0;
    }

    let total_flows = flows.exchange_count
        + flows.forex_count
        + flows.bank_count
        + flows.defi_count
        + flows.unknown_count;
    if total_flows > 20 {
        confidence += 15.0;
    } else if total_flows > 10 {
        confidence += 10.0;
    }

    if analysis.unique_counterparties > 10 {
        confidence += 10.0;
    }
    if analysis.total_value > 1_000.0 {
        confidence += 5.0;
    }

    confidence.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(txs: usize, per_day: f64) -> TransactionAnalysis {
        TransactionAnalysis {
            total_transactions: txs,
            avg_per_day: per_day,
            ..Default::default()
        }
    }

    #[test]
    fn empty_wallet_is_unknown_at_base_confidence() {
        let opinion = synthesize(&analysis(0, 0.0), &FlowSummary::default(), 0.0);
        assert_eq!(opinion.wallet_type, WalletType::Unknown);
        assert_eq!(opinion.activity_level, ActivityLevel::Low);
        assert_eq!(opinion.confidence, 50.0);
        assert_eq!(opinion.characteristics, WalletCharacteristics::default());
        assert!(opinion.reasoning.is_empty());
        assert_eq!(opinion.risk_level, RiskLevel::Low);
    }

    #[test]
    fn unknown_serializes_as_snake_case() {
        let json = serde_json::to_string(&WalletType::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");
        let json = serde_json::to_string(&WalletType::ExchangeWallet).unwrap();
        assert_eq!(json, "\"exchange_wallet\"");
    }

    #[test]
    fn exchange_needs_flows_and_value() {
        let flows = FlowSummary {
            exchange_count: 4,
            ..Default::default()
        };
        // heavy exchange traffic but a near-empty wallet is not an
        // exchange wallet
        let opinion = synthesize(&analysis(30, 2.0), &flows, 100.0);
        assert_ne!(opinion.wallet_type, WalletType::ExchangeWallet);

        let opinion = synthesize(&analysis(30, 2.0), &flows, 50_000.0);
        assert_eq!(opinion.wallet_type, WalletType::ExchangeWallet);
        assert!(opinion.characteristics.is_exchange_user);
        assert!(opinion.characteristics.is_high_value);
    }

    #[test]
    fn defi_user_needs_activity() {
        let flows = FlowSummary {
            defi_count: 6,
            ..Default::default()
        };
        let opinion = synthesize(&analysis(30, 2.0), &flows, 0.0);
        assert_eq!(opinion.wallet_type, WalletType::DefiUser);
        assert!(opinion
            .reasoning
            .contains(&"Frequent DeFi protocol user".to_string()));

        let opinion = synthesize(&analysis(5, 2.0), &flows, 0.0);
        assert_eq!(opinion.wallet_type, WalletType::Unknown);
    }

    #[test]
    fn main_wallet_needs_activity_and_value() {
        let opinion = synthesize(&analysis(30, 2.0), &FlowSummary::default(), 50_000.0);
        assert_eq!(opinion.wallet_type, WalletType::MainWallet);

        let opinion = synthesize(&analysis(30, 2.0), &FlowSummary::default(), 100.0);
        assert_eq!(opinion.wallet_type, WalletType::Unknown);
    }

    #[test]
    fn secondary_needs_spread_and_activity() {
        let mut a = analysis(30, 2.0);
        a.unique_counterparties = 25;
        let opinion = synthesize(&a, &FlowSummary::default(), 100.0);
        assert_eq!(opinion.wallet_type, WalletType::SecondaryWallet);
        assert!(opinion.characteristics.has_multiple_wallets);

        // a single observed transaction matches no rule
        let opinion = synthesize(&analysis(1, 0.1), &FlowSummary::default(), 0.0);
        assert_eq!(opinion.wallet_type, WalletType::Unknown);
    }

    #[test]
    fn institutional_flag_requires_scale_and_velocity() {
        let mut a = analysis(30, 6.0);
        a.max_value = 50_000.0;
        let opinion = synthesize(&a, &FlowSummary::default(), 0.0);
        assert!(opinion.characteristics.is_institutional);

        a.avg_per_day = 1.0;
        let opinion = synthesize(&a, &FlowSummary::default(), 0.0);
        assert!(!opinion.characteristics.is_institutional);
    }

    #[test]
    fn activity_bands() {
        assert_eq!(ActivityLevel::from_daily_rate(25.0), ActivityLevel::VeryHigh);
        assert_eq!(ActivityLevel::from_daily_rate(15.0), ActivityLevel::High);
        assert_eq!(ActivityLevel::from_daily_rate(5.0), ActivityLevel::Moderate);
        assert_eq!(ActivityLevel::from_daily_rate(1.0), ActivityLevel::Low);
    }

    #[test]
    fn confidence_counts_all_flows() {
        // 21 total flows clear the top flow threshold even though only
        // one is categorized
        let flows = FlowSummary {
            exchange_count: 1,
            unknown_count: 20,
            ..Default::default()
        };
        let opinion = synthesize(&analysis(30, 1.0), &flows, 0.0);
        // 50 + 10 (txs > 20) + 15 (flows > 20)
        assert_eq!(opinion.confidence, 75.0);

        let flows = FlowSummary {
            unknown_count: 11,
            ..Default::default()
        };
        let opinion = synthesize(&analysis(30, 1.0), &flows, 0.0);
        assert_eq!(opinion.confidence, 70.0);
    }

    #[test]
    fn confidence_grows_with_evidence_and_caps() {
        let mut a = analysis(100, 1.0);
        a.unique_counterparties = 50;
        a.total_value = 5_000.0;
        let flows = FlowSummary {
            exchange_count: 13,
            defi_count: 8,
            ..Default::default()
        };
        let opinion = synthesize(&a, &flows, 0.0);
        // 50 + 20 + 15 + 10 + 5
        assert_eq!(opinion.confidence, 100.0);
    }

    #[test]
    fn modest_history_gets_middle_transaction_bonus() {
        let opinion = synthesize(&analysis(25, 1.0), &FlowSummary::default(), 0.0);
        assert_eq!(opinion.confidence, 60.0);
        // 20 transactions sit on the threshold and earn nothing
        let opinion = synthesize(&analysis(20, 1.0), &FlowSummary::default(), 0.0);
        assert_eq!(opinion.confidence, 50.0);
    }

    #[test]
    fn estimated_value_reflects_flow_totals() {
        let flows = FlowSummary {
            total_incoming: 10.5,
            total_outgoing: 2.0,
            ..Default::default()
        };
        let opinion = synthesize(&analysis(5, 1.0), &flows, 6_000.0);
        assert_eq!(opinion.estimated_value.total_usd, 6_000.0);
        assert!((opinion.estimated_value.incoming_transfers - 10.5).abs() < 1e-9);
        assert!((opinion.estimated_value.outgoing_transfers - 2.0).abs() < 1e-9);
    }

    #[test]
    fn risk_level_bands_from_anomaly_score() {
        let mut a = analysis(5, 1.0);
        a.flag_score = 45.0;
        let opinion = synthesize(&a, &FlowSummary::default(), 0.0);
        assert_eq!(opinion.risk_level, RiskLevel::Medium);
    }
}
