//! Risk assessment
//!
//! Two layers feed one score: threshold-based risk factors (weighted by
//! severity) and pattern-based suspicious activity detections (each
//! contributing a tenth of its pattern score). Thresholds come from
//! [`RiskConfig`]; the score is capped at 100.

use serde::{Deserialize, Serialize};

use crate::analysis::fund_flow::FlowSummary;
use crate::analysis::stats::TransactionAnalysis;
use crate::config::RiskConfig;
use crate::types::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn weight(self) -> f64 {
        match self {
            Severity::Critical => 25.0,
            Severity::High => 15.0,
            Severity::Medium => 10.0,
            Severity::Low => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            RiskLevel::Critical
        } else if score > 60.0 {
            RiskLevel::High
        } else if score > 30.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    pub pattern: String,
    pub description: String,
    /// Pattern confidence score in [0, 100]; contributes score/10 to the total
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Aggregate score in [0, 100]
    pub score: f64,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
    pub suspicious_activities: Vec<SuspiciousActivity>,
    pub recommendations: Vec<String>,
}

/// Score a wallet from its statistics, flow summary and raw history
pub fn assess(
    analysis: &TransactionAnalysis,
    flows: &FlowSummary,
    txs: &[Transaction],
    config: &RiskConfig,
) -> RiskAssessment {
    let factors = collect_factors(analysis, flows, config);
    let suspicious = detect_patterns(analysis, txs, config);

    let score = (factors.iter().map(|f| f.severity.weight()).sum::<f64>()
        + suspicious.iter().map(|s| s.score * 0.1).sum::<f64>())
    .min(100.0);

    let recommendations = recommend(&factors, &suspicious);

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
        suspicious_activities: suspicious,
        recommendations,
    }
}

fn collect_factors(
    analysis: &TransactionAnalysis,
    flows: &FlowSummary,
    config: &RiskConfig,
) -> Vec<RiskFactor> {
    let mut factors = Vec::new();
    let mut push = |name: &str, description: String, severity: Severity| {
        factors.push(RiskFactor {
            name: name.to_string(),
            description,
            severity,
        });
    };

    if analysis.avg_per_day > config.high_frequency_per_day {
        push(
            "High Transaction Frequency",
            format!(
                "Averages {:.1} transactions per day",
                analysis.avg_per_day
            ),
            Severity::High,
        );
    }
    if analysis.max_value > config.large_value_max {
        push(
            "Large Value Transfers",
            format!("Largest single transfer of {:.2} native units", analysis.max_value),
            Severity::High,
        );
    }
    if analysis.failed_count > 10 {
        push(
            "Failed Transactions",
            format!("{} failed transactions in history", analysis.failed_count),
            Severity::Medium,
        );
    }
    if flows.exchange_count > config.exchange_activity_count {
        push(
            "High Exchange Activity",
            format!("{} flows touch known exchanges", flows.exchange_count),
            Severity::Medium,
        );
    }
    if flows.forex_count > config.forex_activity_count {
        push(
            "Forex Trading Activity",
            format!("{} flows touch forex providers", flows.forex_count),
            Severity::High,
        );
    }
    if flows.defi_count > config.defi_activity_count {
        push(
            "High DeFi Activity",
            format!("{} flows touch DeFi protocols", flows.defi_count),
            Severity::Medium,
        );
    }
    if analysis
        .fee_efficiency
        .is_some_and(|r| r > config.gas_inefficiency_ratio)
    {
        push(
            "Gas Inefficiency",
            "Mean gas usage far above plain transfers".to_string(),
            Severity::Low,
        );
    }
    if analysis.unique_counterparties > config.counterparty_diversity {
        push(
            "High Counterparty Diversity",
            format!(
                "{} unique counterparties",
                analysis.unique_counterparties
            ),
            Severity::Medium,
        );
    }

    factors
}

fn detect_patterns(
    analysis: &TransactionAnalysis,
    txs: &[Transaction],
    config: &RiskConfig,
) -> Vec<SuspiciousActivity> {
    let mut found = Vec::new();

    let large = txs
        .iter()
        .filter(|t| t.value_f64() > config.rapid_transfer_amount)
        .count();
    if large > config.rapid_transfer_count {
        found.push(SuspiciousActivity {
            pattern: "Rapid Large Transfers".to_string(),
            description: format!(
                "{large} transfers above {:.0} native units",
                config.rapid_transfer_amount
            ),
            score: 75.0,
        });
    }

    if analysis.unique_counterparties > config.mixing_min_counterparties
        && analysis.avg_value < config.mixing_max_avg_value
        && analysis.avg_value > 0.0
    {
        found.push(SuspiciousActivity {
            pattern: "Potential Mixing Activity".to_string(),
            description: format!(
                "{} counterparties with mean value {:.4}",
                analysis.unique_counterparties, analysis.avg_value
            ),
            score: 85.0,
        });
    }

    if analysis.total_transactions > 0 {
        let large_share =
            analysis.value_distribution.over_100 as f64 / analysis.total_transactions as f64;
        if large_share > config.pump_dump_large_share {
            found.push(SuspiciousActivity {
                pattern: "Pump and Dump Patterns".to_string(),
                description: format!(
                    "{:.0}% of transactions move over 100 native units",
                    large_share * 100.0
                ),
                score: 90.0,
            });
        }
    }

    if let Some(top) = analysis.top_counterparties.first() {
        if top.count as usize > config.wash_trade_interactions {
            found.push(SuspiciousActivity {
                pattern: "Wash Trading".to_string(),
                description: format!(
                    "{} interactions with a single counterparty",
                    top.count
                ),
                score: 80.0,
            });
        }
    }

    found
}

/// Fixed advisory text per factor/pattern name
fn recommend(factors: &[RiskFactor], suspicious: &[SuspiciousActivity]) -> Vec<String> {
    let has_factor = |name: &str| factors.iter().any(|f| f.name == name);
    let has_pattern = |name: &str| suspicious.iter().any(|s| s.pattern == name);

    let mut out = Vec::new();
    if has_factor("High Transaction Frequency") {
        out.push("Monitor for unusual transaction patterns".to_string());
    }
    if has_factor("Large Value Transfers") {
        out.push("Verify source of large transfers".to_string());
    }
    if has_factor("Forex Trading Activity") {
        out.push("Review forex trading compliance".to_string());
    }
    if has_pattern("Potential Mixing Activity") {
        out.push("Investigate potential mixing or layering activity".to_string());
    }
    if has_pattern("Pump and Dump Patterns") {
        out.push("Review for market manipulation patterns".to_string());
    }

    if factors.is_empty() && suspicious.is_empty() {
        out.push("No significant risks detected".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stats::{Counterparty, ValueDistribution};
    use crate::types::{scaled_u64, TxKind, TxStatus};
    use chrono::Utc;

    fn quiet_analysis() -> TransactionAnalysis {
        TransactionAnalysis {
            total_transactions: 5,
            avg_per_day: 1.0,
            avg_value: 0.5,
            max_value: 2.0,
            unique_counterparties: 3,
            ..Default::default()
        }
    }

    fn big_tx(value_units: u64) -> Transaction {
        Transaction {
            hash: "h".to_string(),
            block_height: 1,
            timestamp: Utc::now(),
            from: "a".to_string(),
            to: "b".to_string(),
            value: scaled_u64(value_units, 0),
            currency: "ETH".to_string(),
            status: TxStatus::Success,
            kind: TxKind::Transfer,
            fee: None,
            gas_used: None,
        }
    }

    #[test]
    fn quiet_wallet_scores_low() {
        let assessment = assess(
            &quiet_analysis(),
            &FlowSummary::default(),
            &[],
            &RiskConfig::default(),
        );
        assert_eq!(assessment.score, 0.0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(
            assessment.recommendations,
            vec!["No significant risks detected".to_string()]
        );
    }

    #[test]
    fn severity_weights() {
        assert_eq!(Severity::Critical.weight(), 25.0);
        assert_eq!(Severity::High.weight(), 15.0);
        assert_eq!(Severity::Medium.weight(), 10.0);
        assert_eq!(Severity::Low.weight(), 5.0);
    }

    #[test]
    fn large_value_plus_failures_stays_low_band() {
        // One high factor (15) and one medium factor (10): 25, still low
        let mut analysis = quiet_analysis();
        analysis.max_value = 60_000.0;
        analysis.failed_count = 11;
        let assessment = assess(
            &analysis,
            &FlowSummary::default(),
            &[],
            &RiskConfig::default(),
        );
        assert_eq!(assessment.score, 25.0);
        assert_eq!(assessment.level, RiskLevel::Low);
        let severities: Vec<Severity> =
            assessment.factors.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::High, Severity::Medium]);
    }

    #[test]
    fn rapid_large_transfers_detected() {
        let txs: Vec<Transaction> = (0..4).map(|_| big_tx(20_000)).collect();
        let assessment = assess(
            &quiet_analysis(),
            &FlowSummary::default(),
            &txs,
            &RiskConfig::default(),
        );
        assert!(assessment
            .suspicious_activities
            .iter()
            .any(|s| s.pattern == "Rapid Large Transfers"));
        // 75 * 0.1 = 7.5
        assert!((assessment.score - 7.5).abs() < 1e-9);
    }

    #[test]
    fn mixing_pattern_needs_both_conditions() {
        let mut analysis = quiet_analysis();
        analysis.unique_counterparties = 60;
        analysis.avg_value = 0.05;
        let assessment = assess(
            &analysis,
            &FlowSummary::default(),
            &[],
            &RiskConfig::default(),
        );
        assert!(assessment
            .suspicious_activities
            .iter()
            .any(|s| s.pattern == "Potential Mixing Activity"));
        assert!(assessment
            .recommendations
            .contains(&"Investigate potential mixing or layering activity".to_string()));

        analysis.avg_value = 5.0;
        let assessment = assess(
            &analysis,
            &FlowSummary::default(),
            &[],
            &RiskConfig::default(),
        );
        assert!(!assessment
            .suspicious_activities
            .iter()
            .any(|s| s.pattern == "Potential Mixing Activity"));
    }

    #[test]
    fn wash_trading_flags_dominant_counterparty() {
        let mut analysis = quiet_analysis();
        analysis.top_counterparties = vec![Counterparty {
            address: "0xabc".to_string(),
            count: 25,
            total_value: 10.0,
        }];
        let assessment = assess(
            &analysis,
            &FlowSummary::default(),
            &[],
            &RiskConfig::default(),
        );
        assert!(assessment
            .suspicious_activities
            .iter()
            .any(|s| s.pattern == "Wash Trading"));
    }

    #[test]
    fn pump_and_dump_uses_large_share() {
        let mut analysis = quiet_analysis();
        analysis.total_transactions = 10;
        analysis.value_distribution = ValueDistribution {
            over_100: 3,
            ..Default::default()
        };
        let assessment = assess(
            &analysis,
            &FlowSummary::default(),
            &[],
            &RiskConfig::default(),
        );
        assert!(assessment
            .suspicious_activities
            .iter()
            .any(|s| s.pattern == "Pump and Dump Patterns"));
        assert!(assessment
            .recommendations
            .contains(&"Review for market manipulation patterns".to_string()));
    }

    #[test]
    fn score_caps_at_100_and_levels_band() {
        let mut analysis = quiet_analysis();
        analysis.avg_per_day = 100.0;
        analysis.max_value = 1_000_000.0;
        analysis.failed_count = 50;
        analysis.unique_counterparties = 200;
        analysis.avg_value = 0.01;
        analysis.fee_efficiency = Some(10.0);
        analysis.total_transactions = 10;
        analysis.value_distribution.over_100 = 9;
        analysis.top_counterparties = vec![Counterparty {
            address: "0xabc".to_string(),
            count: 100,
            total_value: 1.0,
        }];
        let flows = FlowSummary {
            exchange_count: 50,
            forex_count: 20,
            defi_count: 50,
            ..Default::default()
        };
        let txs: Vec<Transaction> = (0..10).map(|_| big_tx(100_000)).collect();
        let assessment = assess(&analysis, &flows, &txs, &RiskConfig::default());
        assert_eq!(assessment.score, 100.0);
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert!(assessment
            .recommendations
            .contains(&"Review forex trading compliance".to_string()));
        assert!(assessment.recommendations.len() >= 4);
    }

    #[test]
    fn risk_bands() {
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(61.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(31.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(30.0), RiskLevel::Low);
    }
}
