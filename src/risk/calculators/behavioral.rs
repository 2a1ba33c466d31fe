// Behavioral risk: patterns typical of automated wallets
use std::collections::HashMap;

use crate::models::{ClassifiedTransaction, RiskComponent};
use crate::risk::traits::RiskComponentCalculator;
use crate::utils::math::{coefficient_of_variation, consecutive_gaps, ratio};
use crate::utils::time::active_span_days;

const REGULARITY_WEIGHT: f64 = 350.0;
const MIN_GAPS_FOR_REGULARITY: usize = 4;
const FREQUENCY_WEIGHT: f64 = 250.0;
/// Transactions per active day at which the frequency signal saturates
const SATURATING_TX_PER_DAY: f64 = 50.0;
const RAPID_FIRE_WEIGHT: f64 = 150.0;
const RAPID_FIRE_SECS: f64 = 60.0;
const REPEATED_AMOUNT_WEIGHT: f64 = 250.0;
const FAILED_TX_WEIGHT: f64 = 150.0;

/// Sums five bot-likeness signals; the total may exceed 1000 and is clamped
/// by `score`. Interval regularity contributes up to 350, frequency and
/// repeated amounts up to 250 each, rapid-fire gaps and failed calls up to
/// 150 each.
#[derive(Debug, Default, Clone, Copy)]
pub struct BehavioralRiskCalculator;

impl BehavioralRiskCalculator {
    pub fn new() -> Self {
        Self
    }

    fn regularity(gaps: &[f64]) -> f64 {
        if gaps.len() < MIN_GAPS_FOR_REGULARITY {
            return 0.0;
        }
        // All gaps zero: every call landed in the same second
        let cv = coefficient_of_variation(gaps).unwrap_or(0.0);
        REGULARITY_WEIGHT * (1.0 - cv.min(1.0))
    }

    fn frequency(transactions: &[ClassifiedTransaction]) -> f64 {
        let (Some(first), Some(last)) = (transactions.first(), transactions.last()) else {
            return 0.0;
        };
        let per_day = transactions.len() as f64 / active_span_days(first.timestamp(), last.timestamp());
        FREQUENCY_WEIGHT * (per_day / SATURATING_TX_PER_DAY).min(1.0)
    }

    fn rapid_fire(gaps: &[f64]) -> f64 {
        let rapid = gaps.iter().filter(|gap| **gap < RAPID_FIRE_SECS).count();
        RAPID_FIRE_WEIGHT * ratio(rapid, gaps.len())
    }

    /// Share of Compound actions whose non-zero amount appears on another action too
    fn repeated_amounts(transactions: &[ClassifiedTransaction]) -> f64 {
        let actions: Vec<&ClassifiedTransaction> =
            transactions.iter().filter(|tx| tx.is_compound_action()).collect();

        let mut occurrences: HashMap<u64, usize> = HashMap::new();
        for tx in actions.iter().filter(|tx| tx.amount > 0.0) {
            *occurrences.entry(tx.amount.to_bits()).or_insert(0) += 1;
        }
        let repeated: usize = occurrences.values().filter(|count| **count > 1).sum();

        REPEATED_AMOUNT_WEIGHT * ratio(repeated, actions.len())
    }

    fn failed_calls(transactions: &[ClassifiedTransaction]) -> f64 {
        let failed = transactions.iter().filter(|tx| !tx.raw.success).count();
        FAILED_TX_WEIGHT * (2.0 * ratio(failed, transactions.len())).min(1.0)
    }
}

impl RiskComponentCalculator for BehavioralRiskCalculator {
    fn component(&self) -> RiskComponent {
        RiskComponent::Behavioral
    }

    fn raw_score(&self, transactions: &[ClassifiedTransaction]) -> f64 {
        let timestamps: Vec<i64> = transactions.iter().map(|tx| tx.timestamp().timestamp()).collect();
        let gaps = consecutive_gaps(&timestamps);

        Self::regularity(&gaps)
            + Self::frequency(transactions)
            + Self::rapid_fire(&gaps)
            + Self::repeated_amounts(transactions)
            + Self::failed_calls(transactions)
    }

    fn risk_factors(&self) -> Vec<&'static str> {
        vec![
            "interval_regularity",
            "transaction_frequency",
            "rapid_fire_gaps",
            "repeated_amounts",
            "failed_transactions",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProtocolAction;
    use crate::risk::calculators::fixtures::*;

    const DAY: i64 = 86_400;

    #[test]
    fn test_bot_like_wallet_scores_high() {
        let txs: Vec<_> = (0..20)
            .map(|i| action(ProtocolAction::Supply, "cUSDC", 25.0, i * 30))
            .collect();
        // 350 regularity + 100 frequency + 150 rapid fire + 250 repeated
        assert_eq!(BehavioralRiskCalculator::new().score(&txs, 500).value, 850);
    }

    #[test]
    fn test_irregular_human_wallet_scores_low() {
        let txs = vec![
            action(ProtocolAction::Supply, "cUSDC", 120.0, 0),
            action(ProtocolAction::Borrow, "cUSDC", 40.0, DAY),
            action(ProtocolAction::Repay, "cUSDC", 41.5, 11 * DAY),
            action(ProtocolAction::Supply, "cDAI", 300.0, 13 * DAY),
            action(ProtocolAction::Redeem, "cDAI", 150.0, 43 * DAY),
        ];
        assert!(BehavioralRiskCalculator::new().score(&txs, 500).value < 50);
    }

    #[test]
    fn test_failed_transactions_add_risk() {
        let mut failed = unrelated(0.0, DAY);
        failed.raw.success = false;
        let clean = vec![
            action(ProtocolAction::Supply, "cUSDC", 120.0, 0),
            unrelated(0.0, DAY),
        ];
        let with_failure = vec![action(ProtocolAction::Supply, "cUSDC", 120.0, 0), failed];

        let calc = BehavioralRiskCalculator::new();
        let delta = calc.score(&with_failure, 500).value - calc.score(&clean, 500).value;
        assert_eq!(delta, 150);
    }

    #[test]
    fn test_regularity_needs_four_gaps() {
        let gaps = vec![10.0, 10.0, 10.0];
        assert_eq!(BehavioralRiskCalculator::regularity(&gaps), 0.0);
        let gaps = vec![10.0, 10.0, 10.0, 10.0];
        assert_eq!(BehavioralRiskCalculator::regularity(&gaps), REGULARITY_WEIGHT);
    }
}
