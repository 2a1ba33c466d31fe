// Volatility risk: dispersion of transaction amounts and of the gaps between them
use crate::models::{ClassifiedTransaction, RiskComponent};
use crate::risk::traits::RiskComponentCalculator;
use crate::utils::math::{coefficient_of_variation, consecutive_gaps};

/// Each half of the score saturates at this coefficient of variation.
const CV_CAP: f64 = 3.0;
const HALF_WEIGHT: f64 = 500.0;
/// Contribution of a half that has fewer than two samples
const UNDETERMINED_HALF: f64 = 250.0;

/// Uses every transaction, classified or not: the shape of the whole history
/// matters here, not just the Compound calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolatilityRiskCalculator;

impl VolatilityRiskCalculator {
    pub fn new() -> Self {
        Self
    }

    fn dispersion_part(values: &[f64]) -> f64 {
        match coefficient_of_variation(values) {
            Some(cv) => HALF_WEIGHT * cv.min(CV_CAP) / CV_CAP,
            None => UNDETERMINED_HALF,
        }
    }
}

impl RiskComponentCalculator for VolatilityRiskCalculator {
    fn component(&self) -> RiskComponent {
        RiskComponent::Volatility
    }

    fn raw_score(&self, transactions: &[ClassifiedTransaction]) -> f64 {
        let amounts: Vec<f64> = transactions
            .iter()
            .map(|tx| tx.amount)
            .filter(|amount| *amount > 0.0)
            .collect();

        let timestamps: Vec<i64> = transactions.iter().map(|tx| tx.timestamp().timestamp()).collect();
        let gaps = consecutive_gaps(&timestamps);

        Self::dispersion_part(&amounts) + Self::dispersion_part(&gaps)
    }

    fn risk_factors(&self) -> Vec<&'static str> {
        vec!["amount_dispersion", "timing_burstiness"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProtocolAction;
    use crate::risk::calculators::fixtures::*;

    #[test]
    fn test_steady_wallet_scores_low() {
        let txs: Vec<_> = (0..8)
            .map(|i| action(ProtocolAction::Supply, "cUSDC", 100.0, 86_400 * i))
            .collect();
        assert_eq!(VolatilityRiskCalculator::new().score(&txs, 500).value, 0);
    }

    #[test]
    fn test_bursty_wallet_scores_higher_than_steady() {
        let steady: Vec<_> = (0..8)
            .map(|i| action(ProtocolAction::Supply, "cUSDC", 100.0, 86_400 * i))
            .collect();
        let bursty = vec![
            action(ProtocolAction::Supply, "cUSDC", 1.0, 0),
            action(ProtocolAction::Borrow, "cUSDC", 5_000.0, 10),
            action(ProtocolAction::Repay, "cUSDC", 3.0, 20),
            action(ProtocolAction::Borrow, "cUSDC", 900.0, 2_000_000),
            action(ProtocolAction::Repay, "cUSDC", 0.5, 2_000_005),
        ];
        let calc = VolatilityRiskCalculator::new();
        assert!(calc.score(&bursty, 500).value > calc.score(&steady, 500).value + 300);
    }

    #[test]
    fn test_unclassified_transactions_feed_the_signal() {
        let mut txs = vec![action(ProtocolAction::Supply, "cUSDC", 100.0, 0)];
        txs.push(unrelated(100.0, 100));
        txs.push(unrelated(100.0, 200));
        // Equal amounts and equal gaps across all three records
        assert_eq!(VolatilityRiskCalculator::new().score(&txs, 500).value, 0);
    }

    #[test]
    fn test_single_action_gets_undetermined_halves() {
        let txs = vec![action(ProtocolAction::Supply, "cUSDC", 100.0, 0)];
        assert_eq!(VolatilityRiskCalculator::new().score(&txs, 500).value, 500);
    }
}
