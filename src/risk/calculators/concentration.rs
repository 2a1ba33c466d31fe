// Concentration risk: how evenly Compound activity is spread across markets
use std::collections::BTreeMap;

use crate::models::{ClassifiedTransaction, RiskComponent};
use crate::risk::traits::RiskComponentCalculator;
use crate::utils::math::herfindahl_index;

#[derive(Debug, Default, Clone, Copy)]
pub struct ConcentrationRiskCalculator;

impl ConcentrationRiskCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl RiskComponentCalculator for ConcentrationRiskCalculator {
    fn component(&self) -> RiskComponent {
        RiskComponent::Concentration
    }

    /// 1000 × Herfindahl index of action counts per asset market. Controller
    /// contracts are not assets and are left out; a wallet that only touched
    /// controllers has no defined concentration (NaN → neutral).
    fn raw_score(&self, transactions: &[ClassifiedTransaction]) -> f64 {
        // BTreeMap keeps the summation order stable across runs
        let mut per_market: BTreeMap<&str, usize> = BTreeMap::new();
        for tx in transactions.iter().filter(|tx| tx.is_compound_action()) {
            if let Some(market) = tx.market.as_ref().filter(|m| m.is_asset_market()) {
                *per_market.entry(market.address.as_str()).or_insert(0) += 1;
            }
        }

        herfindahl_index(per_market.into_values())
            .map(|hhi| hhi * 1000.0)
            .unwrap_or(f64::NAN)
    }

    fn risk_factors(&self) -> Vec<&'static str> {
        vec!["distinct_markets", "market_share_concentration"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProtocolAction;
    use crate::protocol::MarketKind;
    use crate::risk::calculators::fixtures::*;

    #[test]
    fn test_single_asset_is_fully_concentrated() {
        let txs: Vec<_> = (0..10)
            .map(|i| action(ProtocolAction::Borrow, "cUSDC", 10.0, i * 60))
            .collect();
        assert_eq!(ConcentrationRiskCalculator::new().score(&txs, 500).value, 1000);
    }

    #[test]
    fn test_even_split_across_five_markets() {
        let markets = ["cUSDC", "cDAI", "cETH", "cWBTC", "cUNI"];
        let txs: Vec<_> = (0..20)
            .map(|i| action(ProtocolAction::Supply, markets[i % 5], 10.0, i as i64 * 60))
            .collect();
        assert_eq!(ConcentrationRiskCalculator::new().score(&txs, 500).value, 200);
    }

    #[test]
    fn test_controller_only_activity_is_neutral() {
        let mut tx = action(ProtocolAction::Supply, "Comptroller", 0.0, 0);
        if let Some(market) = tx.market.as_mut() {
            market.kind = MarketKind::Comptroller;
        }
        assert_eq!(ConcentrationRiskCalculator::new().score(&[tx], 500).value, 500);
    }
}
