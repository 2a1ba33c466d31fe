// Leverage risk: borrow-heavy behaviour relative to supplied collateral
use crate::models::{ClassifiedTransaction, RiskComponent};
use crate::risk::calculators::ActionTally;
use crate::risk::traits::RiskComponentCalculator;
use crate::utils::math::ratio;

const COUNT_WEIGHT: f64 = 0.6;
const VALUE_WEIGHT: f64 = 0.4;

#[derive(Debug, Default, Clone, Copy)]
pub struct LeverageRiskCalculator;

impl LeverageRiskCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl RiskComponentCalculator for LeverageRiskCalculator {
    fn component(&self) -> RiskComponent {
        RiskComponent::Leverage
    }

    fn raw_score(&self, transactions: &[ClassifiedTransaction]) -> f64 {
        let tally = ActionTally::from_transactions(transactions);

        let count_ratio = ratio(tally.borrows, tally.borrows + tally.supplies);

        // Amounts are normalized per asset, not priced; without any amounts the
        // count ratio stands in for the value ratio
        let total_value = tally.borrowed_amount + tally.supplied_amount;
        let value_ratio = if total_value > 0.0 {
            tally.borrowed_amount / total_value
        } else {
            count_ratio
        };

        1000.0 * (COUNT_WEIGHT * count_ratio + VALUE_WEIGHT * value_ratio)
    }

    fn risk_factors(&self) -> Vec<&'static str> {
        vec!["borrow_to_supply_count", "borrowed_to_supplied_value"]
    }
}
