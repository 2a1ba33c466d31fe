// Liquidation risk: unhealthy borrow positions inferred from the action sequence
use crate::models::{ClassifiedTransaction, RiskComponent};
use crate::risk::calculators::ActionTally;
use crate::risk::traits::RiskComponentCalculator;

const BASELINE: f64 = 50.0;
const UNREPAID_WEIGHT: f64 = 600.0;
const BORROW_INTENSITY_WEIGHT: f64 = 250.0;
const PER_LIQUIDATION: f64 = 150.0;
const LIQUIDATION_CAP: f64 = 400.0;
const OPEN_POSITION_PENALTY: f64 = 100.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct LiquidationRiskCalculator;

impl LiquidationRiskCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl RiskComponentCalculator for LiquidationRiskCalculator {
    fn component(&self) -> RiskComponent {
        RiskComponent::Liquidation
    }

    fn raw_score(&self, transactions: &[ClassifiedTransaction]) -> f64 {
        let tally = ActionTally::from_transactions(transactions);
        if tally.actions == 0 {
            return f64::NAN;
        }

        // Borrows never matched by a repay
        let unrepaid = if tally.borrows > 0 {
            let coverage = (tally.repays as f64 / tally.borrows as f64).min(1.0);
            UNREPAID_WEIGHT * (1.0 - coverage)
        } else {
            0.0
        };

        let intensity = BORROW_INTENSITY_WEIGHT * tally.borrows as f64 / tally.actions as f64;
        let liquidations = (PER_LIQUIDATION * tally.liquidations as f64).min(LIQUIDATION_CAP);
        let open_position = if tally.has_open_borrow() {
            OPEN_POSITION_PENALTY
        } else {
            0.0
        };

        BASELINE + unrepaid + intensity + liquidations + open_position
    }

    fn risk_factors(&self) -> Vec<&'static str> {
        vec!["unrepaid_borrows", "borrow_intensity", "liquidation_events", "open_borrow_position"]
    }
}
