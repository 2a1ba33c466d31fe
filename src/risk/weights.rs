use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::RiskComponent;

/// Relative weight of each component in the composite score.
///
/// Held as exact decimals so that "weights sum to 1.0" is an equality check,
/// not a tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub liquidation: Decimal,
    pub volatility: Decimal,
    pub concentration: Decimal,
    pub leverage: Decimal,
    pub behavioral: Decimal,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            liquidation: Decimal::new(30, 2),
            volatility: Decimal::new(25, 2),
            concentration: Decimal::new(20, 2),
            leverage: Decimal::new(15, 2),
            behavioral: Decimal::new(10, 2),
        }
    }
}

impl RiskWeights {
    pub fn weight(&self, component: RiskComponent) -> Decimal {
        match component {
            RiskComponent::Liquidation => self.liquidation,
            RiskComponent::Volatility => self.volatility,
            RiskComponent::Concentration => self.concentration,
            RiskComponent::Leverage => self.leverage,
            RiskComponent::Behavioral => self.behavioral,
        }
    }

    pub fn total(&self) -> Decimal {
        RiskComponent::ALL.iter().map(|c| self.weight(*c)).sum()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for component in RiskComponent::ALL {
            let weight = self.weight(component);
            if weight < Decimal::ZERO || weight > Decimal::ONE {
                return Err(AppError::ConfigError(format!(
                    "weight for {} must be within [0, 1], got {}",
                    component, weight
                )));
            }
        }

        let total = self.total();
        if total != Decimal::ONE {
            return Err(AppError::ConfigError(format!(
                "risk weights must sum to exactly 1.0, got {}",
                total
            )));
        }
        Ok(())
    }
}
