// Weighted combination of component scores into the composite wallet score
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::error::AppError;
use crate::models::{RiskComponent, RiskComponentScore, WalletAddress, WalletRiskResult, MAX_SCORE, MIN_SCORE};
use crate::risk::weights::RiskWeights;

pub const DEFAULT_SCORE: u32 = 500;

#[derive(Debug, Clone)]
pub struct Aggregator {
    weights: RiskWeights,
    default_score: u32,
}

impl Aggregator {
    /// Fails when the weights are out of range or do not sum to 1.0, or when
    /// the default score falls outside `[0, 1000]`.
    pub fn new(weights: RiskWeights, default_score: u32) -> Result<Self, AppError> {
        weights.validate()?;
        if default_score > MAX_SCORE {
            return Err(AppError::ConfigError(format!(
                "default score must be within [{}, {}], got {}",
                MIN_SCORE, MAX_SCORE, default_score
            )));
        }
        Ok(Self { weights, default_score })
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    pub fn default_score(&self) -> u32 {
        self.default_score
    }

    /// Σ weight × score, rounded half away from zero and clamped.
    pub fn weighted_sum(&self, components: &[RiskComponentScore; 5]) -> u32 {
        let total: Decimal = components
            .iter()
            .map(|c| self.weights.weight(c.component) * Decimal::from(c.value))
            .sum();

        total
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
            .unwrap_or(self.default_score)
            .clamp(MIN_SCORE, MAX_SCORE)
    }

    pub fn aggregate(
        &self,
        wallet: WalletAddress,
        components: [RiskComponentScore; 5],
        tx_count: usize,
        token_tx_count: usize,
    ) -> WalletRiskResult {
        let score = self.weighted_sum(&components);
        debug!(
            wallet = %wallet,
            score,
            liquidation = components[RiskComponent::Liquidation.index()].value,
            volatility = components[RiskComponent::Volatility.index()].value,
            concentration = components[RiskComponent::Concentration.index()].value,
            leverage = components[RiskComponent::Leverage.index()].value,
            behavioral = components[RiskComponent::Behavioral.index()].value,
            "Aggregated wallet risk"
        );

        WalletRiskResult {
            wallet,
            score,
            components,
            tx_count,
            token_tx_count,
        }
    }

    /// Result carrying the default score in every field, for wallets that
    /// could not be scored from data.
    pub fn default_result(&self, wallet: WalletAddress, tx_count: usize, token_tx_count: usize) -> WalletRiskResult {
        WalletRiskResult {
            wallet,
            score: self.default_score,
            components: RiskComponent::ALL.map(|c| RiskComponentScore::neutral(c, self.default_score)),
            tx_count,
            token_tx_count,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            default_score: DEFAULT_SCORE,
        }
    }
}
