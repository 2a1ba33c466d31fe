use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{FetchError, FetchErrorKind};
use crate::models::WalletAddress;

pub const MIN_SCORE: u32 = 0;
pub const MAX_SCORE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskComponent {
    Liquidation,
    Volatility,
    Concentration,
    Leverage,
    Behavioral,
}

impl RiskComponent {
    /// Canonical order used for storage, weights and report columns.
    pub const ALL: [RiskComponent; 5] = [
        RiskComponent::Liquidation,
        RiskComponent::Volatility,
        RiskComponent::Concentration,
        RiskComponent::Leverage,
        RiskComponent::Behavioral,
    ];

    pub fn index(&self) -> usize {
        match self {
            RiskComponent::Liquidation => 0,
            RiskComponent::Volatility => 1,
            RiskComponent::Concentration => 2,
            RiskComponent::Leverage => 3,
            RiskComponent::Behavioral => 4,
        }
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            RiskComponent::Liquidation => "liquidation_risk",
            RiskComponent::Volatility => "volatility_risk",
            RiskComponent::Concentration => "concentration_risk",
            RiskComponent::Leverage => "leverage_risk",
            RiskComponent::Behavioral => "behavioral_risk",
        }
    }
}

impl fmt::Display for RiskComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A single calculator's verdict, always within `[0, 1000]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskComponentScore {
    pub component: RiskComponent,
    pub value: u32,
}

impl RiskComponentScore {
    /// Round and clamp a raw calculator output. NaN maps to `fallback`.
    pub fn from_raw(component: RiskComponent, raw: f64, fallback: u32) -> Self {
        let value = if raw.is_finite() {
            raw.round().clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u32
        } else if raw == f64::INFINITY {
            MAX_SCORE
        } else if raw == f64::NEG_INFINITY {
            MIN_SCORE
        } else {
            fallback.min(MAX_SCORE)
        };
        Self { component, value }
    }

    pub fn neutral(component: RiskComponent, default_score: u32) -> Self {
        Self {
            component,
            value: default_score.min(MAX_SCORE),
        }
    }
}

/// Terminal artifact of the pipeline for one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRiskResult {
    pub wallet: WalletAddress,
    pub score: u32,
    /// Indexed by `RiskComponent::index`
    pub components: [RiskComponentScore; 5],
    pub tx_count: usize,
    pub token_tx_count: usize,
}

impl WalletRiskResult {
    pub fn component(&self, component: RiskComponent) -> u32 {
        self.components[component.index()].value
    }

    pub fn total_transactions(&self) -> usize {
        self.tx_count + self.token_tx_count
    }
}

/// Why a wallet received the default composite score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultReason {
    /// The provider could not deliver data after all retries
    FetchFailed(FetchErrorKind),
    /// The provider answered, but the wallet has no transactions at all
    NoActivity,
}

impl fmt::Display for DefaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultReason::FetchFailed(kind) => write!(f, "fetch_failed:{}", kind),
            DefaultReason::NoActivity => f.write_str("no_activity"),
        }
    }
}

/// Per-wallet outcome. Both variants carry a complete, in-range result so
/// output writers never need to special-case failures.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletOutcome {
    Scored {
        result: WalletRiskResult,
        /// Set when one of the two listings failed but the other produced data
        fetch_warning: Option<FetchError>,
        no_compound_activity: bool,
    },
    Defaulted {
        result: WalletRiskResult,
        reason: DefaultReason,
    },
}

impl WalletOutcome {
    pub fn result(&self) -> &WalletRiskResult {
        match self {
            WalletOutcome::Scored { result, .. } | WalletOutcome::Defaulted { result, .. } => result,
        }
    }

    pub fn into_result(self) -> WalletRiskResult {
        match self {
            WalletOutcome::Scored { result, .. } | WalletOutcome::Defaulted { result, .. } => result,
        }
    }

    pub fn default_reason(&self) -> Option<&DefaultReason> {
        match self {
            WalletOutcome::Defaulted { reason, .. } => Some(reason),
            WalletOutcome::Scored { .. } => None,
        }
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            WalletOutcome::Defaulted { reason: DefaultReason::FetchFailed(_), .. }
        )
    }
}

/// Lifecycle of a wallet inside one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletStage {
    Pending,
    Fetched,
    Classified,
    Scored,
    Finalized,
}

impl fmt::Display for WalletStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WalletStage::Pending => "pending",
            WalletStage::Fetched => "fetched",
            WalletStage::Classified => "classified",
            WalletStage::Scored => "scored",
            WalletStage::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_clamps_and_rounds() {
        assert_eq!(RiskComponentScore::from_raw(RiskComponent::Volatility, 1234.0, 500).value, 1000);
        assert_eq!(RiskComponentScore::from_raw(RiskComponent::Volatility, -3.0, 500).value, 0);
        assert_eq!(RiskComponentScore::from_raw(RiskComponent::Volatility, 411.5, 500).value, 412);
        assert_eq!(RiskComponentScore::from_raw(RiskComponent::Volatility, f64::NAN, 500).value, 500);
        assert_eq!(RiskComponentScore::from_raw(RiskComponent::Volatility, f64::INFINITY, 500).value, 1000);
    }

    #[test]
    fn test_component_order_matches_index() {
        for (position, component) in RiskComponent::ALL.iter().enumerate() {
            assert_eq!(component.index(), position);
        }
    }
}
