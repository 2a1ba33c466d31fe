// Risk component calculator interface
use crate::models::{ClassifiedTransaction, RiskComponent, RiskComponentScore};

/// A pure function from a wallet's classified history to one 0-1000 sub-score.
pub trait RiskComponentCalculator: Send + Sync {
    /// The component this calculator produces
    fn component(&self) -> RiskComponent;

    /// Unclamped score computed from the signal. May return NaN when the
    /// signal is undefined for this input; `score` then falls back to neutral.
    fn raw_score(&self, transactions: &[ClassifiedTransaction]) -> f64;

    /// Names of the signals this calculator considers
    fn risk_factors(&self) -> Vec<&'static str>;

    /// Version of the scoring formula, bumped whenever outputs change
    fn version(&self) -> &'static str {
        "1.0.0"
    }

    /// Clamped, integral sub-score. Wallets without a single Compound action
    /// get the neutral score instead of a value derived from absence of data.
    fn score(&self, transactions: &[ClassifiedTransaction], neutral_score: u32) -> RiskComponentScore {
        if !transactions.iter().any(ClassifiedTransaction::is_compound_action) {
            return RiskComponentScore::neutral(self.component(), neutral_score);
        }
        RiskComponentScore::from_raw(self.component(), self.raw_score(transactions), neutral_score)
    }

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "component": self.component().column_name(),
            "version": self.version(),
            "risk_factors": self.risk_factors(),
        })
    }
}
