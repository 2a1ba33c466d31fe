// Runs the five component calculators and aggregates their scores
use crate::models::{ClassifiedTransaction, RiskComponent, RiskComponentScore, WalletAddress, WalletRiskResult};
use crate::risk::aggregator::Aggregator;
use crate::risk::calculators::{
    BehavioralRiskCalculator, ConcentrationRiskCalculator, LeverageRiskCalculator, LiquidationRiskCalculator,
    VolatilityRiskCalculator,
};
use crate::risk::traits::RiskComponentCalculator;

pub struct RiskEngine {
    /// Indexed by `RiskComponent::index`
    calculators: Vec<Box<dyn RiskComponentCalculator>>,
    aggregator: Aggregator,
}

impl RiskEngine {
    pub fn new(aggregator: Aggregator) -> Self {
        let calculators: Vec<Box<dyn RiskComponentCalculator>> = vec![
            Box::new(LiquidationRiskCalculator::new()),
            Box::new(VolatilityRiskCalculator::new()),
            Box::new(ConcentrationRiskCalculator::new()),
            Box::new(LeverageRiskCalculator::new()),
            Box::new(BehavioralRiskCalculator::new()),
        ];
        debug_assert!(calculators
            .iter()
            .zip(RiskComponent::ALL)
            .all(|(calc, component)| calc.component() == component));

        Self { calculators, aggregator }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn calculators(&self) -> impl Iterator<Item = &dyn RiskComponentCalculator> {
        self.calculators.iter().map(|c| c.as_ref())
    }

    /// Component scores in canonical order
    pub fn component_scores(&self, transactions: &[ClassifiedTransaction]) -> [RiskComponentScore; 5] {
        let neutral = self.aggregator.default_score();
        RiskComponent::ALL.map(|component| self.calculators[component.index()].score(transactions, neutral))
    }

    /// Scores a wallet from its classified history. A wallet without a single
    /// transaction bypasses the calculators and gets the default result.
    pub fn evaluate(
        &self,
        wallet: WalletAddress,
        transactions: &[ClassifiedTransaction],
        tx_count: usize,
        token_tx_count: usize,
    ) -> WalletRiskResult {
        if transactions.is_empty() {
            return self.aggregator.default_result(wallet, tx_count, token_tx_count);
        }
        let components = self.component_scores(transactions);
        self.aggregator.aggregate(wallet, components, tx_count, token_tx_count)
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(Aggregator::default())
    }
}
