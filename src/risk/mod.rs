// Risk scoring: component calculators, weights and the aggregator

pub mod traits;
pub mod calculators;
pub mod weights;
pub mod aggregator;
pub mod engine;

pub use traits::RiskComponentCalculator;
pub use calculators::*;
pub use weights::RiskWeights;
pub use aggregator::{Aggregator, DEFAULT_SCORE};
pub use engine::RiskEngine;
