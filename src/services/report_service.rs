use serde::Serialize;
use std::cmp::Reverse;
use tracing::info;

use crate::models::{DefaultReason, RiskComponent, WalletOutcome, WalletRiskResult};
use crate::utils::math::{mean, median, standard_deviation};

const TOP_N: usize = 10;

/// Score bands used in the distribution report, inclusive on both ends.
pub const RISK_BANDS: [(&str, u32, u32); 5] = [
    ("low", 0, 200),
    ("medium_low", 201, 400),
    ("medium", 401, 600),
    ("high", 601, 800),
    ("critical", 801, 1000),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionBucket {
    pub label: &'static str,
    pub lower: u32,
    pub upper: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedWallet {
    pub wallet: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentAverage {
    pub component: RiskComponent,
    pub average: f64,
}

/// Aggregate statistics over one batch of wallet outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_wallets: usize,
    pub scored: usize,
    pub defaulted_fetch_failure: usize,
    pub defaulted_no_activity: usize,
    pub no_compound_activity: usize,
    pub partial_fetches: usize,
    pub mean_score: f64,
    pub median_score: f64,
    pub min_score: u32,
    pub max_score: u32,
    /// Population standard deviation
    pub std_dev: f64,
    pub distribution: Vec<DistributionBucket>,
    pub riskiest: Vec<RankedWallet>,
    pub safest: Vec<RankedWallet>,
    pub average_components: Vec<ComponentAverage>,
    pub average_tx_count: f64,
    pub average_token_tx_count: f64,
    /// Share of wallets with at least one Compound action
    pub active_wallet_share: f64,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[WalletOutcome]) -> Self {
        let results: Vec<&WalletRiskResult> = outcomes.iter().map(WalletOutcome::result).collect();
        let scores: Vec<f64> = results.iter().map(|r| r.score as f64).collect();

        let mut scored = 0;
        let mut defaulted_fetch_failure = 0;
        let mut defaulted_no_activity = 0;
        let mut no_compound_activity = 0;
        let mut partial_fetches = 0;
        for outcome in outcomes {
            match outcome {
                WalletOutcome::Scored { fetch_warning, no_compound_activity: none, .. } => {
                    scored += 1;
                    if *none {
                        no_compound_activity += 1;
                    }
                    if fetch_warning.is_some() {
                        partial_fetches += 1;
                    }
                }
                WalletOutcome::Defaulted { reason: DefaultReason::FetchFailed(_), .. } => defaulted_fetch_failure += 1,
                WalletOutcome::Defaulted { reason: DefaultReason::NoActivity, .. } => defaulted_no_activity += 1,
            }
        }
        let active = scored - no_compound_activity;

        let distribution = RISK_BANDS
            .iter()
            .map(|&(label, lower, upper)| DistributionBucket {
                label,
                lower,
                upper,
                count: results.iter().filter(|r| r.score >= lower && r.score <= upper).count(),
            })
            .collect();

        let ranked = |r: &&WalletRiskResult| RankedWallet {
            wallet: r.wallet.to_string(),
            score: r.score,
        };
        let mut by_risk = results.clone();
        by_risk.sort_by_key(|r| (Reverse(r.score), r.wallet.clone()));
        let riskiest = by_risk.iter().take(TOP_N).map(ranked).collect();
        by_risk.sort_by_key(|r| (r.score, r.wallet.clone()));
        let safest = by_risk.iter().take(TOP_N).map(ranked).collect();

        let average_components = RiskComponent::ALL
            .iter()
            .map(|component| {
                let values: Vec<f64> = results.iter().map(|r| r.component(*component) as f64).collect();
                ComponentAverage {
                    component: *component,
                    average: mean(&values).unwrap_or(0.0),
                }
            })
            .collect();

        let tx_counts: Vec<f64> = results.iter().map(|r| r.tx_count as f64).collect();
        let token_counts: Vec<f64> = results.iter().map(|r| r.token_tx_count as f64).collect();

        Self {
            total_wallets: outcomes.len(),
            scored,
            defaulted_fetch_failure,
            defaulted_no_activity,
            no_compound_activity,
            partial_fetches,
            mean_score: mean(&scores).unwrap_or(0.0),
            median_score: median(&scores).unwrap_or(0.0),
            min_score: results.iter().map(|r| r.score).min().unwrap_or(0),
            max_score: results.iter().map(|r| r.score).max().unwrap_or(0),
            std_dev: standard_deviation(&scores),
            distribution,
            riskiest,
            safest,
            average_components,
            average_tx_count: mean(&tx_counts).unwrap_or(0.0),
            average_token_tx_count: mean(&token_counts).unwrap_or(0.0),
            active_wallet_share: if outcomes.is_empty() {
                0.0
            } else {
                active as f64 / outcomes.len() as f64
            },
        }
    }

    pub fn log(&self) {
        info!(
            total = self.total_wallets,
            scored = self.scored,
            fetch_failures = self.defaulted_fetch_failure,
            no_activity = self.defaulted_no_activity,
            no_compound_activity = self.no_compound_activity,
            partial_fetches = self.partial_fetches,
            "Batch outcome counts"
        );
        info!(
            mean = self.mean_score,
            median = self.median_score,
            min = self.min_score,
            max = self.max_score,
            std_dev = self.std_dev,
            "Risk score statistics"
        );
        for bucket in &self.distribution {
            let share = if self.total_wallets == 0 {
                0.0
            } else {
                bucket.count as f64 * 100.0 / self.total_wallets as f64
            };
            info!("{} risk ({}-{}): {} wallets ({:.1}%)", bucket.label, bucket.lower, bucket.upper, bucket.count, share);
        }
        for entry in &self.riskiest {
            info!(wallet = %entry.wallet, score = entry.score, "Riskiest");
        }
        for entry in &self.safest {
            info!(wallet = %entry.wallet, score = entry.score, "Safest");
        }
        for avg in &self.average_components {
            info!(component = %avg.component, average = avg.average, "Average component score");
        }
        info!(
            avg_tx = self.average_tx_count,
            avg_token_tx = self.average_token_tx_count,
            active_share = self.active_wallet_share,
            "Transaction statistics"
        );
    }
}
