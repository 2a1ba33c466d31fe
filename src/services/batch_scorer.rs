use futures::{future, stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::models::{WalletAddress, WalletOutcome, WalletStage};
use crate::services::wallet_scoring_service::{log_stage, WalletScoringService};
use crate::utils::time::{estimate_remaining, format_minutes};

/// Outcomes of one batch, in input order. When the run was cancelled only
/// the wallets that were already in flight are included.
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub outcomes: Vec<WalletOutcome>,
    pub requested: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
    /// Provider calls made during this run
    pub provider_calls: u64,
}

impl BatchRun {
    pub fn completed(&self) -> usize {
        self.outcomes.len()
    }
}

pub struct BatchScorer {
    service: Arc<WalletScoringService>,
    workers: usize,
    cancel: watch::Receiver<bool>,
}

impl BatchScorer {
    /// `cancel` flips to `true` to stop scheduling new wallets.
    pub fn new(service: Arc<WalletScoringService>, workers: usize, cancel: watch::Receiver<bool>) -> Self {
        Self {
            service,
            workers: workers.max(1),
            cancel,
        }
    }

    pub async fn run(&self, wallets: Vec<WalletAddress>) -> BatchRun {
        let total = wallets.len();
        let pacer = self.service.pacer();
        let calls_before = pacer.total_calls();
        let wait_before = pacer.total_wait();
        let completed = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        info!(wallets = total, workers = self.workers, "Starting batch");

        let cancel = self.cancel.clone();
        let mut finished: Vec<(usize, WalletOutcome)> = stream::iter(wallets.into_iter().enumerate())
            .take_while(move |_| future::ready(!*cancel.borrow()))
            .map(|(index, wallet)| {
                let service = self.service.clone();
                let completed = completed.clone();
                async move {
                    let outcome = service.score_wallet(wallet).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    let remaining = estimate_remaining(started.elapsed(), done, total);
                    let result = outcome.result();
                    log_stage(&result.wallet, WalletStage::Finalized);
                    info!(
                        "Completed {}/{}: {} -> {} (est. remaining {})",
                        done,
                        total,
                        result.wallet,
                        result.score,
                        format_minutes(remaining)
                    );
                    (index, outcome)
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        finished.sort_by_key(|(index, _)| *index);
        let cancelled = finished.len() < total;
        if cancelled {
            warn!(completed = finished.len(), requested = total, "Batch cancelled before completion");
        }

        let provider_calls = pacer.total_calls() - calls_before;
        info!(
            provider_calls,
            paced_wait = %format_minutes(pacer.total_wait().saturating_sub(wait_before)),
            "Provider usage"
        );

        BatchRun {
            outcomes: finished.into_iter().map(|(_, outcome)| outcome).collect(),
            requested: total,
            cancelled,
            elapsed: started.elapsed(),
            provider_calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetryConfig;
    use crate::protocol::{ProtocolClassifier, ProtocolRegistry};
    use crate::risk::RiskEngine;
    use crate::services::rate_limiter::CallPacer;
    use crate::services::static_provider::StaticProvider;
    use crate::services::transaction_fetcher::TransactionFetcher;

    fn service(provider: StaticProvider, pacing: Duration) -> Arc<WalletScoringService> {
        let fetcher = TransactionFetcher::new(
            Arc::new(provider),
            Arc::new(CallPacer::new(pacing)),
            RetryConfig::immediate(1),
            500,
        );
        let classifier = ProtocolClassifier::new(Arc::new(ProtocolRegistry::mainnet().unwrap()));
        Arc::new(WalletScoringService::new(fetcher, classifier, RiskEngine::default()))
    }

    fn wallets(n: usize) -> Vec<WalletAddress> {
        (1..=n)
            .map(|i| WalletAddress::parse(&format!("0x{:040x}", i)).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_outcomes_follow_input_order() {
        let (_tx, rx) = watch::channel(false);
        let input = wallets(12);
        let run = BatchScorer::new(service(StaticProvider::new(), Duration::ZERO), 4, rx)
            .run(input.clone())
            .await;

        assert!(!run.cancelled);
        assert_eq!(run.completed(), 12);
        // one normal and one token listing per wallet
        assert_eq!(run.provider_calls, 24);
        let order: Vec<_> = run.outcomes.iter().map(|o| o.result().wallet.clone()).collect();
        assert_eq!(order, input);
    }

    #[tokio::test]
    async fn test_cancel_before_start_processes_nothing() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let run = BatchScorer::new(service(StaticProvider::new(), Duration::ZERO), 2, rx)
            .run(wallets(5))
            .await;

        assert!(run.cancelled);
        assert_eq!(run.completed(), 0);
        assert_eq!(run.provider_calls, 0);
        assert_eq!(run.requested, 5);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_keeps_finished_wallets() {
        let (tx, rx) = watch::channel(false);
        // two calls per wallet, 20ms apart: each wallet takes about 40ms
        let scorer = BatchScorer::new(service(StaticProvider::new(), Duration::from_millis(20)), 1, rx);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(90)).await;
            tx.send(true).unwrap();
        });
        let run = scorer.run(wallets(50)).await;
        canceller.await.unwrap();

        assert!(run.cancelled);
        assert!(run.completed() >= 1 && run.completed() < 50);
        assert!(run.outcomes.iter().all(|o| o.result().score <= 1000));
    }
}
