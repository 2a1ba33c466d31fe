use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{with_retry, FetchError, RetryConfig};
use crate::models::{RawTransaction, TransactionKind, WalletAddress};
use crate::services::etherscan_client::TransactionProvider;
use crate::services::rate_limiter::CallPacer;

/// Both listings for one wallet. A listing that failed after all retries is
/// empty and its error is kept in `failure` (the first one, if both failed).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub normal: Vec<RawTransaction>,
    pub token: Vec<RawTransaction>,
    pub failure: Option<FetchError>,
}

impl FetchOutcome {
    pub fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.token.is_empty()
    }

    /// Nothing usable came back and at least one listing failed
    pub fn is_total_failure(&self) -> bool {
        self.failure.is_some() && self.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.normal.len() + self.token.len()
    }
}

pub struct TransactionFetcher {
    provider: Arc<dyn TransactionProvider>,
    pacer: Arc<CallPacer>,
    retry: RetryConfig,
    max_transactions: usize,
}

impl TransactionFetcher {
    pub fn new(
        provider: Arc<dyn TransactionProvider>,
        pacer: Arc<CallPacer>,
        retry: RetryConfig,
        max_transactions: usize,
    ) -> Self {
        Self {
            provider,
            pacer,
            retry,
            max_transactions: max_transactions.max(1),
        }
    }

    pub fn pacer(&self) -> &CallPacer {
        &self.pacer
    }

    /// Never fails: provider errors end up in `FetchOutcome::failure`.
    pub async fn fetch(&self, wallet: &WalletAddress) -> FetchOutcome {
        let normal = self.fetch_listing(wallet, TransactionKind::Normal).await;
        let token = self.fetch_listing(wallet, TransactionKind::Token).await;

        let mut outcome = FetchOutcome::default();
        for (kind, listing) in [(TransactionKind::Normal, normal), (TransactionKind::Token, token)] {
            match listing {
                Ok(transactions) => match kind {
                    TransactionKind::Normal => outcome.normal = transactions,
                    TransactionKind::Token => outcome.token = transactions,
                },
                Err(err) => {
                    warn!(wallet = %wallet, kind = kind.as_str(), error = %err, "Listing unavailable after retries");
                    outcome.failure.get_or_insert(err);
                }
            }
        }

        debug!(
            wallet = %wallet,
            normal = outcome.normal.len(),
            token = outcome.token.len(),
            failed = outcome.failure.is_some(),
            "Fetch complete"
        );
        outcome
    }

    async fn fetch_listing(&self, wallet: &WalletAddress, kind: TransactionKind) -> Result<Vec<RawTransaction>, FetchError> {
        let operation = format!("{} {}", kind.as_str(), wallet);
        let provider = &self.provider;
        let pacer = &self.pacer;
        let limit = self.max_transactions;

        let transactions = with_retry(&operation, &self.retry, || async move {
            pacer.wait().await;
            provider.list_transactions(wallet, kind, 1, limit).await
        })
        .await?;

        Ok(keep_most_recent(transactions, limit))
    }
}

/// Chronological order (timestamp, then block; ties keep provider order),
/// trimmed to the `limit` most recent records.
pub fn keep_most_recent(mut transactions: Vec<RawTransaction>, limit: usize) -> Vec<RawTransaction> {
    transactions.sort_by_key(|tx| (tx.timestamp, tx.block_number));
    if transactions.len() > limit {
        let excess = transactions.len() - limit;
        transactions.drain(..excess);
    }
    transactions
}
