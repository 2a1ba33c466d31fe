use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::FetchError;
use crate::models::{RawTransaction, TransactionKind, WalletAddress};
use crate::services::etherscan_client::TransactionProvider;

/// In-memory provider serving fixed listings, for offline runs, tests and
/// benchmarks. Wallets without an entry have no transactions.
#[derive(Debug, Default)]
pub struct StaticProvider {
    listings: HashMap<(WalletAddress, TransactionKind), Result<Vec<RawTransaction>, FetchError>>,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, wallet: &WalletAddress, kind: TransactionKind, transactions: Vec<RawTransaction>) -> Self {
        self.listings.insert((wallet.clone(), kind), Ok(transactions));
        self
    }

    /// Every call for this listing fails with `error`
    pub fn with_failure(mut self, wallet: &WalletAddress, kind: TransactionKind, error: FetchError) -> Self {
        self.listings.insert((wallet.clone(), kind), Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionProvider for StaticProvider {
    async fn list_transactions(
        &self,
        address: &WalletAddress,
        kind: TransactionKind,
        _page: u32,
        limit: usize,
    ) -> Result<Vec<RawTransaction>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.listings.get(&(address.clone(), kind)) {
            Some(Ok(transactions)) => Ok(transactions.iter().take(limit).cloned().collect()),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(Vec::new()),
        }
    }
}
