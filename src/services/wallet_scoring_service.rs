use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::AppError;
use crate::models::{DefaultReason, WalletAddress, WalletOutcome, WalletStage};
use crate::protocol::{ProtocolClassifier, ProtocolRegistry};
use crate::risk::{Aggregator, RiskEngine};
use crate::services::etherscan_client::TransactionProvider;
use crate::services::rate_limiter::CallPacer;
use crate::services::transaction_fetcher::{FetchOutcome, TransactionFetcher};

/// Runs one wallet through fetch, classification and scoring.
pub struct WalletScoringService {
    fetcher: TransactionFetcher,
    classifier: ProtocolClassifier,
    engine: RiskEngine,
}

impl WalletScoringService {
    pub fn new(fetcher: TransactionFetcher, classifier: ProtocolClassifier, engine: RiskEngine) -> Self {
        Self {
            fetcher,
            classifier,
            engine,
        }
    }

    /// Wires the pipeline from loaded settings around the given provider.
    pub fn from_settings(settings: &Settings, provider: Arc<dyn TransactionProvider>) -> Result<Self, AppError> {
        let registry = match &settings.protocol.registry_path {
            Some(path) => ProtocolRegistry::from_file(path)?,
            None => ProtocolRegistry::mainnet()?,
        };
        info!(
            version = registry.version(),
            network = registry.network(),
            markets = registry.markets().len(),
            selectors = registry.selectors().len(),
            "Protocol registry ready"
        );

        let pacer = Arc::new(CallPacer::new(settings.fetcher.call_delay()));
        let fetcher = TransactionFetcher::new(
            provider,
            pacer,
            settings.fetcher.retry_config(),
            settings.fetcher.max_transactions,
        );
        let aggregator = Aggregator::new(settings.scoring.weights, settings.scoring.default_score)?;
        let engine = RiskEngine::new(aggregator);
        for calculator in engine.calculators() {
            info!(calculator = %calculator.describe(), "Risk calculator ready");
        }

        Ok(Self::new(fetcher, ProtocolClassifier::new(Arc::new(registry)), engine))
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    /// Pacer shared by every provider call this service makes
    pub fn pacer(&self) -> &CallPacer {
        self.fetcher.pacer()
    }

    pub async fn score_wallet(&self, wallet: WalletAddress) -> WalletOutcome {
        log_stage(&wallet, WalletStage::Pending);
        let fetched = self.fetcher.fetch(&wallet).await;
        log_stage(&wallet, WalletStage::Fetched);
        self.score_fetched(wallet, fetched)
    }

    /// Pure with respect to its inputs: the same fetch outcome always yields
    /// the same wallet outcome.
    pub fn score_fetched(&self, wallet: WalletAddress, fetched: FetchOutcome) -> WalletOutcome {
        let aggregator = self.engine.aggregator();
        let tx_count = fetched.normal.len();
        let token_tx_count = fetched.token.len();

        if fetched.is_total_failure() {
            let reason = match &fetched.failure {
                Some(err) => DefaultReason::FetchFailed(err.kind()),
                None => DefaultReason::NoActivity,
            };
            debug!(wallet = %wallet, reason = %reason, "Assigning default score");
            return WalletOutcome::Defaulted {
                result: aggregator.default_result(wallet, tx_count, token_tx_count),
                reason,
            };
        }

        if fetched.is_empty() {
            debug!(wallet = %wallet, "No transactions on record, assigning default score");
            return WalletOutcome::Defaulted {
                result: aggregator.default_result(wallet, 0, 0),
                reason: DefaultReason::NoActivity,
            };
        }

        let classified = self.classifier.classify(&fetched.normal, &fetched.token);
        log_stage(&wallet, WalletStage::Classified);

        let no_compound_activity = !classified.iter().any(|tx| tx.is_compound_action());
        let result = self.engine.evaluate(wallet, &classified, tx_count, token_tx_count);
        log_stage(&result.wallet, WalletStage::Scored);

        WalletOutcome::Scored {
            result,
            fetch_warning: fetched.failure,
            no_compound_activity,
        }
    }
}

pub(crate) fn log_stage(wallet: &WalletAddress, stage: WalletStage) {
    debug!(wallet = %wallet, stage = %stage, "Wallet stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchErrorKind, RetryConfig};
    use crate::models::{RawTransaction, TransactionKind};
    use crate::protocol::ProtocolRegistry;
    use crate::services::rate_limiter::CallPacer;
    use crate::services::static_provider::StaticProvider;
    use chrono::DateTime;
    use std::sync::Arc;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const CUSDC: &str = "0x39aa39c021dfbae8fac545936693ac917d5e7563";

    fn wallet() -> WalletAddress {
        WalletAddress::parse(WALLET).unwrap()
    }

    fn call(ts: i64, input: &str) -> RawTransaction {
        RawTransaction {
            hash: format!("0x{:x}", ts),
            block_number: ts as u64,
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            from: WALLET.to_string(),
            to: CUSDC.to_string(),
            value: 0,
            input: input.to_string(),
            function_name: None,
            success: true,
            is_token_transfer: false,
            token_contract: None,
            token_symbol: None,
            token_decimals: None,
        }
    }

    fn borrow(ts: i64) -> RawTransaction {
        call(ts, "0xc5ebeaec0000000000000000000000000000000000000000000000000000000005f5e100")
    }

    fn service(provider: StaticProvider) -> WalletScoringService {
        let fetcher = TransactionFetcher::new(
            Arc::new(provider),
            Arc::new(CallPacer::unpaced()),
            RetryConfig::immediate(2),
            500,
        );
        let classifier = ProtocolClassifier::new(Arc::new(ProtocolRegistry::mainnet().unwrap()));
        WalletScoringService::new(fetcher, classifier, RiskEngine::default())
    }

    #[tokio::test]
    async fn test_borrow_heavy_wallet_is_scored() {
        let txs: Vec<_> = (0..10).map(|i| borrow(1_700_000_000 + i * 3_600)).collect();
        let provider = StaticProvider::new().with_listing(&wallet(), TransactionKind::Normal, txs);

        let outcome = service(provider).score_wallet(wallet()).await;
        match &outcome {
            WalletOutcome::Scored { result, fetch_warning, no_compound_activity } => {
                assert!(result.score > 500);
                assert_eq!(result.tx_count, 10);
                assert!(fetch_warning.is_none());
                assert!(!no_compound_activity);
            }
            other => panic!("expected scored outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_down_defaults_with_reason() {
        let provider = StaticProvider::new()
            .with_failure(&wallet(), TransactionKind::Normal, FetchError::ProviderUnavailable("down".into()))
            .with_failure(&wallet(), TransactionKind::Token, FetchError::ProviderUnavailable("down".into()));

        let outcome = service(provider).score_wallet(wallet()).await;
        assert_eq!(outcome.result().score, 500);
        assert_eq!(
            outcome.default_reason(),
            Some(&DefaultReason::FetchFailed(FetchErrorKind::ProviderUnavailable))
        );
    }

    #[tokio::test]
    async fn test_empty_wallet_defaults_as_inactive() {
        let outcome = service(StaticProvider::new()).score_wallet(wallet()).await;
        assert_eq!(outcome.result().score, 500);
        assert_eq!(outcome.default_reason(), Some(&DefaultReason::NoActivity));
        assert!(!outcome.is_fetch_failure());
    }

    #[tokio::test]
    async fn test_non_compound_wallet_is_flagged() {
        let mut unrelated = call(1_700_000_000, "0x");
        unrelated.to = "0x9999999999999999999999999999999999999999".to_string();
        let provider = StaticProvider::new().with_listing(&wallet(), TransactionKind::Normal, vec![unrelated]);

        let outcome = service(provider).score_wallet(wallet()).await;
        assert!(matches!(
            outcome,
            WalletOutcome::Scored { no_compound_activity: true, .. }
        ));
        assert_eq!(outcome.result().score, 500);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_warning() {
        let provider = StaticProvider::new()
            .with_listing(&wallet(), TransactionKind::Normal, vec![borrow(1_700_000_000)])
            .with_failure(&wallet(), TransactionKind::Token, FetchError::MalformedResponse("bad".into()));

        let outcome = service(provider).score_wallet(wallet()).await;
        assert!(matches!(
            outcome,
            WalletOutcome::Scored { fetch_warning: Some(FetchError::MalformedResponse(_)), .. }
        ));
    }

    #[test]
    fn test_from_settings_rejects_bad_weights() {
        let mut settings = Settings::default();
        assert!(WalletScoringService::from_settings(&settings, Arc::new(StaticProvider::new())).is_ok());

        settings.scoring.weights.volatility = rust_decimal::Decimal::ZERO;
        assert!(WalletScoringService::from_settings(&settings, Arc::new(StaticProvider::new())).is_err());
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let svc = service(StaticProvider::new());
        let fetched = FetchOutcome {
            normal: (0..5).map(|i| borrow(1_700_000_000 + i * 600)).collect(),
            token: Vec::new(),
            failure: None,
        };
        let first = svc.score_fetched(wallet(), fetched.clone());
        let second = svc.score_fetched(wallet(), fetched);
        assert_eq!(first, second);
    }
}
