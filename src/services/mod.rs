pub mod etherscan_client;
pub mod static_provider;
pub mod rate_limiter;
pub mod transaction_fetcher;
pub mod wallet_scoring_service;
pub mod batch_scorer;
pub mod report_service;

pub use etherscan_client::*;
pub use static_provider::*;
pub use rate_limiter::*;
pub use transaction_fetcher::*;
pub use wallet_scoring_service::WalletScoringService;
pub use batch_scorer::*;
pub use report_service::*;
