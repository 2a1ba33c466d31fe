use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{AppError, RetryConfig};
use crate::risk::{RiskWeights, DEFAULT_SCORE};

pub const ENV_PREFIX: &str = "RISK";
pub const CONFIG_FILE_ENV: &str = "RISK_CONFIG_FILE";
pub const API_KEY_FALLBACK_ENV: &str = "ETHERSCAN_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub fetcher: FetcherSettings,
    pub scoring: ScoringSettings,
    pub batch: BatchSettings,
    pub protocol: ProtocolSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// Sent as `chainid` when set (multichain endpoints)
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherSettings {
    /// Minimum spacing between the start of two provider calls
    pub call_delay_ms: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_factor: f64,
    /// Most recent records kept per listing
    pub max_transactions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    pub weights: RiskWeights,
    pub default_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    pub workers: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Alternate registry TOML; the embedded mainnet tables are used when unset
    pub registry_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    /// json, pretty or compact
    pub format: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            base_url: "https://api.etherscan.io/api".to_string(),
            api_key: None,
            timeout_seconds: 30,
            chain_id: None,
        }
    }
}

impl Default for FetcherSettings {
    fn default() -> Self {
        FetcherSettings {
            call_delay_ms: 300,
            max_attempts: 3,
            base_backoff_ms: 500,
            max_backoff_ms: 8_000,
            jitter_factor: 0.2,
            max_transactions: 500,
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings {
            weights: RiskWeights::default(),
            default_score: DEFAULT_SCORE,
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings { workers: 1 }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl FetcherSettings {
    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_backoff_ms,
            max_delay_ms: self.max_backoff_ms,
            jitter_factor: self.jitter_factor,
            ..RetryConfig::default()
        }
    }
}

impl Settings {
    /// Load settings with precedence: built-in defaults, then the TOML file
    /// (explicit path or `RISK_CONFIG_FILE`), then `RISK__SECTION__KEY`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_FILE_ENV).ok().filter(|p| !p.is_empty()).map(PathBuf::from));

        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        if let Some(file) = &file {
            info!(path = %file.display(), "Loading configuration file");
            builder = builder.add_source(File::from(file.as_path()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.apply_api_key_fallback();
        Ok(settings)
    }

    fn apply_api_key_fallback(&mut self) {
        let missing = self.provider.api_key.as_deref().map_or(true, str::is_empty);
        if missing {
            self.provider.api_key = env::var(API_KEY_FALLBACK_ENV).ok().filter(|k| !k.is_empty());
        }
    }
}
