use thiserror::Error;
use url::Url;

use crate::config::settings::Settings;
use crate::error::AppError;
use crate::models::MAX_SCORE;

#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid range: {field} must be between {min} and {max}, got {value}")]
    InvalidRange { field: String, min: f64, max: f64, value: f64 },
    #[error("Invalid format: {field} - {message}")]
    InvalidFormat { field: String, message: String },
}

pub type ValidationResult<T> = Result<T, ConfigValidationError>;

impl From<ConfigValidationError> for AppError {
    fn from(err: ConfigValidationError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Bounds applied to loaded settings
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub workers_range: (usize, usize),
    pub max_attempts_range: (u32, u32),
    pub max_transactions_range: (usize, usize),
    pub timeout_range: (u64, u64),
    pub log_formats: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            workers_range: (1, 64),
            max_attempts_range: (1, 10),
            max_transactions_range: (1, 10_000),
            timeout_range: (1, 300),
            log_formats: vec!["json".to_string(), "pretty".to_string(), "compact".to_string()],
        }
    }
}

/// Rejects configuration that would make a run meaningless before any
/// wallet is processed.
pub struct ConfigValidator {
    rules: ValidationRules,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self {
            rules: ValidationRules::default(),
        }
    }

    pub fn with_rules(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn validate(&self, settings: &Settings) -> Result<(), AppError> {
        self.validate_provider(settings)?;
        self.validate_fetcher(settings)?;
        self.validate_scoring(settings)?;
        self.validate_batch(settings)?;
        self.validate_logging(settings)?;
        Ok(())
    }

    fn validate_provider(&self, settings: &Settings) -> ValidationResult<()> {
        let url = Url::parse(&settings.provider.base_url)
            .map_err(|e| ConfigValidationError::InvalidUrl(format!("provider.base_url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigValidationError::InvalidFormat {
                field: "provider.base_url".to_string(),
                message: format!("Unsupported scheme: {}", url.scheme()),
            });
        }

        self.validate_range(
            settings.provider.timeout_seconds as f64,
            self.rules.timeout_range.0 as f64,
            self.rules.timeout_range.1 as f64,
            "provider.timeout_seconds",
        )
    }

    fn validate_fetcher(&self, settings: &Settings) -> ValidationResult<()> {
        let fetcher = &settings.fetcher;
        self.validate_range(
            fetcher.max_attempts as f64,
            self.rules.max_attempts_range.0 as f64,
            self.rules.max_attempts_range.1 as f64,
            "fetcher.max_attempts",
        )?;
        self.validate_range(
            fetcher.max_transactions as f64,
            self.rules.max_transactions_range.0 as f64,
            self.rules.max_transactions_range.1 as f64,
            "fetcher.max_transactions",
        )?;
        self.validate_range(fetcher.jitter_factor, 0.0, 1.0, "fetcher.jitter_factor")?;

        if fetcher.max_backoff_ms < fetcher.base_backoff_ms {
            return Err(ConfigValidationError::InvalidFormat {
                field: "fetcher.max_backoff_ms".to_string(),
                message: "max_backoff_ms must be >= base_backoff_ms".to_string(),
            });
        }
        Ok(())
    }

    fn validate_scoring(&self, settings: &Settings) -> Result<(), AppError> {
        settings.scoring.weights.validate()?;
        self.validate_range(
            settings.scoring.default_score as f64,
            0.0,
            MAX_SCORE as f64,
            "scoring.default_score",
        )?;
        Ok(())
    }

    fn validate_batch(&self, settings: &Settings) -> ValidationResult<()> {
        self.validate_range(
            settings.batch.workers as f64,
            self.rules.workers_range.0 as f64,
            self.rules.workers_range.1 as f64,
            "batch.workers",
        )
    }

    fn validate_logging(&self, settings: &Settings) -> ValidationResult<()> {
        let format = settings.logging.format.to_lowercase();
        if !self.rules.log_formats.contains(&format) {
            return Err(ConfigValidationError::InvalidFormat {
                field: "logging.format".to_string(),
                message: format!("expected one of {:?}, got {}", self.rules.log_formats, settings.logging.format),
            });
        }
        Ok(())
    }

    fn validate_range(&self, value: f64, min: f64, max: f64, field: &str) -> ValidationResult<()> {
        if value < min || value > max {
            return Err(ConfigValidationError::InvalidRange {
                field: field.to_string(),
                min,
                max,
                value,
            });
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
