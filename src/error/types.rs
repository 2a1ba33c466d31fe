use std::fmt;
use thiserror::Error;

#[derive(Debug)]
pub enum AppError {
    ConfigError(String),
    ValidationError(String),
    IoError(String),
    CsvError(String),
    ExternalApiError(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::IoError(msg) => write!(f, "I/O error: {}", msg),
            AppError::CsvError(msg) => write!(f, "CSV error: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::ConfigError(format!("TOML parse error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::CsvError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApiError(format!("HTTP request error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON serialization error: {}", err))
    }
}

/// Failures reported by the transaction data provider.
///
/// These never abort a batch: the fetcher retries the transient ones and
/// degrades to empty data once the retry budget is spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Request rejected by provider: {0}")]
    Rejected(String),
}

/// Reason code carried by wallets that fell back to the default score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    ProviderUnavailable,
    RateLimited,
    MalformedResponse,
    Rejected,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::ProviderUnavailable(_) => FetchErrorKind::ProviderUnavailable,
            FetchError::RateLimited(_) => FetchErrorKind::RateLimited,
            FetchError::MalformedResponse(_) => FetchErrorKind::MalformedResponse,
            FetchError::Rejected(_) => FetchErrorKind::Rejected,
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchErrorKind::ProviderUnavailable => "provider_unavailable",
            FetchErrorKind::RateLimited => "rate_limited",
            FetchErrorKind::MalformedResponse => "malformed_response",
            FetchErrorKind::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return FetchError::MalformedResponse(err.to_string());
        }
        if let Some(status) = err.status() {
            if status.as_u16() == 429 {
                return FetchError::RateLimited(err.to_string());
            }
            if status.is_client_error() {
                return FetchError::Rejected(err.to_string());
            }
        }
        // Timeouts, connection failures and 5xx responses
        FetchError::ProviderUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedResponse(err.to_string())
    }
}
