use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::AppError;

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// A validated, lower-cased 20-byte hex account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let trimmed = input.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| {
                AppError::ValidationError(format!("Address '{}' must start with 0x", trimmed))
            })?;

        let bytes = hex::decode(hex_part).map_err(|e| {
            AppError::ValidationError(format!("Address '{}' is not valid hex: {}", trimmed, e))
        })?;
        if bytes.len() != 20 {
            return Err(AppError::ValidationError(format!(
                "Address '{}' must be 20 bytes, got {}",
                trimmed,
                bytes.len()
            )));
        }

        let normalized = format!("0x{}", hex_part.to_lowercase());
        if normalized == ZERO_ADDRESS {
            return Err(AppError::ValidationError("Zero address not allowed".to_string()));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw address string from the provider.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl FromStr for WalletAddress {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
