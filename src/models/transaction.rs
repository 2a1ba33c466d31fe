use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::protocol::{MarketKind, ProtocolVersion};

/// Which provider listing a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// ETH-value calls (`txlist`)
    Normal,
    /// ERC-20 transfer events (`tokentx`)
    Token,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Normal => "normal",
            TransactionKind::Token => "token",
        }
    }
}

/// One on-chain event as reported by the data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub from: String,
    pub to: String,
    /// Raw integer value: wei for normal transactions, token base units for transfers
    pub value: u128,
    /// Hex calldata, `0x` for plain transfers; empty for token transfer events
    pub input: String,
    pub function_name: Option<String>,
    pub success: bool,
    pub is_token_transfer: bool,
    pub token_contract: Option<String>,
    pub token_symbol: Option<String>,
    pub token_decimals: Option<u8>,
}

impl RawTransaction {
    /// First four calldata bytes as a lower-case `0x`-prefixed selector.
    pub fn method_selector(&self) -> Option<String> {
        let data = self.input.strip_prefix("0x").unwrap_or(&self.input);
        if data.len() < 8 || !data.is_char_boundary(8) {
            return None;
        }
        let selector = &data[..8];
        if selector.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(format!("0x{}", selector.to_lowercase()))
        } else {
            None
        }
    }

    pub fn has_calldata(&self) -> bool {
        let data = self.input.strip_prefix("0x").unwrap_or(&self.input);
        !data.is_empty()
    }

    /// Value scaled to whole units (ETH for normal transactions, token units for transfers).
    pub fn value_in_units(&self) -> f64 {
        let decimals = if self.is_token_transfer {
            self.token_decimals.unwrap_or(18)
        } else {
            18
        };
        scale_amount(self.value, decimals)
    }
}

/// Divide a raw integer amount by `10^decimals`.
pub fn scale_amount(raw: u128, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Protocol action tag assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolAction {
    Supply,
    Borrow,
    Repay,
    Redeem,
    Liquidate,
    Transfer,
    Unclassified,
}

impl fmt::Display for ProtocolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolAction::Supply => "supply",
            ProtocolAction::Borrow => "borrow",
            ProtocolAction::Repay => "repay",
            ProtocolAction::Redeem => "redeem",
            ProtocolAction::Liquidate => "liquidate",
            ProtocolAction::Transfer => "transfer",
            ProtocolAction::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

/// The Compound market or controller a transaction touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRef {
    pub address: String,
    pub name: String,
    pub version: ProtocolVersion,
    pub kind: MarketKind,
}

impl MarketRef {
    /// Controllers and reward distributors are not assets.
    pub fn is_asset_market(&self) -> bool {
        self.kind.is_asset_market()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub raw: RawTransaction,
    pub action: ProtocolAction,
    pub market: Option<MarketRef>,
    /// Amount moved by the action in whole units of the underlying, never negative
    pub amount: f64,
}

impl ClassifiedTransaction {
    pub fn is_compound_action(&self) -> bool {
        self.market.is_some() && self.action != ProtocolAction::Unclassified
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.raw.timestamp
    }
}
