use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderSettings;
use crate::error::{AppError, FetchError};
use crate::models::{RawTransaction, TransactionKind, WalletAddress};
use crate::utils::time::from_unix_timestamp;

/// Source of per-wallet transaction listings.
///
/// An empty list means the provider answered and the wallet has no records
/// of that kind; every failure is an `Err`.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    async fn list_transactions(
        &self,
        address: &WalletAddress,
        kind: TransactionKind,
        page: u32,
        limit: usize,
    ) -> Result<Vec<RawTransaction>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct EtherscanClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    chain_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EtherscanEnvelope {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EtherscanTx {
    hash: String,
    time_stamp: String,
    block_number: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    input: String,
    function_name: Option<String>,
    is_error: Option<String>,
    #[serde(rename = "txreceipt_status")]
    receipt_status: Option<String>,
    contract_address: Option<String>,
    token_symbol: Option<String>,
    token_decimal: Option<String>,
}

impl EtherscanClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("compound-risk-scorer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            chain_id: settings.chain_id,
        })
    }

    fn action_for(kind: TransactionKind) -> &'static str {
        match kind {
            TransactionKind::Normal => "txlist",
            TransactionKind::Token => "tokentx",
        }
    }

    fn query_params(&self, address: &WalletAddress, kind: TransactionKind, page: u32, limit: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("module", "account".to_string()),
            ("action", Self::action_for(kind).to_string()),
            ("address", address.to_string()),
            ("startblock", "0".to_string()),
            ("endblock", "99999999".to_string()),
            ("page", page.to_string()),
            ("offset", limit.to_string()),
            ("sort", "desc".to_string()),
        ];
        if let Some(chain_id) = self.chain_id {
            params.push(("chainid", chain_id.to_string()));
        }
        if let Some(api_key) = &self.api_key {
            params.push(("apikey", api_key.clone()));
        }
        params
    }
}

#[async_trait]
impl TransactionProvider for EtherscanClient {
    async fn list_transactions(
        &self,
        address: &WalletAddress,
        kind: TransactionKind,
        page: u32,
        limit: usize,
    ) -> Result<Vec<RawTransaction>, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query_params(address, kind, page, limit))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited(format!("HTTP {}", status)));
        }
        if status.is_server_error() {
            return Err(FetchError::ProviderUnavailable(format!("HTTP {}", status)));
        }
        if status.is_client_error() {
            return Err(FetchError::Rejected(format!("HTTP {}", status)));
        }

        let body = response.text().await?;
        let envelope: EtherscanEnvelope = serde_json::from_str(&body)?;
        let rows = interpret_envelope(envelope)?;

        let transactions = rows
            .into_iter()
            .map(|row| row.into_raw(kind))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            wallet = %address,
            kind = kind.as_str(),
            count = transactions.len(),
            "Fetched transaction listing"
        );
        Ok(transactions)
    }
}

fn is_rate_limit_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("rate limit") || lower.contains("too many requests")
}

fn interpret_envelope(envelope: EtherscanEnvelope) -> Result<Vec<EtherscanTx>, FetchError> {
    let result_text = envelope.result.as_str().unwrap_or_default().to_string();

    if envelope.status == "1" {
        if !envelope.result.is_array() {
            return Err(FetchError::MalformedResponse(
                "result is not a list of transactions".to_string(),
            ));
        }
        return serde_json::from_value(envelope.result).map_err(FetchError::from);
    }

    if envelope.message.to_lowercase().starts_with("no transactions found") {
        return Ok(Vec::new());
    }
    if is_rate_limit_text(&envelope.message) || is_rate_limit_text(&result_text) {
        return Err(FetchError::RateLimited(result_text));
    }
    if envelope.status == "0" {
        warn!(message = %envelope.message, result = %result_text, "Provider rejected request");
        return Err(FetchError::Rejected(format!("{}: {}", envelope.message, result_text)));
    }
    Err(FetchError::MalformedResponse(format!("unexpected status '{}'", envelope.status)))
}

/// Decimal uint256 amount. Values beyond `u128` (spam tokens minting near
/// `2^256 - 1`) saturate so the row is kept.
fn parse_value(raw: &str) -> Result<u128, FetchError> {
    let digits = raw.trim();
    if digits.is_empty() {
        return Ok(0);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FetchError::MalformedResponse(format!("bad value '{}'", raw)));
    }
    match digits.parse::<u128>() {
        Ok(value) => Ok(value),
        Err(_) => {
            debug!(value = digits, "Value exceeds u128, saturating");
            Ok(u128::MAX)
        }
    }
}

impl EtherscanTx {
    fn into_raw(self, kind: TransactionKind) -> Result<RawTransaction, FetchError> {
        let seconds: i64 = self
            .time_stamp
            .parse()
            .map_err(|_| FetchError::MalformedResponse(format!("bad timeStamp '{}'", self.time_stamp)))?;
        let timestamp = from_unix_timestamp(seconds)
            .ok_or_else(|| FetchError::MalformedResponse(format!("timeStamp out of range: {}", seconds)))?;
        let block_number: u64 = self
            .block_number
            .parse()
            .map_err(|_| FetchError::MalformedResponse(format!("bad blockNumber '{}'", self.block_number)))?;
        let value = parse_value(&self.value)?;

        let reverted = self.is_error.as_deref() == Some("1") || self.receipt_status.as_deref() == Some("0");
        let is_token_transfer = kind == TransactionKind::Token;

        Ok(RawTransaction {
            hash: self.hash,
            block_number,
            timestamp,
            from: self.from.to_lowercase(),
            to: self.to.to_lowercase(),
            value,
            input: if is_token_transfer { String::new() } else { self.input },
            function_name: self.function_name.filter(|f| !f.is_empty()),
            success: !reverted,
            is_token_transfer,
            token_contract: if is_token_transfer {
                self.contract_address.map(|a| a.to_lowercase()).filter(|a| !a.is_empty())
            } else {
                None
            },
            token_symbol: self.token_symbol.filter(|s| !s.is_empty()),
            token_decimals: self.token_decimal.and_then(|d| d.parse().ok()),
        })
    }
}
