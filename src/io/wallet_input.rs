use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::WalletAddress;

/// Header names recognised as the wallet column, compared case-insensitively
pub const WALLET_COLUMNS: [&str; 4] = ["wallet_id", "wallet_address", "address", "wallet"];

/// Wallets read from an input file along with what was dropped on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletList {
    pub wallets: Vec<WalletAddress>,
    pub column: String,
    pub invalid: Vec<String>,
    pub duplicates: usize,
}

pub fn read_wallets(path: impl AsRef<Path>) -> Result<WalletList, AppError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| AppError::IoError(format!("cannot open {}: {}", path.display(), e)))?;
    let list = read_wallets_from(file)?;
    info!(
        path = %path.display(),
        column = %list.column,
        wallets = list.wallets.len(),
        invalid = list.invalid.len(),
        duplicates = list.duplicates,
        "Loaded wallet list"
    );
    Ok(list)
}

/// Picks the wallet column (falling back to the first column), trims and
/// validates every value, skips blanks and invalid addresses, and keeps the
/// first occurrence of duplicates.
pub fn read_wallets_from<R: std::io::Read>(reader: R) -> Result<WalletList, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() {
        return Err(AppError::ValidationError("input has no columns".to_string()));
    }

    let index = headers
        .iter()
        .position(|h| WALLET_COLUMNS.iter().any(|c| h.eq_ignore_ascii_case(c)))
        .unwrap_or(0);
    let column = headers.get(index).unwrap_or_default().to_string();

    let mut list = WalletList {
        column,
        ..WalletList::default()
    };
    let mut seen = HashSet::new();

    for record in csv_reader.records() {
        let record = record?;
        let Some(raw) = record.get(index).map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        match WalletAddress::parse(raw) {
            Ok(wallet) => {
                if seen.insert(wallet.clone()) {
                    list.wallets.push(wallet);
                } else {
                    list.duplicates += 1;
                }
            }
            Err(err) => {
                warn!(value = raw, error = %err, "Skipping invalid wallet address");
                list.invalid.push(raw.to_string());
            }
        }
    }

    Ok(list)
}
