use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::AppError;
use crate::models::{RiskComponent, WalletRiskResult, MAX_SCORE, MIN_SCORE};

pub const SCORES_FILE: &str = "wallet_risk_scores.csv";
pub const DETAILED_FILE: &str = "detailed_wallet_analysis.csv";

pub const SCORES_HEADER: [&str; 2] = ["wallet_id", "score"];
pub const DETAILED_HEADER: [&str; 9] = [
    "wallet_id",
    "score",
    "liquidation_risk",
    "volatility_risk",
    "concentration_risk",
    "leverage_risk",
    "behavioral_risk",
    "tx_count",
    "token_tx_count",
];

#[derive(Debug, Serialize, Deserialize)]
struct ScoreRow {
    wallet_id: String,
    score: u32,
}

#[derive(Debug, Serialize)]
struct DetailedRow<'a> {
    wallet_id: &'a str,
    score: u32,
    liquidation_risk: u32,
    volatility_risk: u32,
    concentration_risk: u32,
    leverage_risk: u32,
    behavioral_risk: u32,
    tx_count: usize,
    token_tx_count: usize,
}

impl<'a> From<&'a WalletRiskResult> for DetailedRow<'a> {
    fn from(result: &'a WalletRiskResult) -> Self {
        Self {
            wallet_id: result.wallet.as_str(),
            score: result.score,
            liquidation_risk: result.component(RiskComponent::Liquidation),
            volatility_risk: result.component(RiskComponent::Volatility),
            concentration_risk: result.component(RiskComponent::Concentration),
            leverage_risk: result.component(RiskComponent::Leverage),
            behavioral_risk: result.component(RiskComponent::Behavioral),
            tx_count: result.tx_count,
            token_tx_count: result.token_tx_count,
        }
    }
}

/// Header written up front so a run that finished no wallet still leaves a
/// well-formed file; rows are serialized without a second header.
fn writer_with_header(path: &Path, header: &[&str]) -> Result<csv::Writer<std::fs::File>, AppError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;
    Ok(writer)
}

/// Two-column deliverable: `wallet_id,score`
pub fn write_scores(path: impl AsRef<Path>, results: &[WalletRiskResult]) -> Result<(), AppError> {
    let path = path.as_ref();
    let mut writer = writer_with_header(path, &SCORES_HEADER)?;
    for result in results {
        writer.serialize(ScoreRow {
            wallet_id: result.wallet.to_string(),
            score: result.score,
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = results.len(), "Wrote wallet scores");
    Ok(())
}

/// Score, every component and both transaction counts per wallet
pub fn write_detailed(path: impl AsRef<Path>, results: &[WalletRiskResult]) -> Result<(), AppError> {
    let path = path.as_ref();
    let mut writer = writer_with_header(path, &DETAILED_HEADER)?;
    for result in results {
        writer.serialize(DetailedRow::from(result))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = results.len(), "Wrote detailed analysis");
    Ok(())
}

/// Re-reads a written scores file and checks it is fit to hand over: the
/// expected header, integral in-range scores, and no repeated wallet.
/// Returns the number of rows.
pub fn validate_deliverable(path: impl AsRef<Path>) -> Result<usize, AppError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.iter().collect::<Vec<_>>() != SCORES_HEADER {
        return Err(AppError::ValidationError(format!(
            "expected columns wallet_id,score in {}, found {:?}",
            path.display(),
            headers
        )));
    }

    let mut seen = HashSet::new();
    let mut rows = 0;
    for row in reader.deserialize::<ScoreRow>() {
        let row = row.map_err(|e| AppError::ValidationError(format!("non-integer score: {}", e)))?;
        if row.score > MAX_SCORE {
            return Err(AppError::ValidationError(format!(
                "score {} for {} outside [{}, {}]",
                row.score, row.wallet_id, MIN_SCORE, MAX_SCORE
            )));
        }
        if !seen.insert(row.wallet_id.to_lowercase()) {
            return Err(AppError::ValidationError(format!("duplicate wallet {}", row.wallet_id)));
        }
        rows += 1;
    }

    info!(path = %path.display(), rows, "Deliverable validation passed");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RiskComponentScore, WalletAddress};
    use tempfile::tempdir;

    fn result(n: u64, score: u32) -> WalletRiskResult {
        WalletRiskResult {
            wallet: WalletAddress::parse(&format!("0x{:040x}", n)).unwrap(),
            score,
            components: RiskComponent::ALL.map(|c| RiskComponentScore {
                component: c,
                value: c.index() as u32 * 100,
            }),
            tx_count: 7,
            token_tx_count: 2,
        }
    }

    #[test]
    fn test_empty_run_still_writes_headers() {
        let dir = tempdir().unwrap();
        let scores = dir.path().join(SCORES_FILE);
        let detailed = dir.path().join(DETAILED_FILE);
        write_scores(&scores, &[]).unwrap();
        write_detailed(&detailed, &[]).unwrap();

        assert_eq!(std::fs::read_to_string(&scores).unwrap(), "wallet_id,score\n");
        assert_eq!(
            std::fs::read_to_string(&detailed).unwrap().trim_end(),
            DETAILED_HEADER.join(",")
        );
        assert_eq!(validate_deliverable(&scores).unwrap(), 0);
    }

    #[test]
    fn test_scores_file_passes_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SCORES_FILE);
        write_scores(&path, &[result(1, 0), result(2, 1000), result(3, 512)]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("wallet_id,score\n"));
        assert_eq!(validate_deliverable(&path).unwrap(), 3);
    }

    #[test]
    fn test_detailed_file_has_nine_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DETAILED_FILE);
        write_detailed(&path, &[result(1, 300)]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "wallet_id,score,liquidation_risk,volatility_risk,concentration_risk,leverage_risk,behavioral_risk,tx_count,token_tx_count"
        );
        assert_eq!(
            lines.next().unwrap(),
            format!("0x{:040x},300,0,100,200,300,400,7,2", 1)
        );
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SCORES_FILE);
        write_scores(&path, &[result(1, 10), result(1, 20)]).unwrap();
        assert!(validate_deliverable(&path).is_err());
    }

    #[test]
    fn test_validation_rejects_out_of_range_and_non_integer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SCORES_FILE);

        std::fs::write(&path, "wallet_id,score\n0x0000000000000000000000000000000000000001,1001\n").unwrap();
        assert!(validate_deliverable(&path).is_err());

        std::fs::write(&path, "wallet_id,score\n0x0000000000000000000000000000000000000001,12.5\n").unwrap();
        assert!(validate_deliverable(&path).is_err());
    }

    #[test]
    fn test_validation_rejects_wrong_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SCORES_FILE);
        std::fs::write(&path, "wallet,risk\n0x0000000000000000000000000000000000000001,1\n").unwrap();
        assert!(validate_deliverable(&path).is_err());
    }
}
