pub mod liquidation;
pub mod volatility;
pub mod concentration;
pub mod leverage;
pub mod behavioral;

pub use liquidation::LiquidationRiskCalculator;
pub use volatility::VolatilityRiskCalculator;
pub use concentration::ConcentrationRiskCalculator;
pub use leverage::LeverageRiskCalculator;
pub use behavioral::BehavioralRiskCalculator;

use crate::models::{ClassifiedTransaction, ProtocolAction};

/// Counts and summed amounts of Compound actions, plus the position of the
/// last borrow and repay in the chronological sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ActionTally {
    pub actions: usize,
    pub supplies: usize,
    pub borrows: usize,
    pub repays: usize,
    pub liquidations: usize,
    pub supplied_amount: f64,
    pub borrowed_amount: f64,
    pub last_borrow: Option<usize>,
    pub last_repay: Option<usize>,
}

impl ActionTally {
    pub fn from_transactions(transactions: &[ClassifiedTransaction]) -> Self {
        let mut tally = Self::default();
        for (position, tx) in transactions.iter().enumerate() {
            if !tx.is_compound_action() {
                continue;
            }
            tally.actions += 1;
            match tx.action {
                ProtocolAction::Supply => {
                    tally.supplies += 1;
                    tally.supplied_amount += tx.amount;
                }
                ProtocolAction::Borrow => {
                    tally.borrows += 1;
                    tally.borrowed_amount += tx.amount;
                    tally.last_borrow = Some(position);
                }
                ProtocolAction::Repay => {
                    tally.repays += 1;
                    tally.last_repay = Some(position);
                }
                ProtocolAction::Liquidate => tally.liquidations += 1,
                ProtocolAction::Redeem | ProtocolAction::Transfer | ProtocolAction::Unclassified => {}
            }
        }
        tally
    }

    /// A borrow happened after the most recent repay
    pub fn has_open_borrow(&self) -> bool {
        match (self.last_borrow, self.last_repay) {
            (Some(borrow), Some(repay)) => borrow > repay,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::DateTime;

    use crate::models::{ClassifiedTransaction, MarketRef, ProtocolAction, RawTransaction};
    use crate::protocol::{MarketKind, ProtocolVersion};

    pub fn market(name: &str) -> MarketRef {
        MarketRef {
            address: format!("0x{:0>40}", hex_name(name)),
            name: name.to_string(),
            version: ProtocolVersion::V2,
            kind: MarketKind::CToken,
        }
    }

    pub fn action(action: ProtocolAction, market_name: &str, amount: f64, ts: i64) -> ClassifiedTransaction {
        ClassifiedTransaction {
            raw: raw(ts, false),
            action,
            market: Some(market(market_name)),
            amount,
        }
    }

    pub fn unrelated(amount: f64, ts: i64) -> ClassifiedTransaction {
        ClassifiedTransaction {
            raw: raw(ts, false),
            action: ProtocolAction::Unclassified,
            market: None,
            amount,
        }
    }

    pub fn raw(ts: i64, is_token_transfer: bool) -> RawTransaction {
        RawTransaction {
            hash: format!("0x{:064x}", ts),
            block_number: ts as u64 / 12,
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            from: "0x1234567890123456789012345678901234567890".to_string(),
            to: "0x9999999999999999999999999999999999999999".to_string(),
            value: 0,
            input: "0x".to_string(),
            function_name: None,
            success: true,
            is_token_transfer,
            token_contract: None,
            token_symbol: None,
            token_decimals: None,
        }
    }

    fn hex_name(name: &str) -> String {
        name.bytes().map(|b| format!("{:02x}", b)).collect()
    }
}
