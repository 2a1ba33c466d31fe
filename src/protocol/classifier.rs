use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::models::{scale_amount, ClassifiedTransaction, ProtocolAction, RawTransaction};
use crate::protocol::{MarketEntry, MarketKind, ProtocolRegistry, SelectorEntry};

/// Tags raw provider transactions with the Compound action they perform.
///
/// Classification is total: every input record yields exactly one output
/// record, so per-wallet counts stay consistent with the raw data.
#[derive(Debug, Clone)]
pub struct ProtocolClassifier {
    registry: Arc<ProtocolRegistry>,
}

impl ProtocolClassifier {
    pub fn new(registry: Arc<ProtocolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// Merge both listings into one chronological sequence of classified records.
    /// Ties on timestamp keep normal transactions ahead of token transfers and
    /// otherwise preserve input order. Comet base-asset legs are then retagged
    /// as borrows and repays from the inferred position.
    pub fn classify(
        &self,
        normal: &[RawTransaction],
        token: &[RawTransaction],
    ) -> Vec<ClassifiedTransaction> {
        let mut keyed: Vec<(i64, u8, usize, ClassifiedTransaction)> =
            Vec::with_capacity(normal.len() + token.len());

        for (i, tx) in normal.iter().enumerate() {
            keyed.push((tx.timestamp.timestamp(), 0, i, self.classify_normal(tx)));
        }
        for (i, tx) in token.iter().enumerate() {
            keyed.push((tx.timestamp.timestamp(), 1, i, self.classify_token(tx)));
        }

        keyed.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

        let mut classified: Vec<ClassifiedTransaction> =
            keyed.into_iter().map(|(_, _, _, tx)| tx).collect();
        self.infer_comet_positions(&mut classified);

        debug!(
            total = classified.len(),
            compound_actions = classified.iter().filter(|t| t.is_compound_action()).count(),
            registry_version = self.registry.version(),
            "Classified transactions"
        );

        classified
    }

    pub fn classify_normal(&self, tx: &RawTransaction) -> ClassifiedTransaction {
        let Some(market) = self.registry.market(&tx.to) else {
            return unclassified(tx, None);
        };

        // A reverted call changed no position
        if !tx.success {
            return unclassified(tx, Some(market));
        }

        if let Some(selector) = tx.method_selector() {
            if let Some(entry) = self.registry.selector(&selector) {
                let amount = if market.kind == MarketKind::Comet && entry.asset_arg.is_some() {
                    self.comet_amount(tx, market, entry)
                } else {
                    entry
                        .amount_arg
                        .and_then(|arg| decode_amount_arg(&tx.input, arg, market.decimals()))
                }
                .unwrap_or_else(|| tx.value_in_units());
                return ClassifiedTransaction {
                    raw: tx.clone(),
                    action: entry.action,
                    market: Some(market.to_market_ref()),
                    amount: non_negative(amount),
                };
            }
            return unclassified(tx, Some(market));
        }

        // Plain ETH sent to a market contract (cETH fallback mints)
        if !tx.has_calldata() && tx.value > 0 {
            return ClassifiedTransaction {
                raw: tx.clone(),
                action: ProtocolAction::Supply,
                market: Some(market.to_market_ref()),
                amount: non_negative(tx.value_in_units()),
            };
        }

        unclassified(tx, Some(market))
    }

    pub fn classify_token(&self, tx: &RawTransaction) -> ClassifiedTransaction {
        let token_market = tx
            .token_contract
            .as_deref()
            .and_then(|contract| self.registry.market(contract));

        if let Some(market) = token_market {
            // cToken mints are emitted from the market itself, redeems are sent back to it
            let action = if market.address.eq_ignore_ascii_case(tx.from.trim()) {
                ProtocolAction::Supply
            } else if market.address.eq_ignore_ascii_case(tx.to.trim()) {
                ProtocolAction::Redeem
            } else {
                ProtocolAction::Transfer
            };
            return ClassifiedTransaction {
                raw: tx.clone(),
                action,
                market: Some(market.to_market_ref()),
                amount: non_negative(tx.value_in_units()),
            };
        }

        // Underlying tokens flowing into or out of a market
        let counterparty = self
            .registry
            .market(&tx.to)
            .or_else(|| self.registry.market(&tx.from));
        match counterparty {
            Some(market) => ClassifiedTransaction {
                raw: tx.clone(),
                action: ProtocolAction::Transfer,
                market: Some(market.to_market_ref()),
                amount: non_negative(tx.value_in_units()),
            },
            None => unclassified(tx, None),
        }
    }
}

impl ProtocolClassifier {
    /// Amount of a comet call, scaled by the decimals of the asset it names.
    /// Unknown collateral yields `None`.
    fn comet_amount(&self, tx: &RawTransaction, market: &MarketEntry, entry: &SelectorEntry) -> Option<f64> {
        let asset = decode_address_arg(&tx.input, entry.asset_arg?)?;
        let decimals = if market.is_base_token(&asset) {
            market.decimals()
        } else {
            self.registry.asset(&asset)?.decimals
        };
        decode_amount_arg(&tx.input, entry.amount_arg?, decimals)
    }

    /// A successful comet supply or withdraw of the comet's base token
    fn is_base_asset_leg(&self, tx: &ClassifiedTransaction) -> bool {
        if tx.raw.is_token_transfer || !matches!(tx.action, ProtocolAction::Supply | ProtocolAction::Redeem) {
            return false;
        }
        let Some(market) = tx.market.as_ref().and_then(|m| self.registry.market(&m.address)) else {
            return false;
        };
        if market.kind != MarketKind::Comet {
            return false;
        }
        tx.raw
            .method_selector()
            .and_then(|selector| self.registry.selector(&selector))
            .and_then(|entry| entry.asset_arg)
            .and_then(|arg| decode_address_arg(&tx.raw.input, arg))
            .is_some_and(|asset| market.is_base_token(&asset))
    }

    /// Compound V3 has no borrow or repay call. Withdrawing more base asset
    /// than was supplied borrows the rest; supplying base asset while in debt
    /// repays it.
    fn infer_comet_positions(&self, classified: &mut [ClassifiedTransaction]) {
        let mut positions: HashMap<String, CometPosition> = HashMap::new();
        for tx in classified.iter_mut() {
            if !self.is_base_asset_leg(tx) {
                continue;
            }
            let Some(market) = tx.market.as_ref() else {
                continue;
            };
            let position = positions.entry(market.address.clone()).or_default();
            tx.action = position.apply(tx.action, tx.amount);
        }
    }
}

/// Base-asset balance of one account in one comet, in whole units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CometPosition {
    supplied: f64,
    borrowed: f64,
}

impl CometPosition {
    /// Applies one base-asset leg and returns its action. A zero amount is the
    /// `uint256` max sentinel: it repays the whole debt or withdraws the whole balance.
    fn apply(&mut self, action: ProtocolAction, amount: f64) -> ProtocolAction {
        match action {
            ProtocolAction::Supply if self.borrowed > 0.0 => {
                let repaid = if amount > 0.0 { amount.min(self.borrowed) } else { self.borrowed };
                self.borrowed -= repaid;
                self.supplied += (amount - repaid).max(0.0);
                ProtocolAction::Repay
            }
            ProtocolAction::Supply => {
                self.supplied += amount;
                ProtocolAction::Supply
            }
            ProtocolAction::Redeem if amount == 0.0 || amount <= self.supplied => {
                self.supplied = if amount == 0.0 { 0.0 } else { self.supplied - amount };
                ProtocolAction::Redeem
            }
            ProtocolAction::Redeem => {
                self.borrowed += amount - self.supplied;
                self.supplied = 0.0;
                ProtocolAction::Borrow
            }
            other => other,
        }
    }
}

fn unclassified(tx: &RawTransaction, market: Option<&MarketEntry>) -> ClassifiedTransaction {
    ClassifiedTransaction {
        raw: tx.clone(),
        action: ProtocolAction::Unclassified,
        market: market.map(MarketEntry::to_market_ref),
        amount: non_negative(tx.value_in_units()),
    }
}

fn non_negative(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// Read the `arg`-th 32-byte word after the selector as an unsigned amount.
///
/// Words that do not fit in 128 bits (including the `uint256(-1)` "repay all"
/// sentinel) carry no usable magnitude and yield `None`.
pub fn decode_amount_arg(input: &str, arg: usize, decimals: u8) -> Option<f64> {
    let data = input.strip_prefix("0x").unwrap_or(input);
    let start = 8 + arg * 64;
    let word = data.get(start..start + 64)?;
    let bytes = hex::decode(word).ok()?;
    if bytes[..16].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&bytes[16..]);
    Some(scale_amount(u128::from_be_bytes(low), decimals))
}

/// Read the `arg`-th 32-byte word after the selector as an address.
pub fn decode_address_arg(input: &str, arg: usize) -> Option<String> {
    let data = input.strip_prefix("0x").unwrap_or(input);
    let start = 8 + arg * 64;
    let word = data.get(start..start + 64)?;
    let (padding, address) = word.split_at(24);
    if !padding.bytes().all(|b| b == b'0') || hex::decode(address).is_err() {
        return None;
    }
    Some(format!("0x{}", address.to_lowercase()))
}
