// Versioned Compound contract and selector tables
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::error::AppError;
use crate::models::{MarketRef, ProtocolAction};

const MAINNET_REGISTRY: &str = include_str!("../../config/compound_mainnet.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    V2,
    V3,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V2 => f.write_str("v2"),
            ProtocolVersion::V3 => f.write_str("v3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Comptroller,
    CToken,
    Comet,
    Rewards,
}

impl MarketKind {
    pub fn is_asset_market(&self) -> bool {
        matches!(self, MarketKind::CToken | MarketKind::Comet)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub address: String,
    pub name: String,
    pub version: ProtocolVersion,
    pub kind: MarketKind,
    #[serde(default)]
    pub underlying_symbol: Option<String>,
    #[serde(default)]
    pub underlying_decimals: Option<u8>,
    /// Comet base token; any other asset supplied to a comet is collateral
    #[serde(default)]
    pub base_token: Option<String>,
}

impl MarketEntry {
    pub fn to_market_ref(&self) -> MarketRef {
        MarketRef {
            address: self.address.clone(),
            name: self.name.clone(),
            version: self.version,
            kind: self.kind,
        }
    }

    pub fn decimals(&self) -> u8 {
        self.underlying_decimals.unwrap_or(18)
    }

    pub fn is_base_token(&self, asset: &str) -> bool {
        self.base_token
            .as_deref()
            .is_some_and(|base| base.eq_ignore_ascii_case(asset.trim()))
    }
}

/// An ERC-20 the protocol accepts, with the decimals its amounts use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorEntry {
    pub selector: String,
    pub signature: String,
    pub action: ProtocolAction,
    /// Index of the 32-byte calldata word holding the amount, if any
    #[serde(default)]
    pub amount_arg: Option<usize>,
    /// Index of the calldata word holding the asset address (comet calls)
    #[serde(default)]
    pub asset_arg: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    version: String,
    network: String,
    #[serde(default)]
    markets: Vec<MarketEntry>,
    #[serde(default)]
    selectors: Vec<SelectorEntry>,
    #[serde(default)]
    assets: Vec<AssetEntry>,
}

/// Lookup tables for known Compound contracts and method selectors.
///
/// Loaded from TOML so protocol upgrades only need a new table, not a rebuild.
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    version: String,
    network: String,
    markets: Vec<MarketEntry>,
    selectors: Vec<SelectorEntry>,
    assets: Vec<AssetEntry>,
    market_index: HashMap<String, usize>,
    selector_index: HashMap<String, usize>,
    asset_index: HashMap<String, usize>,
}

impl ProtocolRegistry {
    /// Built-in Ethereum mainnet tables.
    pub fn mainnet() -> Result<Self, AppError> {
        Self::from_toml_str(MAINNET_REGISTRY)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read protocol registry {}: {}",
                path.display(),
                e
            ))
        })?;
        let registry = Self::from_toml_str(&contents)?;
        info!(
            path = %path.display(),
            version = %registry.version,
            markets = registry.markets.len(),
            selectors = registry.selectors.len(),
            "Loaded protocol registry"
        );
        Ok(registry)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, AppError> {
        let file: RegistryFile = toml::from_str(contents)?;
        Self::build(file)
    }

    fn build(file: RegistryFile) -> Result<Self, AppError> {
        if file.version.trim().is_empty() {
            return Err(AppError::ConfigError("Protocol registry version is empty".to_string()));
        }

        let mut markets = Vec::with_capacity(file.markets.len());
        let mut market_index = HashMap::new();
        for mut market in file.markets {
            market.address = normalize_hex(&market.address, 20).ok_or_else(|| {
                AppError::ConfigError(format!(
                    "Invalid address '{}' for market {}",
                    market.address, market.name
                ))
            })?;
            market.base_token = match market.base_token.take() {
                Some(base) => Some(normalize_hex(&base, 20).ok_or_else(|| {
                    AppError::ConfigError(format!("Invalid base token '{}' for market {}", base, market.name))
                })?),
                None if market.kind == MarketKind::Comet => {
                    return Err(AppError::ConfigError(format!(
                        "Comet market {} has no base token",
                        market.name
                    )));
                }
                None => None,
            };
            if market_index.insert(market.address.clone(), markets.len()).is_some() {
                return Err(AppError::ConfigError(format!(
                    "Duplicate market address {} in protocol registry",
                    market.address
                )));
            }
            markets.push(market);
        }

        let mut selectors = Vec::with_capacity(file.selectors.len());
        let mut selector_index = HashMap::new();
        for mut entry in file.selectors {
            entry.selector = normalize_hex(&entry.selector, 4).ok_or_else(|| {
                AppError::ConfigError(format!(
                    "Invalid selector '{}' for {}",
                    entry.selector, entry.signature
                ))
            })?;
            if entry.action == ProtocolAction::Unclassified {
                return Err(AppError::ConfigError(format!(
                    "Selector {} maps to 'unclassified'",
                    entry.signature
                )));
            }
            if selector_index.insert(entry.selector.clone(), selectors.len()).is_some() {
                return Err(AppError::ConfigError(format!(
                    "Duplicate selector {} in protocol registry",
                    entry.selector
                )));
            }
            selectors.push(entry);
        }

        let mut assets = Vec::with_capacity(file.assets.len());
        let mut asset_index = HashMap::new();
        for mut asset in file.assets {
            asset.address = normalize_hex(&asset.address, 20).ok_or_else(|| {
                AppError::ConfigError(format!("Invalid address '{}' for asset {}", asset.address, asset.symbol))
            })?;
            if asset_index.insert(asset.address.clone(), assets.len()).is_some() {
                return Err(AppError::ConfigError(format!(
                    "Duplicate asset address {} in protocol registry",
                    asset.address
                )));
            }
            assets.push(asset);
        }

        Ok(Self {
            version: file.version,
            network: file.network,
            markets,
            selectors,
            assets,
            market_index,
            selector_index,
            asset_index,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn markets(&self) -> &[MarketEntry] {
        &self.markets
    }

    pub fn selectors(&self) -> &[SelectorEntry] {
        &self.selectors
    }

    pub fn market(&self, address: &str) -> Option<&MarketEntry> {
        self.market_index
            .get(&address.trim().to_lowercase())
            .map(|&i| &self.markets[i])
    }

    pub fn selector(&self, selector: &str) -> Option<&SelectorEntry> {
        self.selector_index
            .get(&selector.trim().to_lowercase())
            .map(|&i| &self.selectors[i])
    }

    pub fn assets(&self) -> &[AssetEntry] {
        &self.assets
    }

    pub fn asset(&self, address: &str) -> Option<&AssetEntry> {
        self.asset_index
            .get(&address.trim().to_lowercase())
            .map(|&i| &self.assets[i])
    }
}

/// Lower-case `0x`-prefixed hex of exactly `bytes` bytes.
fn normalize_hex(value: &str, bytes: usize) -> Option<String> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.len() != bytes * 2 || hex::decode(digits).is_err() {
        return None;
    }
    Some(format!("0x{}", digits.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_registry_loads() {
        let registry = ProtocolRegistry::mainnet().unwrap();
        assert!(!registry.version().is_empty());
        assert_eq!(registry.network(), "ethereum-mainnet");

        let cusdc = registry.market("0x39AA39c021dfbaE8faC545936693aC917d5E7563").unwrap();
        assert_eq!(cusdc.name, "cUSDC");
        assert_eq!(cusdc.version, ProtocolVersion::V2);
        assert_eq!(cusdc.decimals(), 6);

        let comet = registry.market("0xc3d688B66703497DAA19211EEdff47f25384cdc3").unwrap();
        assert_eq!(comet.kind, MarketKind::Comet);
        assert!(comet.is_base_token("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"));
        assert!(!comet.is_base_token("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"));

        let weth = registry.asset("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2").unwrap();
        assert_eq!(weth.symbol, "WETH");
        assert_eq!(weth.decimals, 18);

        let supply = registry.selector("0xf2b9fdb8").unwrap();
        assert_eq!(supply.asset_arg, Some(0));
        assert_eq!(supply.amount_arg, Some(1));

        let borrow = registry.selector("0xC5EBEAEC").unwrap();
        assert_eq!(borrow.action, ProtocolAction::Borrow);
        assert_eq!(borrow.amount_arg, Some(0));
    }

    #[test]
    fn test_comptroller_is_not_an_asset_market() {
        let registry = ProtocolRegistry::mainnet().unwrap();
        let comptroller = registry
            .markets()
            .iter()
            .find(|m| m.kind == MarketKind::Comptroller)
            .unwrap();
        assert!(!comptroller.to_market_ref().is_asset_market());
    }

    #[test]
    fn test_duplicate_market_rejected() {
        let toml = r#"
            version = "test"
            network = "testnet"

            [[markets]]
            address = "0x1111111111111111111111111111111111111111"
            name = "cA"
            version = "v2"
            kind = "ctoken"

            [[markets]]
            address = "0x1111111111111111111111111111111111111111"
            name = "cB"
            version = "v2"
            kind = "ctoken"
        "#;
        assert!(matches!(
            ProtocolRegistry::from_toml_str(toml),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_comet_without_base_token_rejected() {
        let toml = r#"
            version = "test"
            network = "testnet"

            [[markets]]
            address = "0x2222222222222222222222222222222222222222"
            name = "cTESTv3"
            version = "v3"
            kind = "comet"
        "#;
        assert!(matches!(
            ProtocolRegistry::from_toml_str(toml),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let toml = r#"
            version = "test"
            network = "testnet"

            [[selectors]]
            selector = "0x12"
            signature = "broken()"
            action = "supply"
        "#;
        assert!(ProtocolRegistry::from_toml_str(toml).is_err());
    }
}
