#![allow(dead_code)]

use chrono::DateTime;
use compound_risk_scorer::models::{RawTransaction, WalletAddress};

pub const CETH: &str = "0x4ddc2d193948926d02f9b1fe9e1daa0718270ed5";
pub const CUSDC: &str = "0x39aa39c021dfbae8fac545936693ac917d5e7563";
pub const CDAI: &str = "0x5d3a536e4d6dbd6114cc1ead35777bab948e3643";
pub const CWBTC: &str = "0xc11b1268c1a384e55c48c2391d8d480264a3a7f4";
pub const CUNI: &str = "0x35a18000230da775cac24873d00ff85bccded550";
pub const CUSDC_V3: &str = "0xc3d688b66703497daa19211eedff47f25384cdc3";

pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";

pub const MINT: &str = "0xa0712d68";
pub const BORROW: &str = "0xc5ebeaec";
pub const REPAY: &str = "0x0e752702";
pub const REDEEM: &str = "0xdb006a75";
pub const COMET_SUPPLY: &str = "0xf2b9fdb8";
pub const COMET_WITHDRAW: &str = "0xf3fef3a3";

pub const START: i64 = 1_700_000_000;
pub const DAY: i64 = 86_400;

pub fn wallet(n: u64) -> WalletAddress {
    WalletAddress::parse(&format!("0x{:040x}", n)).unwrap()
}

/// Selector followed by one 32-byte big-endian amount word
pub fn calldata(selector: &str, amount: u128) -> String {
    format!("{}{:064x}", selector, amount)
}

/// Comet `supply`/`withdraw(address asset, uint256 amount)` calldata
pub fn comet_calldata(selector: &str, asset: &str, amount: u128) -> String {
    format!("{}{:0>64}{:064x}", selector, asset.trim_start_matches("0x"), amount)
}

pub fn contract_call(from: &WalletAddress, to: &str, input: String, ts: i64) -> RawTransaction {
    RawTransaction {
        hash: format!("0x{:064x}", ts),
        block_number: (ts / 12) as u64,
        timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
        from: from.to_string(),
        to: to.to_string(),
        value: 0,
        input,
        function_name: None,
        success: true,
        is_token_transfer: false,
        token_contract: None,
        token_symbol: None,
        token_decimals: None,
    }
}

/// Plain ETH sent to cETH (payable mint)
pub fn eth_supply(from: &WalletAddress, wei: u128, ts: i64) -> RawTransaction {
    let mut tx = contract_call(from, CETH, "0x".to_string(), ts);
    tx.value = wei;
    tx
}

pub fn token_transfer(from: &str, to: &str, contract: &str, value: u128, decimals: u8, ts: i64) -> RawTransaction {
    RawTransaction {
        hash: format!("0x{:064x}", ts + 1),
        block_number: (ts / 12) as u64,
        timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
        from: from.to_string(),
        to: to.to_string(),
        value,
        input: String::new(),
        function_name: None,
        success: true,
        is_token_transfer: true,
        token_contract: Some(contract.to_string()),
        token_symbol: Some("cTOKEN".to_string()),
        token_decimals: Some(decimals),
    }
}

/// Ten borrows of growing size from cUSDC, two hours apart, never repaid
pub fn borrow_heavy_history(owner: &WalletAddress) -> Vec<RawTransaction> {
    (0..10)
        .map(|i| {
            let amount = (1_000 + 250 * i as u128) * 1_000_000;
            contract_call(owner, CUSDC, calldata(BORROW, amount), START + i * 7_200)
        })
        .collect()
}

/// Twenty supplies and repays spread evenly over five markets, one per day
pub fn diversified_supplier_history(owner: &WalletAddress) -> Vec<RawTransaction> {
    let markets = [(CUSDC, 6u32), (CDAI, 18), (CETH, 18), (CWBTC, 8), (CUNI, 18)];
    (0..20)
        .map(|i| {
            let (market, decimals) = markets[i % 5];
            let ts = START + i as i64 * DAY + (i as i64 * 937) % 3_600;
            let amount = (10 + 7 * i as u128) * 10u128.pow(decimals);
            if market == CETH {
                eth_supply(owner, amount, ts)
            } else if i % 2 == 0 {
                contract_call(owner, market, calldata(MINT, amount), ts)
            } else {
                contract_call(owner, market, calldata(REPAY, amount), ts)
            }
        })
        .collect()
}

/// WETH collateral into cUSDCv3, then three USDC withdrawals against it
pub fn comet_borrower_history(owner: &WalletAddress) -> Vec<RawTransaction> {
    let mut txs = vec![contract_call(
        owner,
        CUSDC_V3,
        comet_calldata(COMET_SUPPLY, WETH, 5 * 10u128.pow(18)),
        START,
    )];
    for i in 1..=3 {
        txs.push(contract_call(
            owner,
            CUSDC_V3,
            comet_calldata(COMET_WITHDRAW, USDC, 2_000 * 1_000_000),
            START + i * DAY,
        ));
    }
    txs
}
