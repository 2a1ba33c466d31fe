pub mod wallet;
pub mod transaction;
pub mod risk_result;

pub use wallet::*;
pub use transaction::*;
pub use risk_result::*;
