pub mod abi;
pub mod calldata;
pub mod ledger;

pub use calldata::{CalldataError, TxBuilder, TxRequest};
pub use ledger::{ChainLedger, CreatedMarket, Ledger, LedgerError};
