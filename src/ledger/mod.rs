//! 账本访问层：读写边界抽象与 Mock 实现

pub mod mock;
pub mod traits;

pub use mock::MockLedger;
pub use traits::{LedgerClient, TxReceipt};
