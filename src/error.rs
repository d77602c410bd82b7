//! 错误类型
//!
//! 分两层：`LedgerError` 是账本访问边界（读/写）的错误；`GardenError` 是
//! 客户端核心对外暴露的错误。未连接钱包在任何账本调用之前就被拒绝。

use thiserror::Error;

/// 账本访问层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// 查询的植物 ID 不存在
    #[error("Plant not found: {0}")]
    NotFound(u64),

    /// 交易被拒绝/回滚（携带账本给出的原因）
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// 网络层失败（RPC 不可达、超时等）
    #[error("Network error: {0}")]
    Network(String),
}

/// 客户端核心错误
#[derive(Error, Debug)]
pub enum GardenError {
    /// 无活跃钱包会话，操作未触达账本
    #[error("Wallet not connected")]
    NotConnected,

    /// 账本调用失败（用户操作链中首个失败即中止该操作）
    #[error("Ledger call failed: {0}")]
    Ledger(#[from] LedgerError),
}
