//! 账本客户端抽象
//!
//! 所有后端（真实 RPC / Mock）实现 LedgerClient：两类读操作 + 四类写操作。
//! 所有 submit_* 都阻塞到链上确认（或终态失败）才返回，本核心不跟踪
//! pending 状态；读操作可以并发，写操作的串行化由调用方负责。

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::plant::Plant;

/// 已确认交易的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// 交易哈希
    pub tx_hash: String,
}

/// 账本客户端 trait
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// 列出某地址拥有的全部植物 ID（含死亡，不含已收获）
    async fn owned_plant_ids(&self, owner: &str) -> Result<Vec<u64>, LedgerError>;

    /// 读取单株植物快照；未创建的 ID 返回 NotFound
    async fn fetch_plant(&self, id: u64) -> Result<Plant, LedgerError>;

    /// 种植：payable，value 必须等于种植价格
    async fn submit_plant_seed(&self, owner: &str, value_wei: u64)
        -> Result<TxReceipt, LedgerError>;

    /// 浇水：重置水位检查点
    async fn submit_water(&self, owner: &str, id: u64) -> Result<TxReceipt, LedgerError>;

    /// 收获：仅 Blooming 可收，支付奖励并移出活跃集合
    async fn submit_harvest(&self, owner: &str, id: u64) -> Result<TxReceipt, LedgerError>;

    /// 阶段矫正：把记录阶段推进到账本按时间计算的当前阶段
    async fn submit_stage_sync(&self, owner: &str, id: u64) -> Result<TxReceipt, LedgerError>;
}
