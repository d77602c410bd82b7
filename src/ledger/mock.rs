//! Mock 账本（用于测试与本地演示，无需链）
//!
//! 在内存里执行合约的写语义：种植收取定价、浇水前先按流逝时间结算水位
//! （归零则标记死亡并拒绝）、收获只接受 Blooming 并支付奖励、阶段矫正把
//! 记录阶段推进到按时间计算的期望阶段。
//!
//! 测试钩子：按序记录每次写调用、注入单次失败、回拨时间戳（免得测试
//! 真的等一个生长周期）、可选的提交延迟（模拟慢链）。

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::GrowthRules;
use crate::error::LedgerError;
use crate::growth;
use crate::ledger::traits::{LedgerClient, TxReceipt};
use crate::plant::{GrowthStage, Plant};

struct Inner {
    plants: HashMap<u64, Plant>,
    next_id: u64,
    next_tx: u64,
    /// 每个地址累计收到的收获奖励（wei）
    rewards: HashMap<String, u64>,
    /// 按序记录的写调用（"stage_sync:2"、"water:2"、"harvest:1"、"plant_seed"）
    call_log: Vec<String>,
    /// 注入的单次失败，命中即消耗
    fail_once: HashSet<String>,
}

/// 内存账本
pub struct MockLedger {
    rules: GrowthRules,
    /// 每次 submit 前的人工延迟（模拟出块等待）
    latency: Duration,
    inner: Mutex<Inner>,
}

impl MockLedger {
    pub fn new(rules: GrowthRules) -> Self {
        Self {
            rules,
            latency: Duration::ZERO,
            inner: Mutex::new(Inner {
                plants: HashMap::new(),
                next_id: 0,
                next_tx: 0,
                rewards: HashMap::new(),
                call_log: Vec::new(),
                fail_once: HashSet::new(),
            }),
        }
    }

    /// 给每次写操作加固定延迟（测试并发护栏时用）
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 把种植时刻回拨 secs 秒（连带浇水时刻，保持两个锚点一致地「变老」）
    pub async fn backdate_planting(&self, id: u64, secs: i64) {
        let mut inner = self.inner.lock().await;
        if let Some(p) = inner.plants.get_mut(&id) {
            p.planted_at -= secs;
            p.last_watered_at -= secs;
        }
    }

    /// 只回拨浇水时刻（制造水位消耗）
    pub async fn backdate_watering(&self, id: u64, secs: i64) {
        let mut inner = self.inner.lock().await;
        if let Some(p) = inner.plants.get_mut(&id) {
            p.last_watered_at -= secs;
        }
    }

    /// 注入一次失败：下一次 `op:id` 调用返回 Rejected
    pub async fn fail_next(&self, op: &str, id: u64) {
        self.inner.lock().await.fail_once.insert(format!("{}:{}", op, id));
    }

    /// 按序返回至今的全部写调用
    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.call_log.clone()
    }

    /// 某地址累计收到的收获奖励（wei）
    pub async fn rewards_paid(&self, owner: &str) -> u64 {
        self.inner.lock().await.rewards.get(owner).copied().unwrap_or(0)
    }

    async fn settle(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

impl Inner {
    fn receipt(&mut self) -> TxReceipt {
        self.next_tx += 1;
        TxReceipt {
            tx_hash: format!("0x{:064x}", self.next_tx),
        }
    }

    fn take_injected_failure(&mut self, key: &str) -> Result<(), LedgerError> {
        if self.fail_once.remove(key) {
            return Err(LedgerError::Rejected(format!("Injected failure: {}", key)));
        }
        Ok(())
    }

    fn owned_plant_mut(&mut self, owner: &str, id: u64) -> Result<&mut Plant, LedgerError> {
        let plant = self.plants.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        if !plant.exists {
            return Err(LedgerError::Rejected("Plant does not exist".into()));
        }
        if plant.owner != owner {
            return Err(LedgerError::Rejected("Not plant owner".into()));
        }
        Ok(plant)
    }
}

#[async_trait::async_trait]
impl LedgerClient for MockLedger {
    async fn owned_plant_ids(&self, owner: &str) -> Result<Vec<u64>, LedgerError> {
        let mut inner = self.inner.lock().await;
        inner.take_injected_failure("owned_plant_ids:0")?;
        let mut ids: Vec<u64> = inner
            .plants
            .values()
            .filter(|p| p.owner == owner)
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn fetch_plant(&self, id: u64) -> Result<Plant, LedgerError> {
        let mut inner = self.inner.lock().await;
        inner.take_injected_failure(&format!("fetch:{}", id))?;
        inner.plants.get(&id).cloned().ok_or(LedgerError::NotFound(id))
    }

    async fn submit_plant_seed(
        &self,
        owner: &str,
        value_wei: u64,
    ) -> Result<TxReceipt, LedgerError> {
        self.settle().await;
        let mut inner = self.inner.lock().await;
        inner.call_log.push("plant_seed".into());
        if value_wei != self.rules.seed_price_wei {
            return Err(LedgerError::Rejected("Incorrect payment".into()));
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let now = Self::now();
        inner.plants.insert(
            id,
            Plant {
                id,
                owner: owner.to_string(),
                stage: GrowthStage::Seed,
                planted_at: now,
                last_watered_at: now,
                water_level: 100,
                exists: true,
                is_dead: false,
            },
        );
        Ok(inner.receipt())
    }

    async fn submit_water(&self, owner: &str, id: u64) -> Result<TxReceipt, LedgerError> {
        self.settle().await;
        let mut inner = self.inner.lock().await;
        inner.call_log.push(format!("water:{}", id));
        inner.take_injected_failure(&format!("water:{}", id))?;

        let rules = self.rules;
        let now = Self::now();
        let plant = inner.owned_plant_mut(owner, id)?;
        if plant.is_dead {
            return Err(LedgerError::Rejected("Plant is dead".into()));
        }

        // 合约先结算流逝时间内的水位，归零则植物已死，浇水被拒
        if growth::predicted_water_level(plant, now, &rules) == 0 {
            plant.is_dead = true;
            return Err(LedgerError::Rejected("Plant is dead".into()));
        }

        plant.water_level = 100;
        plant.last_watered_at = now;
        Ok(inner.receipt())
    }

    async fn submit_harvest(&self, owner: &str, id: u64) -> Result<TxReceipt, LedgerError> {
        self.settle().await;
        let mut inner = self.inner.lock().await;
        inner.call_log.push(format!("harvest:{}", id));
        inner.take_injected_failure(&format!("harvest:{}", id))?;

        let plant = inner.owned_plant_mut(owner, id)?;
        if plant.is_dead {
            return Err(LedgerError::Rejected("Plant is dead".into()));
        }
        if plant.stage != GrowthStage::Blooming {
            return Err(LedgerError::Rejected("Plant is not blooming".into()));
        }

        // 已收获的植物留下 exists=false 的墓碑：ID 列表里还在，活跃视图把它滤掉
        plant.exists = false;
        let reward = self.rules.harvest_reward_wei();
        *inner.rewards.entry(owner.to_string()).or_insert(0) += reward;
        Ok(inner.receipt())
    }

    async fn submit_stage_sync(&self, owner: &str, id: u64) -> Result<TxReceipt, LedgerError> {
        self.settle().await;
        let mut inner = self.inner.lock().await;
        inner.call_log.push(format!("stage_sync:{}", id));
        inner.take_injected_failure(&format!("stage_sync:{}", id))?;

        let rules = self.rules;
        let now = Self::now();
        let plant = inner.owned_plant_mut(owner, id)?;
        if plant.is_dead {
            return Err(LedgerError::Rejected("Plant is dead".into()));
        }

        let expected = growth::expected_stage(plant, now, &rules);
        if expected > plant.stage {
            plant.stage = expected;
        }
        Ok(inner.receipt())
    }
}
