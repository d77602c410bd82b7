//! 对账调度器：自动矫正失同步的植物阶段
//!
//! 每次 pass 从缓存快照里选出「存在、存活、未 Blooming 且记录阶段落后」的
//! 植物，严格逐株发矫正交易；单株失败只记日志，pass 继续，整个 pass 永远
//! 不向调用方抛错。in_flight 原子标志保证任一时刻最多一个 pass 在跑——
//! 慢链情况下叠加的 tick 直接丢弃，不排队。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::service::GardenService;
use crate::growth;
use crate::plant::GrowthStage;

/// 一次对账 pass 的结果摘要
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// 成功矫正的株数
    pub synced: usize,
    /// 矫正失败的株数
    pub failed: usize,
    /// 本次 tick 因上一个 pass 未结束（或无会话）而被跳过
    pub skipped: bool,
}

impl SyncOutcome {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// 调度器本体：与网关共享同一个 GardenService（同一个写闸门）
pub struct StageScheduler {
    service: Arc<GardenService>,
    in_flight: AtomicBool,
}

impl StageScheduler {
    pub fn new(service: Arc<GardenService>) -> Self {
        Self {
            service,
            in_flight: AtomicBool::new(false),
        }
    }

    /// 跑一次对账 pass；重入时返回 skipped 且零写入
    pub async fn run_once(&self) -> SyncOutcome {
        let Some(owner) = self.service.session_owner().await else {
            return SyncOutcome::skipped();
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Reconciliation pass already in flight, skipping tick");
            return SyncOutcome::skipped();
        }

        let outcome = self.pass(&owner).await;
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn pass(&self, owner: &str) -> SyncOutcome {
        let rules = *self.service.rules();
        let now = chrono::Utc::now().timestamp();

        let stale: Vec<_> = self
            .service
            .plants()
            .await
            .into_iter()
            .filter(|p| {
                p.exists
                    && !p.is_dead
                    && p.stage != GrowthStage::Blooming
                    && growth::is_stage_out_of_sync(p, now, &rules)
            })
            .collect();

        if stale.is_empty() {
            tracing::debug!("All plants in sync");
            return SyncOutcome::default();
        }

        tracing::info!(count = stale.len(), "Correcting out-of-sync plants");

        let mut outcome = SyncOutcome::default();
        for plant in stale {
            match self.service.submit_correction(owner, plant.id).await {
                Ok(()) => {
                    tracing::info!(plant = plant.id, "Stage corrected");
                    outcome.synced += 1;
                }
                Err(e) => {
                    tracing::warn!(plant = plant.id, error = %e, "Stage correction failed");
                    outcome.failed += 1;
                }
            }
        }

        // 矫正落账后静默刷新，下一个 pass 不会再选中同一批
        if outcome.synced > 0 {
            let _ = self.service.refresh_plants(true).await;
        }
        outcome
    }
}
