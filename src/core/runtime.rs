//! 会话运行时：两个独立的循环定时器 + 取消令牌
//!
//! 对账循环激活后立刻跑第一个 pass，此后按固定间隔 tick；静默刷新循环按
//! 更短的间隔保持缓存新鲜。两个循环都挂在同一个 CancellationToken 上，
//! 断开会话（或句柄 Drop）时一起拆除；进行中的账本调用不被打断，循环在
//! pass 之间观察取消。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::scheduler::StageScheduler;
use crate::core::service::GardenService;

/// 运行时句柄：持有取消令牌，Drop 即拆除定时器
pub struct GardenRuntime {
    cancel: CancellationToken,
}

impl GardenRuntime {
    /// 启动对账循环与静默刷新循环
    pub fn start(
        service: Arc<GardenService>,
        scheduler: Arc<StageScheduler>,
        sync_interval: Duration,
        refresh_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();

        let sync_cancel = cancel.clone();
        let sync_service = Arc::clone(&service);
        tokio::spawn(async move {
            // 第一个 tick 立即完成：激活即跑一次
            let mut ticker = tokio::time::interval(sync_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = sync_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // 没有跟踪中的植物就没有可对账的对象
                        if sync_service.plants().await.is_empty() {
                            continue;
                        }
                        let outcome = scheduler.run_once().await;
                        if outcome.synced + outcome.failed > 0 {
                            tracing::debug!(?outcome, "Reconciliation pass finished");
                        }
                    }
                }
            }
            tracing::info!("Reconciliation loop stopped");
        });

        let refresh_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = refresh_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // 静默：失败已在 service 层吞掉
                        let _ = service.refresh_plants(true).await;
                    }
                }
            }
            tracing::info!("Silent refresh loop stopped");
        });

        Self { cancel }
    }

    /// 主动拆除两个循环
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for GardenRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
