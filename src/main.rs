//! Garden - 链上花园客户端核心
//!
//! 入口：初始化日志、装配 Mock 账本上的演示会话，跑一遍完整生命周期
//! （种植 → 对账矫正 → 浇水 → 收获），同时让两个后台循环空转展示。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use garden::config::load_config;
use garden::core::{GardenRuntime, GardenService, StageScheduler};
use garden::growth;
use garden::ledger::{LedgerClient, MockLedger};
use garden::plant::format_age;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).context("Failed to load config")?;
    let rules = cfg.rules();

    // 演示用 Mock 账本；真实部署时换成 RPC 后端的 LedgerClient 实现
    let ledger = Arc::new(MockLedger::new(rules));
    let service = Arc::new(GardenService::new(
        ledger.clone() as Arc<dyn LedgerClient>,
        rules,
    ));
    let scheduler = Arc::new(StageScheduler::new(service.clone()));

    let owner = "0xdemo";
    service.connect(owner).await?;

    let runtime = GardenRuntime::start(
        service.clone(),
        scheduler.clone(),
        Duration::from_secs(cfg.scheduler.sync_interval_secs),
        Duration::from_secs(cfg.scheduler.refresh_interval_secs),
    );

    service.plant_seed().await?;
    let plants = service.plants().await;
    let plant = &plants[0];
    tracing::info!(id = plant.id, stage = plant.stage.name(), "Planted");

    // 把种植时刻拨回两个阶段前，模拟离线期间时间流逝
    ledger.backdate_planting(plant.id, rules.stage_duration_secs * 2 + 5).await;
    service.refresh_plants(false).await?;

    let outcome = scheduler.run_once().await;
    tracing::info!(?outcome, "Manual reconciliation pass");

    let now = chrono::Utc::now().timestamp();
    for p in service.plants().await {
        tracing::info!(
            id = p.id,
            stage = p.stage.name(),
            water = growth::predicted_water_level(&p, now, &rules),
            progress = format!("{:.1}%", growth::progress_percent(&p, now, &rules)),
            age = format_age(p.age_secs(now)),
            "Plant state"
        );
    }

    service.water_plant(1).await?;

    // 推进到 Blooming 并收获
    ledger.backdate_planting(1, rules.stage_duration_secs * 2).await;
    let reward = service.harvest_plant(1).await?;
    tracing::info!(reward_wei = reward, "Harvested");

    runtime.shutdown();
    service.disconnect().await;
    Ok(())
}
