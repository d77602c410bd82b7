//! 用户操作网关与缓存刷新
//!
//! 四个用户操作（种植 / 浇水 / 收获 / 手动矫正）共用同一套纪律：先验会话，
//! 再置 busy 标志（作用域守卫，成功失败都会复位），写操作全部经过 write_gate
//! 串行化（同一地址并发写会在账本边界撞 nonce），确认后整组刷新缓存。
//!
//! 浇水与收获在写之前绕过缓存重读单株并按需先发阶段矫正，保证动作永远
//! 作用在植物真实的当前阶段上。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};

use crate::config::GrowthRules;
use crate::core::cache::PlantCache;
use crate::error::{GardenError, LedgerError};
use crate::growth;
use crate::ledger::{LedgerClient, TxReceipt};
use crate::plant::Plant;

/// busy 标志的作用域守卫：Drop 时复位，任何退出路径都不会把标志留在 true
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 花园服务：一个活跃会话一个实例
pub struct GardenService {
    ledger: Arc<dyn LedgerClient>,
    cache: Arc<PlantCache>,
    rules: GrowthRules,
    /// 活跃钱包地址；None 表示未连接
    session: RwLock<Option<String>>,
    /// 用户操作进行中标志（静默刷新不碰它）
    busy: AtomicBool,
    /// 同一地址的写串行化闸门，网关与调度器共用
    write_gate: Mutex<()>,
}

impl GardenService {
    pub fn new(ledger: Arc<dyn LedgerClient>, rules: GrowthRules) -> Self {
        Self {
            ledger,
            cache: Arc::new(PlantCache::new()),
            rules,
            session: RwLock::new(None),
            busy: AtomicBool::new(false),
            write_gate: Mutex::new(()),
        }
    }

    pub fn rules(&self) -> &GrowthRules {
        &self.rules
    }

    pub fn cache(&self) -> Arc<PlantCache> {
        Arc::clone(&self.cache)
    }

    /// 当前缓存集合的快照
    pub async fn plants(&self) -> Vec<Plant> {
        self.cache.snapshot().await
    }

    /// 是否有用户操作进行中
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn session_owner(&self) -> Option<String> {
        self.session.read().await.clone()
    }

    async fn require_session(&self) -> Result<String, GardenError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(GardenError::NotConnected)
    }

    /// 连接钱包：设置会话并做一次完整刷新
    pub async fn connect(&self, owner: &str) -> Result<(), GardenError> {
        *self.session.write().await = Some(owner.to_string());
        tracing::info!(owner, "Session connected");
        self.refresh_plants(false).await
    }

    /// 断开钱包：清会话与缓存
    pub async fn disconnect(&self) {
        *self.session.write().await = None;
        self.cache.clear().await;
        tracing::info!("Session disconnected");
    }

    /// 完整刷新：列 ID、并发拉取、滤掉不存在与单株失败、整组替换缓存
    ///
    /// silent 模式不碰 busy 标志，且任何失败只记 warn 不上抛——静默刷新是
    /// 尽力而为的展示保鲜，不该制造用户可见的噪音。
    pub async fn refresh_plants(&self, silent: bool) -> Result<(), GardenError> {
        let Some(owner) = self.session_owner().await else {
            // 无会话时刷新等价于清空集合，不算错误
            self.cache.clear().await;
            return Ok(());
        };

        let _busy = (!silent).then(|| BusyGuard::acquire(&self.busy));

        match self.fetch_and_replace(&owner).await {
            Ok(()) => Ok(()),
            Err(e) if silent => {
                tracing::warn!(error = %e, "Silent refresh failed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_and_replace(&self, owner: &str) -> Result<(), GardenError> {
        let ids = self.ledger.owned_plant_ids(owner).await?;
        let results = join_all(ids.iter().map(|&id| self.ledger.fetch_plant(id))).await;

        let mut plants = Vec::with_capacity(ids.len());
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(p) if p.exists => plants.push(p),
                // 已收获/未初始化的墓碑
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(plant = id, error = %e, "Failed to fetch plant, skipping")
                }
            }
        }

        self.cache.replace_all(plants).await;
        Ok(())
    }

    /// 种一颗新种子（payable，价格固定），确认后整组刷新
    pub async fn plant_seed(&self) -> Result<TxReceipt, GardenError> {
        let owner = self.require_session().await?;
        let _busy = BusyGuard::acquire(&self.busy);

        let receipt = {
            let _gate = self.write_gate.lock().await;
            self.ledger
                .submit_plant_seed(&owner, self.rules.seed_price_wei)
                .await?
        };
        tracing::info!(tx = %receipt.tx_hash, "Seed planted");

        self.fetch_and_replace(&owner).await?;
        Ok(receipt)
    }

    /// 浇水：先重读单株，失同步则先矫正再浇，两笔写在同一次闸门持有内完成
    pub async fn water_plant(&self, id: u64) -> Result<TxReceipt, GardenError> {
        let owner = self.require_session().await?;
        let _busy = BusyGuard::acquire(&self.busy);

        let receipt = {
            let _gate = self.write_gate.lock().await;
            let plant = self.ledger.fetch_plant(id).await?;
            let now = chrono::Utc::now().timestamp();
            if growth::is_stage_out_of_sync(&plant, now, &self.rules) {
                tracing::info!(plant = id, "Stage out of sync, correcting before watering");
                self.ledger.submit_stage_sync(&owner, id).await?;
            }
            self.ledger.submit_water(&owner, id).await?
        };
        tracing::info!(plant = id, tx = %receipt.tx_hash, "Plant watered");

        self.fetch_and_replace(&owner).await?;
        Ok(receipt)
    }

    /// 收获：同样的「先矫正后动作」链；返回入账的奖励（wei）
    ///
    /// 矫正本身可能就是把植物推进到 Blooming 的那一步。
    pub async fn harvest_plant(&self, id: u64) -> Result<u64, GardenError> {
        let owner = self.require_session().await?;
        let _busy = BusyGuard::acquire(&self.busy);

        {
            let _gate = self.write_gate.lock().await;
            let plant = self.ledger.fetch_plant(id).await?;
            let now = chrono::Utc::now().timestamp();
            if growth::is_stage_out_of_sync(&plant, now, &self.rules) {
                tracing::info!(plant = id, "Stage out of sync, correcting before harvest");
                self.ledger.submit_stage_sync(&owner, id).await?;
            }
            self.ledger.submit_harvest(&owner, id).await?
        };
        let reward = self.rules.harvest_reward_wei();
        tracing::info!(plant = id, reward_wei = reward, "Plant harvested");

        self.fetch_and_replace(&owner).await?;
        Ok(reward)
    }

    /// 手动阶段矫正：直接发矫正交易并刷新
    pub async fn sync_stage(&self, id: u64) -> Result<TxReceipt, GardenError> {
        let owner = self.require_session().await?;
        let _busy = BusyGuard::acquire(&self.busy);

        let receipt = {
            let _gate = self.write_gate.lock().await;
            self.ledger.submit_stage_sync(&owner, id).await?
        };
        tracing::info!(plant = id, tx = %receipt.tx_hash, "Stage synced");

        self.fetch_and_replace(&owner).await?;
        Ok(receipt)
    }

    /// 调度器的单株矫正入口：走同一个写闸门，不碰 busy 标志、不刷新
    pub(crate) async fn submit_correction(&self, owner: &str, id: u64) -> Result<(), LedgerError> {
        let _gate = self.write_gate.lock().await;
        self.ledger.submit_stage_sync(owner, id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrowthRules;
    use crate::ledger::MockLedger;
    use crate::plant::GrowthStage;

    fn rules() -> GrowthRules {
        GrowthRules {
            stage_duration_secs: 60,
            water_depletion_interval_secs: 30,
            water_depletion_amount: 10,
            seed_price_wei: 1_000,
            harvest_reward_multiplier: 3,
        }
    }

    fn setup() -> (Arc<MockLedger>, GardenService) {
        let ledger = Arc::new(MockLedger::new(rules()));
        let service = GardenService::new(ledger.clone() as Arc<dyn LedgerClient>, rules());
        (ledger, service)
    }

    #[tokio::test]
    async fn operations_require_session() {
        let (ledger, service) = setup();
        assert!(matches!(
            service.plant_seed().await,
            Err(GardenError::NotConnected)
        ));
        assert!(matches!(
            service.water_plant(1).await,
            Err(GardenError::NotConnected)
        ));
        assert!(matches!(
            service.harvest_plant(1).await,
            Err(GardenError::NotConnected)
        ));
        assert!(matches!(
            service.sync_stage(1).await,
            Err(GardenError::NotConnected)
        ));
        // 未触达账本
        assert!(ledger.calls().await.is_empty());
    }

    #[tokio::test]
    async fn plant_seed_refreshes_cache() {
        let (_ledger, service) = setup();
        service.connect("0xa").await.unwrap();
        service.plant_seed().await.unwrap();

        let plants = service.plants().await;
        assert_eq!(plants.len(), 1);
        assert_eq!(plants[0].stage, GrowthStage::Seed);
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn water_on_stale_plant_issues_sync_then_water() {
        let (ledger, service) = setup();
        service.connect("0xa").await.unwrap();
        service.plant_seed().await.unwrap();

        // 让记录阶段落后于时间
        ledger.backdate_planting(1, 65).await;
        service.water_plant(1).await.unwrap();

        // 恰好两笔写：先矫正后浇水，顺序不可换、不可并行
        assert_eq!(
            ledger.calls().await,
            vec!["plant_seed", "stage_sync:1", "water:1"]
        );
        assert_eq!(service.plants().await[0].stage, GrowthStage::Sprout);
    }

    #[tokio::test]
    async fn water_on_synced_plant_skips_correction() {
        let (ledger, service) = setup();
        service.connect("0xa").await.unwrap();
        service.plant_seed().await.unwrap();

        service.water_plant(1).await.unwrap();
        assert_eq!(ledger.calls().await, vec!["plant_seed", "water:1"]);
    }

    #[tokio::test]
    async fn failed_correction_aborts_water_chain() {
        let (ledger, service) = setup();
        service.connect("0xa").await.unwrap();
        service.plant_seed().await.unwrap();
        ledger.backdate_planting(1, 65).await;

        ledger.fail_next("stage_sync", 1).await;
        assert!(service.water_plant(1).await.is_err());

        // 矫正失败后没有浇水尝试，busy 标志已复位
        assert_eq!(
            ledger.calls().await,
            vec!["plant_seed", "stage_sync:1"]
        );
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn harvest_pays_fixed_reward() {
        let (ledger, service) = setup();
        service.connect("0xa").await.unwrap();
        service.plant_seed().await.unwrap();

        // 矫正本身把植物推到 Blooming，再收获
        ledger.backdate_planting(1, 200).await;
        let reward = service.harvest_plant(1).await.unwrap();
        assert_eq!(reward, 3_000);
        assert_eq!(ledger.rewards_paid("0xa").await, 3_000);

        // 收获后墓碑被刷新滤掉
        assert!(service.plants().await.is_empty());
    }

    #[tokio::test]
    async fn silent_refresh_swallows_errors() {
        let (ledger, service) = setup();
        service.connect("0xa").await.unwrap();
        service.plant_seed().await.unwrap();

        ledger.fail_next("owned_plant_ids", 0).await;
        // 静默模式吞掉失败，缓存保持上次成功集合
        assert!(service.refresh_plants(true).await.is_ok());
        assert_eq!(service.plants().await.len(), 1);

        ledger.fail_next("owned_plant_ids", 0).await;
        // 非静默模式上抛
        assert!(service.refresh_plants(false).await.is_err());
    }

    #[tokio::test]
    async fn refresh_isolates_per_plant_fetch_failures() {
        let (ledger, service) = setup();
        service.connect("0xa").await.unwrap();
        service.plant_seed().await.unwrap();
        service.plant_seed().await.unwrap();

        ledger.fail_next("fetch", 1).await;
        service.refresh_plants(false).await.unwrap();

        // 坏的一株被跳过，批量刷新不失败
        let plants = service.plants().await;
        assert_eq!(plants.len(), 1);
        assert_eq!(plants[0].id, 2);
    }

    #[tokio::test]
    async fn disconnect_clears_cache_and_blocks_ops() {
        let (_ledger, service) = setup();
        service.connect("0xa").await.unwrap();
        service.plant_seed().await.unwrap();

        service.disconnect().await;
        assert!(service.plants().await.is_empty());
        assert!(matches!(
            service.plant_seed().await,
            Err(GardenError::NotConnected)
        ));
    }
}
