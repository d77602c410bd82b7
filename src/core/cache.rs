//! 植物缓存：活跃地址最近一次成功拉取的植物集合
//!
//! 只保存账本读到的快照，不保存任何推导值；整组原子替换，没有逐株更新，
//! 读方拿到的永远是同一次刷新里的一致集合。

use tokio::sync::RwLock;

use crate::plant::Plant;

/// 缓存本体
#[derive(Debug, Default)]
pub struct PlantCache {
    plants: RwLock<Vec<Plant>>,
}

impl PlantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用一次刷新得到的完整集合原子替换缓存
    pub async fn replace_all(&self, plants: Vec<Plant>) {
        *self.plants.write().await = plants;
    }

    /// 当前集合的副本
    pub async fn snapshot(&self) -> Vec<Plant> {
        self.plants.read().await.clone()
    }

    /// 按 ID 查单株
    pub async fn get(&self, id: u64) -> Option<Plant> {
        self.plants.read().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.plants.read().await.is_empty()
    }

    /// 清空（断开会话时）
    pub async fn clear(&self) {
        self.plants.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plant::GrowthStage;

    fn plant(id: u64) -> Plant {
        Plant {
            id,
            owner: "0xa".into(),
            stage: GrowthStage::Seed,
            planted_at: 0,
            last_watered_at: 0,
            water_level: 100,
            exists: true,
            is_dead: false,
        }
    }

    #[tokio::test]
    async fn replace_is_atomic_swap() {
        let cache = PlantCache::new();
        cache.replace_all(vec![plant(1), plant(2)]).await;
        assert_eq!(cache.snapshot().await.len(), 2);
        assert!(cache.get(2).await.is_some());

        cache.replace_all(vec![plant(3)]).await;
        assert!(cache.get(2).await.is_none());
        assert_eq!(cache.snapshot().await.len(), 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
