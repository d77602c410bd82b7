//! 植物数据模型：链上记录的本地镜像
//!
//! `Plant` 是账本 `fetch_plant` 返回的快照。注意 `water_level` 只是
//! `last_watered_at` 时刻的检查点，并非实时值；实时水位由 growth 模块按
//! 流逝时间推导。

use serde::{Deserialize, Serialize};

/// 生长阶段（链上 uint8，存活期内单调不减，只经确认写入推进）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrowthStage {
    Seed = 0,
    Sprout = 1,
    Growing = 2,
    Blooming = 3,
}

impl GrowthStage {
    /// 最大阶段索引（Blooming）
    pub const MAX_INDEX: u8 = 3;

    /// 从链上索引转换；超出范围按 Blooming 截断
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Seed,
            1 => Self::Sprout,
            2 => Self::Growing,
            _ => Self::Blooming,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// 展示名
    pub fn name(self) -> &'static str {
        match self {
            Self::Seed => "Seed",
            Self::Sprout => "Sprout",
            Self::Growing => "Growing",
            Self::Blooming => "Blooming",
        }
    }
}

/// 植物记录（账本快照）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    /// 账本分配的 ID，创建后不变
    pub id: u64,
    /// 拥有者地址
    pub owner: String,
    /// 账本记录的阶段（可能落后于时间推导的期望阶段）
    pub stage: GrowthStage,
    /// 种植时刻（epoch 秒），所有时间推导的锚点
    pub planted_at: i64,
    /// 最近一次浇水（或创建）时刻
    pub last_watered_at: i64,
    /// `last_watered_at` 时刻的水位检查点（0-100）
    pub water_level: u8,
    /// 账本上是否存在（未创建的 ID 为 false）
    pub exists: bool,
    /// 账本确认的死亡标志，一旦为 true 永久为 true
    pub is_dead: bool,
}

impl Plant {
    /// 自种植以来的秒数（now 早于种植时刻时返回 0）
    pub fn age_secs(&self, now: i64) -> i64 {
        (now - self.planted_at).max(0)
    }

    /// 自上次浇水以来的秒数
    pub fn secs_since_watered(&self, now: i64) -> i64 {
        (now - self.last_watered_at).max(0)
    }
}

/// 存活状态：区分「账本确认死亡」与「客户端预测枯竭」
///
/// 两个来源的真相不能折叠成一个布尔：预测枯竭只代表检查点推导出水位已耗尽，
/// 账本尚未写入 isDead，展示/决策把它当不可操作处理，但不得当作账本事实。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vitality {
    /// 账本已写入 isDead（或植物不存在）
    ConfirmedDead,
    /// 客户端预测水位已降到 0，等待账本确认
    PredictedExhausted,
    /// 存活，携带推导出的当前水位
    Alive { water_level: u8 },
}

impl Vitality {
    /// 是否可以被浇水/收获等操作作用
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Alive { .. })
    }
}

/// 人类可读的时长（"2d 5h ago" 风格，取前两个非零单位）
pub fn format_age(secs: i64) -> String {
    let secs = secs.max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{}d {}h ago", days, hours)
    } else if hours > 0 {
        format!("{}h {}m ago", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s ago", minutes, seconds)
    } else {
        format!("{}s ago", seconds)
    }
}
