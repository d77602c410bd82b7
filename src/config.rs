//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `GARDEN__*` 覆盖（双下划线表示嵌套，
//! 如 `GARDEN__SCHEDULER__SYNC_INTERVAL_SECS=30`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub garden: GardenSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
}

/// [garden] 段：生长/水位常量与价格（与链上合约常量保持一致，不在运行时协商）
#[derive(Debug, Clone, Deserialize)]
pub struct GardenSection {
    /// 每个生长阶段的时长（秒）
    #[serde(default = "default_stage_duration_secs")]
    pub stage_duration_secs: i64,
    /// 水位每隔多少秒扣一次
    #[serde(default = "default_water_depletion_interval_secs")]
    pub water_depletion_interval_secs: i64,
    /// 每次扣多少个百分点
    #[serde(default = "default_water_depletion_amount")]
    pub water_depletion_amount: u8,
    /// 种植价格（wei，0.001 ETH）
    #[serde(default = "default_seed_price_wei")]
    pub seed_price_wei: u64,
    /// 收获奖励 = 种植价格 × 此倍数
    #[serde(default = "default_harvest_reward_multiplier")]
    pub harvest_reward_multiplier: u64,
}

fn default_stage_duration_secs() -> i64 {
    60
}

fn default_water_depletion_interval_secs() -> i64 {
    30
}

fn default_water_depletion_amount() -> u8 {
    10
}

fn default_seed_price_wei() -> u64 {
    1_000_000_000_000_000
}

fn default_harvest_reward_multiplier() -> u64 {
    3
}

impl Default for GardenSection {
    fn default() -> Self {
        Self {
            stage_duration_secs: default_stage_duration_secs(),
            water_depletion_interval_secs: default_water_depletion_interval_secs(),
            water_depletion_amount: default_water_depletion_amount(),
            seed_price_wei: default_seed_price_wei(),
            harvest_reward_multiplier: default_harvest_reward_multiplier(),
        }
    }
}

/// [scheduler] 段：对账与静默刷新节奏
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// 对账调度器 tick 间隔（秒）
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// 静默刷新间隔（秒）
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_refresh_interval_secs() -> u64 {
    5
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

/// 生长规则快照：纯计算与服务层共用的常量集合
#[derive(Debug, Clone, Copy)]
pub struct GrowthRules {
    pub stage_duration_secs: i64,
    pub water_depletion_interval_secs: i64,
    pub water_depletion_amount: u8,
    pub seed_price_wei: u64,
    pub harvest_reward_multiplier: u64,
}

impl GrowthRules {
    /// 收获奖励（wei）
    pub fn harvest_reward_wei(&self) -> u64 {
        self.seed_price_wei * self.harvest_reward_multiplier
    }
}

impl From<&GardenSection> for GrowthRules {
    fn from(s: &GardenSection) -> Self {
        Self {
            stage_duration_secs: s.stage_duration_secs,
            water_depletion_interval_secs: s.water_depletion_interval_secs,
            water_depletion_amount: s.water_depletion_amount,
            seed_price_wei: s.seed_price_wei,
            harvest_reward_multiplier: s.harvest_reward_multiplier,
        }
    }
}

impl AppConfig {
    /// 提取生长规则快照
    pub fn rules(&self) -> GrowthRules {
        GrowthRules::from(&self.garden)
    }
}

/// 从 config 目录加载配置，环境变量 GARDEN__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 GARDEN__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("GARDEN")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
