//! Garden - 链上花园客户端核心
//!
//! 权威状态在远端账本（智能合约）上离散、昂贵地写入，而真相随时间连续
//! 演化；本 crate 在两次落账之间持续重建感知状态，检测记录阶段与时间
//! 推导阶段的偏差，并在需要时发出矫正写入。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）与生长规则常量
//! - **plant**: 植物记录、生长阶段、存活状态（账本快照的本地镜像）
//! - **growth**: 时间推导状态计算（纯函数，无 I/O）
//! - **error**: 错误类型
//! - **ledger**: 账本访问抽象（LedgerClient）与 Mock 实现
//! - **core**: 缓存、用户操作网关、对账调度器、会话运行时

pub mod config;
pub mod core;
pub mod error;
pub mod growth;
pub mod ledger;
pub mod plant;

pub use error::{GardenError, LedgerError};
pub use plant::{GrowthStage, Plant, Vitality};
