//! 核心层：植物缓存、用户操作网关、对账调度器、会话运行时

pub mod cache;
pub mod runtime;
pub mod scheduler;
pub mod service;

pub use cache::PlantCache;
pub use runtime::GardenRuntime;
pub use scheduler::{StageScheduler, SyncOutcome};
pub use service::GardenService;
