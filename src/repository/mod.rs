// ==========================================
// 设施新风量引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod ahu_repo;
pub mod building_repo;
pub mod error;
pub mod event_repo;
pub mod occupancy_repo;
pub mod room_repo;
pub mod xref_repo;
pub mod zone_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use ahu_repo::AhuRepository;
pub use building_repo::BuildingRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use event_repo::EventRepository;
pub use occupancy_repo::OccupancyCategoryRepository;
pub use room_repo::RoomRepository;
pub use xref_repo::XrefRepository;
pub use zone_repo::{AhuBackfillOutcome, ZoneRepository};
