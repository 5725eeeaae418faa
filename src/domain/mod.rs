// ==========================================
// 设施新风量引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、数据质量告警
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod airflow;
pub mod event;
pub mod facility;
pub mod occupancy;
pub mod room;
pub mod types;
pub mod warning;
pub mod xref;
pub mod zone;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use airflow::{
    AirflowGroupSummary, AirflowResult, GroupKey, OutdoorAirComponents, ZonePeakDemand,
};
pub use event::Event;
pub use facility::{Ahu, Building, Floor};
pub use occupancy::OccupancyCategory;
pub use room::Room;
pub use types::{
    AhuId, BuildingId, EventId, FloorId, GroupingMode, OccupancyCategoryId, RoomId, Section,
    ZoneId,
};
pub use warning::DataQualityWarning;
pub use xref::RoomZoneXref;
pub use zone::Zone;
