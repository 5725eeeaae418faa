// ==========================================
// 设施新风量引擎 - 引擎层
// ==========================================
// 职责: 新风量计算、分区分配、一致性校验、活动汇总
// 红线: Engine 不拼 SQL, 数据质量问题只产出告警不阻断
// ==========================================

pub mod allocator;
pub mod consistency;
pub mod error;
pub mod event_airflow;
pub mod outdoor_air;

// 重导出核心引擎
pub use allocator::RoomZoneAllocator;
pub use consistency::{
    AhuAirflowSummary, ConsistencyChecker, ConsistencyConfig, RoomGroupCheck, ZoneGroupCheck,
};
pub use error::{EngineError, EngineResult};
pub use event_airflow::{EventAirflowAggregator, EventAirflowReport};
pub use outdoor_air::{OutdoorAirCalculator, OutdoorAirComputation};
