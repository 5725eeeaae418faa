// ==========================================
// 设施新风量引擎 - 核心库
// ==========================================
// 职责: 房间-分区面积/人数分摊、通风新风量计算、一致性检查、活动新风汇总
// 技术栈: Rust + SQLite
// 系统定位: 数据质量问题以告警回传, 由人工修正
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 计算与检查规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/表结构）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{GroupingMode, Section};

// 领域实体
pub use domain::{
    ActionLog, ActionType, AirflowGroupSummary, AirflowResult, DataQualityWarning, Event,
    OccupancyCategory, Room, RoomZoneXref, Zone, ZonePeakDemand,
};

// 引擎
pub use engine::{
    ConsistencyChecker, EventAirflowAggregator, OutdoorAirCalculator, RoomZoneAllocator,
};

// API
pub use api::{AirflowApi, SubmissionApi, XrefApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "设施新风量引擎";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "设施新风量引擎");
    }
}
