// ==========================================
// 设施新风量引擎 - 分区领域模型
// ==========================================
// 一个分区服务一个或多个房间 (经 RoomZoneXref),
// 并由唯一的 AHU 送风
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{AhuId, BuildingId, ZoneId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub code: String,
    pub building_id: BuildingId,
    pub ahu_name: Option<String>, // 旧口径: 仅按名称关联
    pub ahu_id: Option<AhuId>,    // 外键关联, 由 backfill_ahu_ids 回填
    pub occupancy_sensor_present: bool,
    pub active: bool,
}
