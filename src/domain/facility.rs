// ==========================================
// 设施新风量引擎 - 建筑/楼层/空调机组领域模型
// ==========================================
// 职责: 房间与分区的归属层级
// 说明: AHU 作为独立实体建模, 分区通过 ahu_id 外键关联
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{AhuId, BuildingId, FloorId};

// ==========================================
// Building - 建筑
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub code: String,           // 建筑代码 (facility_id 前缀)
    pub name: String,
    pub campus: Option<String>, // 所属校区
    pub active: bool,
}

// ==========================================
// Floor - 楼层
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub id: FloorId,
    pub building_id: BuildingId,
    pub name: String,
}

// ==========================================
// Ahu - 空调机组 (Air Handling Unit)
// ==========================================
// 旧数据中分区仅以名称关联 AHU, 名称匹配只保留在迁移垫片中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ahu {
    pub id: AhuId,
    pub building_id: BuildingId,
    pub name: String,
    pub active: bool,
}
