// ==========================================
// 设施新风量引擎 - 房间/分区交叉引用
// ==========================================
// 软约束 (只检查不强制, 见 ConsistencyChecker):
// - Σ xref_area == room.area
// - Σ xref_population == room.population + room.uncertainty_amount
// - Σ pr_percent ≈ 1.0
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{RoomId, ZoneId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomZoneXref {
    pub room_id: RoomId,
    pub zone_id: ZoneId,
    pub xref_area: Option<f64>,       // 该分区分得的面积
    pub xref_population: Option<f64>, // 该分区分得的人数 (含不确定裕量)
    pub pr_percent: Option<f64>,      // 人数占比, 同一房间合计应为 1.0
}

impl RoomZoneXref {
    /// 新建空分配 (新增房间-分区关联时使用)
    pub fn unallocated(room_id: RoomId, zone_id: ZoneId) -> Self {
        Self {
            room_id,
            zone_id,
            xref_area: None,
            xref_population: None,
            pr_percent: None,
        }
    }

    /// 新建零份额关联 (份额随后由均分或人工编辑补齐)
    pub fn zeroed(room_id: RoomId, zone_id: ZoneId) -> Self {
        Self {
            room_id,
            zone_id,
            xref_area: Some(0.0),
            xref_population: Some(0.0),
            pr_percent: Some(0.0),
        }
    }
}
