// ==========================================
// 设施新风量引擎 - 房间领域模型
// ==========================================
// 不变量: population >= 0, area > 0 (由分配引擎校验)
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{FloorId, OccupancyCategoryId, RoomId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub facility_id: String,  // 建筑-房间编码, 例如 "ENG-101"
    pub floor_id: FloorId,
    pub area: f64,            // 面积 (ft²)
    pub population: f64,      // 设计人数
    pub uncertainty_amount: f64, // 人数不确定裕量
    pub occupancy_category_id: Option<OccupancyCategoryId>,
    pub reservable: bool,
    pub active: bool,
}

impl Room {
    /// 含不确定裕量的设计人数 (population + uncertainty_amount)
    ///
    /// 分区人数占比与容量判断都以此为分母
    pub fn design_population(&self) -> f64 {
        self.population + self.uncertainty_amount
    }
}
