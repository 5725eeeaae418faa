// ==========================================
// 设施新风量引擎 - 人员类别领域模型
// ==========================================
// 依据: ASHRAE 62.1 Table 6-1 (最小通风量)
// 用途: 房间引用的不可变参考数据, 仅经管理端 CRUD 维护
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::OccupancyCategoryId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyCategory {
    pub id: OccupancyCategoryId,
    pub category: String,             // 类别名称
    pub people_outdoor_air_rate: f64, // 人员新风量 (cfm/person)
    pub area_outdoor_air_rate: f64,   // 面积新风量 (cfm/ft²)
    pub occupant_density: f64,        // 默认人员密度 (#/1000 ft²)
    pub standby_allowed: bool,        // 是否允许待机
    pub type_group: Option<String>,   // 类别分组
}

impl OccupancyCategory {
    /// 按默认人员密度估算面积对应的人数
    pub fn default_population_for_area(&self, area: f64) -> f64 {
        self.occupant_density * area / 1000.0
    }
}
