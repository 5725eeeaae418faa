// ==========================================
// 设施新风量引擎 - 新风量计算结果
// ==========================================
// 派生数据, 不落库
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{EventId, RoomId, ZoneId};
use crate::domain::warning::DataQualityWarning;

// ==========================================
// OutdoorAirComponents - 新风量分量
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutdoorAirComponents {
    pub people_component: f64, // 人员新风 (cfm)
    pub area_component: f64,   // 面积新风 (cfm)
    pub total: f64,            // 合计 (cfm)
}

// ==========================================
// AirflowResult - 房间/分区/活动三元组结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirflowResult {
    pub room_id: RoomId,
    pub facility_id: String,
    pub zone_id: Option<ZoneId>, // 房间未关联分区时为 None
    pub event_id: Option<EventId>, // 房间设计口径 (无活动) 时为 None

    pub people_outdoor_air_rate: f64,
    pub area_outdoor_air_rate: f64,

    pub people_outdoor_air: f64, // 活动 (或分区份额) 的人员新风
    pub area_outdoor_air: f64,   // 分区面积份额的面积新风
    pub total_outdoor_air: f64,  // people + area
    pub zone_outdoor_air: f64,   // 分区按 pr_percent 分摊的活动人员新风

    pub over_capacity: bool,
    pub warnings: Vec<DataQualityWarning>,
}

// ==========================================
// GroupKey - 分组键
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupKey {
    Room { room_id: RoomId },
    Zone { zone_id: Option<ZoneId> },
    ZoneEvent { zone_id: Option<ZoneId>, event_id: Option<EventId> },
    RoomEvent { room_id: RoomId, event_id: Option<EventId> },
    Event { event_id: Option<EventId> },
}

// ==========================================
// AirflowGroupSummary - 分组汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirflowGroupSummary {
    pub key: GroupKey,
    pub row_count: usize,
    pub people_outdoor_air_rate_sum: f64, // Σ 人员新风率
    pub event_outdoor_air_sum: f64,       // Σ 活动人员新风 (每个房间-活动只计一次)
    pub zone_outdoor_air_sum: f64,        // Σ 分区分摊新风
    pub max_event_outdoor_air: f64,
    pub max_zone_outdoor_air: f64,
    pub over_capacity_count: usize,
    pub warning_count: usize,
}

impl AirflowGroupSummary {
    pub fn empty(key: GroupKey) -> Self {
        Self {
            key,
            row_count: 0,
            people_outdoor_air_rate_sum: 0.0,
            event_outdoor_air_sum: 0.0,
            zone_outdoor_air_sum: 0.0,
            max_event_outdoor_air: 0.0,
            max_zone_outdoor_air: 0.0,
            over_capacity_count: 0,
            warning_count: 0,
        }
    }
}

// ==========================================
// ZonePeakDemand - 分区峰值需求
// ==========================================
// 同一分区下时间重叠的活动同时在场时的最大分摊新风
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonePeakDemand {
    pub zone_id: ZoneId,
    pub peak_zone_outdoor_air: f64,
    pub weekday_index: Option<usize>, // 峰值出现的星期 (0 = 周一)
    pub at_time: Option<chrono::NaiveTime>,
    pub concurrent_event_ids: Vec<EventId>,
}
