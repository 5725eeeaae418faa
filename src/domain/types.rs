// ==========================================
// 设施新风量引擎 - 领域类型定义
// ==========================================
// 依据: ASHRAE 62.1 新风量计算口径
// 职责: 主键别名、分组模式、提交分区
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 主键别名
// ==========================================
pub type BuildingId = i64;
pub type FloorId = i64;
pub type RoomId = i64;
pub type ZoneId = i64;
pub type AhuId = i64;
pub type EventId = i64;
pub type OccupancyCategoryId = i64;

// ==========================================
// 分组模式 (Grouping Mode)
// ==========================================
// 对应活动新风页面的 5 个 "Grouping" 菜单项
// 只改变分组键, 不改变计算口径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupingMode {
    Room,      // 按房间
    Zone,      // 按分区
    ZoneEvent, // 按分区 + 活动
    RoomEvent, // 按房间 + 活动
    Event,     // 仅按活动
}

impl GroupingMode {
    pub const ALL: [GroupingMode; 5] = [
        GroupingMode::Room,
        GroupingMode::Zone,
        GroupingMode::ZoneEvent,
        GroupingMode::RoomEvent,
        GroupingMode::Event,
    ];
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingMode::Room => write!(f, "ROOM"),
            GroupingMode::Zone => write!(f, "ZONE"),
            GroupingMode::ZoneEvent => write!(f, "ZONE_EVENT"),
            GroupingMode::RoomEvent => write!(f, "ROOM_EVENT"),
            GroupingMode::Event => write!(f, "EVENT"),
        }
    }
}

impl FromStr for GroupingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ROOM" => Ok(GroupingMode::Room),
            "ZONE" => Ok(GroupingMode::Zone),
            "ZONE_EVENT" => Ok(GroupingMode::ZoneEvent),
            "ROOM_EVENT" => Ok(GroupingMode::RoomEvent),
            "EVENT" => Ok(GroupingMode::Event),
            other => Err(format!("未知分组模式: {}", other)),
        }
    }
}

// ==========================================
// 提交分区 (Submission Section)
// ==========================================
// 提交边界按 section 路由写入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Xref,
    Rooms,
    Zones,
    Ahus,
    OccupancyCategories,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Xref => write!(f, "xref"),
            Section::Rooms => write!(f, "rooms"),
            Section::Zones => write!(f, "zones"),
            Section::Ahus => write!(f, "ahus"),
            Section::OccupancyCategories => write!(f, "occupancy_categories"),
        }
    }
}
