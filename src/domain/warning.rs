// ==========================================
// 设施新风量引擎 - 数据质量告警
// ==========================================
// 红线: 告警永不阻断计算或持久化, 只回传调用方用于标色
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::types::{EventId, RoomId, ZoneId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataQualityWarning {
    /// 房间未设置人员类别, 新风率按 0 计
    MissingCategory { room_id: Option<RoomId> },

    /// 活动人数超过房间设计人数 (不截断, 只标记)
    CapacityExceeded {
        event_id: EventId,
        room_id: RoomId,
        enrollment: f64,
        capacity: f64,
    },

    /// 分配合计与房间口径不一致
    ReconciliationMismatch {
        room_id: RoomId,
        field: String,
        expected: f64,
        actual: Option<f64>,
    },

    /// 数值字段缺失, 按 0 计
    MissingValue {
        entity: String,
        id: String,
        field: String,
    },

    /// 活动引用的房间不存在
    UnknownRoom {
        event_id: EventId,
        room_facility_id: String,
    },

    /// 房间未关联任何分区
    NoZoneAssignment { room_id: RoomId },

    /// 分区的 AHU 名称无法解析为 AHU 实体
    UnresolvedAhu { zone_id: ZoneId, ahu_name: String },
}

impl DataQualityWarning {
    pub fn missing_value(entity: &str, id: impl ToString, field: &str) -> Self {
        DataQualityWarning::MissingValue {
            entity: entity.to_string(),
            id: id.to_string(),
            field: field.to_string(),
        }
    }

    /// 告警关联的房间 (用于前端定位行)
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            DataQualityWarning::MissingCategory { room_id } => *room_id,
            DataQualityWarning::CapacityExceeded { room_id, .. }
            | DataQualityWarning::ReconciliationMismatch { room_id, .. }
            | DataQualityWarning::NoZoneAssignment { room_id } => Some(*room_id),
            _ => None,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::MissingCategory { room_id } => match room_id {
                Some(id) => write!(f, "房间{}未设置人员类别, 新风率按0计", id),
                None => write!(f, "未设置人员类别, 新风率按0计"),
            },
            DataQualityWarning::CapacityExceeded {
                event_id,
                room_id,
                enrollment,
                capacity,
            } => write!(
                f,
                "活动{}人数{}超过房间{}设计人数{}",
                event_id, enrollment, room_id, capacity
            ),
            DataQualityWarning::ReconciliationMismatch {
                room_id,
                field,
                expected,
                actual,
            } => write!(
                f,
                "房间{}的{}合计不一致: 期望{:.2}, 实际{}",
                room_id,
                field,
                expected,
                actual
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_else(|| "NULL".to_string())
            ),
            DataQualityWarning::MissingValue { entity, id, field } => {
                write!(f, "{}(id={})缺少字段{}, 按0计", entity, id, field)
            }
            DataQualityWarning::UnknownRoom {
                event_id,
                room_facility_id,
            } => write!(f, "活动{}引用的房间{}不存在", event_id, room_facility_id),
            DataQualityWarning::NoZoneAssignment { room_id } => {
                write!(f, "房间{}未关联任何分区", room_id)
            }
            DataQualityWarning::UnresolvedAhu { zone_id, ahu_name } => {
                write!(f, "分区{}的AHU名称'{}'无法解析", zone_id, ahu_name)
            }
        }
    }
}
