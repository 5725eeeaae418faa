// ==========================================
// 设施新风量引擎 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪 (管理端的日志表)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,       // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,
    pub actor: String,

    // ===== 作用对象 =====
    pub section: Option<String>,   // 提交分区 (xref / rooms / ...)
    pub entity_id: Option<String>, // 对象主键, 复合主键以 ':' 拼接

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    /// 以当前时间和新 UUID 构造日志
    pub fn new(action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            section: None,
            entity_id: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_target(mut self, section: &str, entity_id: impl ToString) -> Self {
        self.section = Some(section.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    AutoCalculate, // 均分重置 (覆盖人工分配)
    ManualShare,   // 单元格编辑分区份额
    LinkZone,      // 新增房间-分区关联
    UnlinkZone,    // 删除房间-分区关联
    Upsert,        // 参考数据新增/修改
    Delete,        // 参考数据删除
    AhuBackfill,   // AHU 名称 -> 外键回填
    ConfigUpdate,  // 配置修改
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::AutoCalculate => write!(f, "AUTO_CALCULATE"),
            ActionType::ManualShare => write!(f, "MANUAL_SHARE"),
            ActionType::LinkZone => write!(f, "LINK_ZONE"),
            ActionType::UnlinkZone => write!(f, "UNLINK_ZONE"),
            ActionType::Upsert => write!(f, "UPSERT"),
            ActionType::Delete => write!(f, "DELETE"),
            ActionType::AhuBackfill => write!(f, "AHU_BACKFILL"),
            ActionType::ConfigUpdate => write!(f, "CONFIG_UPDATE"),
        }
    }
}
