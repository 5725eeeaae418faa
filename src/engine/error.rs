// ==========================================
// 设施新风量引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 只有这三类错误会阻断操作;
//       数据质量问题走 DataQualityWarning, 不进入错误通道
// ==========================================

use thiserror::Error;

use crate::domain::types::RoomId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 负数/非数值份额
    #[error("无效输入 (field={field}): {message}")]
    InvalidInput { field: String, message: String },

    /// 持久化前缺少必填字段
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    /// 房间设计人数 (population + uncertainty) 为 0 时重算 pr_percent
    #[error("除零: 房间{room_id}的设计人数为0, 无法计算人数占比")]
    DivisionByZero { room_id: RoomId },
}

impl EngineError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// 校验份额输入: 必须为有限非负数
pub fn ensure_non_negative(field: &str, value: f64) -> EngineResult<f64> {
    if !value.is_finite() {
        return Err(EngineError::invalid(field, format!("非数值: {}", value)));
    }
    if value < 0.0 {
        return Err(EngineError::invalid(field, format!("不允许负数: {}", value)));
    }
    Ok(value)
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
