// ==========================================
// 设施新风量引擎 - API层错误类型
// ==========================================
// 职责: 把 Repository / Engine 错误转换为面向用户的错误消息
// 说明: 数据质量告警不走错误通道
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    /// 房间设计人数为 0, 人数占比无法计算 (不落库)
    #[error("除零: {0}")]
    DivisionByZero(String),

    /// 覆盖人工分配的操作需要用户确认
    #[error("需要确认: {0}")]
    ConfirmationRequired(String),

    #[error("功能未启用: {0}")]
    FeatureDisabled(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::ValidationError(format!("检查约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            EngineError::ValidationError(msg) => ApiError::ValidationError(msg),
            e @ EngineError::DivisionByZero { .. } => ApiError::DivisionByZero(e.to_string()),
        }
    }
}

/// 配置读取失败 (ConfigManager 返回 Box<dyn Error>)
pub fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::InternalError(format!("配置读取失败: {}", err))
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "room".to_string(),
            id: "42".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("room"));
                assert!(msg.contains("42"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::ForeignKeyViolation("FK".to_string()).into();
        assert!(matches!(api_err, ApiError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_engine_error_conversion() {
        let api_err: ApiError = EngineError::DivisionByZero { room_id: 7 }.into();
        match api_err {
            ApiError::DivisionByZero(msg) => assert!(msg.contains('7')),
            _ => panic!("Expected DivisionByZero"),
        }

        let api_err: ApiError = EngineError::invalid("xref_area", "不允许负数: -1").into();
        assert!(matches!(api_err, ApiError::InvalidInput(ref m) if m.contains("xref_area")));

        let api_err: ApiError = EngineError::ValidationError("行缺少必填数据: zone_id".to_string()).into();
        assert!(matches!(api_err, ApiError::ValidationError(_)));
    }
}
