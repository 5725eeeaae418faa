// ==========================================
// 设施新风量引擎 - API 层
// ==========================================
// 职责: 提供业务 API 接口 (分配、报表、表单提交)
// ==========================================

pub mod airflow_api;
pub mod error;
pub mod submission;
pub mod xref_api;

// 重导出核心类型
pub use airflow_api::{AirflowApi, RoomAirflowReport};
pub use error::{ApiError, ApiResult};
pub use submission::{SubmissionApi, SubmissionOutcome, SubmissionPayload};
pub use xref_api::{BuildingConsistencyReport, XrefApi, XrefWriteResult};
