// ==========================================
// 设施新风量引擎 - 应用层
// ==========================================
// 职责: 组装仓储与 API, 供命令行工具使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
