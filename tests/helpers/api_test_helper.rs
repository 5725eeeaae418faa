// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;
use tempfile::NamedTempFile;

use facility_airflow::api::{AirflowApi, ApiError, SubmissionApi, XrefApi};
use facility_airflow::app::AppState;
use facility_airflow::config::ConfigManager;
use facility_airflow::repository::{ActionLogRepository, BuildingRepository, EventRepository};
use rusqlite::Connection;

pub use test_helpers::{
    AHU_ID, BUILDING_CODE, BUILDING_ID, ROOM_CLASSROOM, ROOM_OFFICE, ROOM_STORAGE, ZONE_EAST,
    ZONE_WEST,
};

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 通过 AppState 组装全部 API, 另开一个连接用于准备测试数据
pub struct ApiTestEnv {
    pub db_path: String,
    pub xref_api: Arc<XrefApi>,
    pub airflow_api: Arc<AirflowApi>,
    pub submission_api: Arc<SubmissionApi>,
    pub config_manager: Arc<ConfigManager>,

    // Repository层（用于测试数据准备与断言）
    pub building_repo: Arc<BuildingRepository>,
    pub event_repo: Arc<EventRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,

    // 准备数据用的独立连接
    pub conn: Connection,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建空库测试环境 (仅建表)
    pub fn new() -> Result<Self, String> {
        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let state = AppState::new(db_path.clone())?;
        let conn = test_helpers::open_test_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        Ok(Self {
            db_path,
            xref_api: state.xref_api,
            airflow_api: state.airflow_api,
            submission_api: state.submission_api,
            config_manager: state.config_manager,
            building_repo: state.building_repo,
            event_repo: state.event_repo,
            action_log_repo: state.action_log_repo,
            conn,
            _temp_file: temp_file,
        })
    }

    /// 创建带参考数据的测试环境 (建筑 ENG, 房间 101-103, 分区 11/12)
    pub fn with_reference_data() -> Result<Self, String> {
        let env = Self::new()?;
        test_helpers::insert_reference_data(&env.conn)
            .map_err(|e| format!("插入参考数据失败: {}", e))?;
        Ok(env)
    }

    /// 插入活动
    pub fn prepare_event(
        &self,
        event_id: i64,
        room_facility_id: &str,
        enrollment: Option<u32>,
        start: &str,
        end: &str,
        days_pattern: &str,
    ) -> Result<(), String> {
        test_helpers::insert_event(
            &self.conn,
            event_id,
            room_facility_id,
            enrollment,
            start,
            end,
            days_pattern,
        )
        .map_err(|e| format!("插入活动失败: {}", e))
    }

    /// 写入全局配置
    pub fn prepare_config(&self, key: &str, value: &str) -> Result<(), String> {
        test_helpers::insert_config(&self.conn, key, value)
            .map_err(|e| format!("写入配置失败: {}", e))
    }

    /// 直接读取交叉引用行数 (绕过 API)
    pub fn count_xrefs(&self, room_id: i64) -> i64 {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM room_zone_xref WHERE room_id = ?1",
                [room_id],
                |row| row.get(0),
            )
            .unwrap_or(-1)
    }
}

// ==========================================
// 错误断言辅助函数
// ==========================================

pub fn assert_invalid_input(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::InvalidInput(_)) => {}
        other => panic!("预期InvalidInput错误，实际: {:?}", other),
    }
}

pub fn assert_validation_error(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::ValidationError(_)) => {}
        other => panic!("预期ValidationError错误，实际: {:?}", other),
    }
}

pub fn assert_not_found(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::NotFound(_)) => {}
        other => panic!("预期NotFound错误，实际: {:?}", other),
    }
}

// ==========================================
// ActionLog验证辅助函数
// ==========================================

/// 验证ActionLog是否已记录
///
/// # 说明
/// 检查最近的ActionLog中指定action_type的条数恰好为expected_count
pub fn assert_action_logged(
    env: &ApiTestEnv,
    action_type: &str,
    expected_count: usize,
) -> Result<(), String> {
    let logs = env
        .action_log_repo
        .find_recent(100)
        .map_err(|e| format!("查询ActionLog失败: {}", e))?;

    let matching = logs.iter().filter(|log| log.action_type == action_type).count();

    if matching != expected_count {
        return Err(format!(
            "预期{}条{}类型的ActionLog，实际找到{}条",
            expected_count, action_type, matching
        ));
    }

    Ok(())
}

/// 验证最近的ActionLog包含指定的操作人
pub fn assert_action_has_actor(env: &ApiTestEnv, actor: &str) -> Result<(), String> {
    let logs = env
        .action_log_repo
        .find_recent(1)
        .map_err(|e| format!("查询ActionLog失败: {}", e))?;

    let latest = logs.first().ok_or("未找到任何ActionLog")?;
    if latest.actor != actor {
        return Err(format!("预期操作人为{}，实际为{}", actor, latest.actor));
    }

    Ok(())
}
