// ==========================================
// 设施新风量引擎 - 应用状态
// ==========================================
// 职责: 管理共享数据库连接、仓储与 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AirflowApi, SubmissionApi, XrefApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{
    ActionLogRepository, AhuRepository, BuildingRepository, EventRepository,
    OccupancyCategoryRepository, RoomRepository, XrefRepository, ZoneRepository,
};

/// 应用状态
///
/// 所有仓储共享同一个连接, API 通过 Arc 持有仓储
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 房间/分区分配 API
    pub xref_api: Arc<XrefApi>,

    /// 新风量报表 API
    pub airflow_api: Arc<AirflowApi>,

    /// 表单提交 API
    pub submission_api: Arc<SubmissionApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 参考数据仓储 (导入/初始化脚本使用)
    pub building_repo: Arc<BuildingRepository>,
    pub event_repo: Arc<EventRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库表结构初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================

        let building_repo = Arc::new(BuildingRepository::new(conn.clone()));
        let room_repo = Arc::new(RoomRepository::new(conn.clone()));
        let zone_repo = Arc::new(ZoneRepository::new(conn.clone()));
        let ahu_repo = Arc::new(AhuRepository::new(conn.clone()));
        let xref_repo = Arc::new(XrefRepository::new(conn.clone()));
        let event_repo = Arc::new(EventRepository::new(conn.clone()));
        let occupancy_repo = Arc::new(OccupancyCategoryRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================

        let xref_api = Arc::new(XrefApi::new(
            room_repo.clone(),
            zone_repo.clone(),
            xref_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
        ));

        let airflow_api = Arc::new(AirflowApi::new(
            building_repo.clone(),
            room_repo.clone(),
            zone_repo.clone(),
            xref_repo,
            event_repo.clone(),
            occupancy_repo.clone(),
            config_manager.clone(),
        ));

        let submission_api = Arc::new(SubmissionApi::new(
            xref_api.clone(),
            room_repo,
            zone_repo,
            ahu_repo,
            occupancy_repo,
            action_log_repo.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            xref_api,
            airflow_api,
            submission_api,
            config_manager,
            building_repo,
            event_repo,
            action_log_repo,
        })
    }
}

// ==========================================

/// 获取默认数据库路径
///
/// 优先使用环境变量 AIRFLOW_DB_PATH, 否则落在用户数据目录下
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("AIRFLOW_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./facility_airflow.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("facility-airflow");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("facility_airflow.db");
        }
    }

    path.to_string_lossy().to_string()
}
