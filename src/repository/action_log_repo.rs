// ==========================================
// 设施新风量引擎 - 操作日志数据仓储
// ==========================================
// 职责: action_log 表读写
// 红线: API 层所有写入必须记录
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志, 返回 action_id
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, action_type, action_ts, actor,
                section, entity_id, payload_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.action_id,
                log.action_type,
                log.action_ts.format(TS_FORMAT).to_string(),
                log.actor,
                log.section,
                log.entity_id,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    /// 最近的操作日志 (时间倒序)
    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, action_ts, actor,
                   section, entity_id, payload_json, detail
            FROM action_log
            ORDER BY action_ts DESC, rowid DESC
            LIMIT ?
            "#,
        )?;
        let logs = stmt
            .query_map(params![limit], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 某对象的操作历史
    pub fn find_by_entity(&self, section: &str, entity_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, action_ts, actor,
                   section, entity_id, payload_json, detail
            FROM action_log
            WHERE section = ? AND entity_id = ?
            ORDER BY action_ts DESC, rowid DESC
            "#,
        )?;
        let logs = stmt
            .query_map(params![section, entity_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}

fn map_row(row: &Row) -> SqliteResult<ActionLog> {
    let action_ts_str: String = row.get(2)?;
    let payload_json_str: Option<String> = row.get(6)?;

    let action_ts = NaiveDateTime::parse_from_str(&action_ts_str, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type: row.get(1)?,
        action_ts,
        actor: row.get(3)?,
        section: row.get(4)?,
        entity_id: row.get(5)?,
        payload_json: payload_json_str.and_then(|s| serde_json::from_str(&s).ok()),
        detail: row.get(7)?,
    })
}
