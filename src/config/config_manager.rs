// ==========================================
// 设施新风量引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::consistency::ConsistencyConfig;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 按数据库路径创建
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 (对传入连接再次应用统一 PRAGMA, 幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn get_f64(&self, key: &str, default: f64) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        let parsed: f64 = value
            .trim()
            .parse()
            .map_err(|e| format!("配置{}不是数值: {} ({})", key, value, e))?;
        Ok(parsed)
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(key, if default { "true" } else { "false" })?;
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(format!("配置{}不是布尔值: {}", key, other).into()),
        }
    }

    /// 写入 global scope 配置 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now','localtime'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 所有 global 配置的快照 (JSON)
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 一致性校验配置 =====

    /// 一致性校验参数 (人数占比区间 + 比较小数位)
    pub fn consistency_config(&self) -> Result<ConsistencyConfig, Box<dyn Error>> {
        let defaults = ConsistencyConfig::default();
        let proportion_low = self.get_f64(config_keys::PROPORTION_TOLERANCE_LOW, defaults.proportion_low)?;
        let proportion_high =
            self.get_f64(config_keys::PROPORTION_TOLERANCE_HIGH, defaults.proportion_high)?;
        let decimals = self.get_f64(config_keys::CONSISTENCY_DECIMALS, defaults.decimals as f64)?;

        if proportion_low > proportion_high {
            return Err(format!(
                "人数占比区间无效: low={} > high={}",
                proportion_low, proportion_high
            )
            .into());
        }
        if !(0.0..=10.0).contains(&decimals) {
            return Err(format!("比较小数位超出范围: {}", decimals).into());
        }

        Ok(ConsistencyConfig {
            proportion_low,
            proportion_high,
            decimals: decimals as u32,
        })
    }

    // ===== 功能开关 =====

    /// 是否允许均分重置 (autoCalculate)
    pub fn is_auto_calculate_enabled(&self) -> Result<bool, Box<dyn Error>> {
        self.get_bool(config_keys::XREF_AUTO_CALCULATE_ENABLED, true)
    }

    /// 是否允许单元格人工编辑
    pub fn is_manual_edit_enabled(&self) -> Result<bool, Box<dyn Error>> {
        self.get_bool(config_keys::XREF_MANUAL_EDIT_ENABLED, true)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 一致性校验
    pub const PROPORTION_TOLERANCE_LOW: &str = "proportion_tolerance_low";
    pub const PROPORTION_TOLERANCE_HIGH: &str = "proportion_tolerance_high";
    pub const CONSISTENCY_DECIMALS: &str = "consistency_decimals";

    // 功能开关
    pub const XREF_AUTO_CALCULATE_ENABLED: &str = "xref_auto_calculate_enabled";
    pub const XREF_MANUAL_EDIT_ENABLED: &str = "xref_manual_edit_enabled";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let manager = setup_manager();

        assert_eq!(manager.consistency_config().unwrap(), ConsistencyConfig::default());
        assert!(manager.is_auto_calculate_enabled().unwrap());
        assert!(manager.is_manual_edit_enabled().unwrap());
        assert_eq!(manager.get_config_snapshot().unwrap(), "{}");
    }

    #[test]
    fn test_override_values() {
        let manager = setup_manager();

        manager
            .set_global_config_value(config_keys::PROPORTION_TOLERANCE_LOW, "0.95")
            .unwrap();
        manager
            .set_global_config_value(config_keys::XREF_AUTO_CALCULATE_ENABLED, "false")
            .unwrap();

        let config = manager.consistency_config().unwrap();
        assert_eq!(config.proportion_low, 0.95);
        assert_eq!(config.proportion_high, 1.0);
        assert!(!manager.is_auto_calculate_enabled().unwrap());

        let snapshot: HashMap<String, String> =
            serde_json::from_str(&manager.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let manager = setup_manager();

        manager
            .set_global_config_value(config_keys::PROPORTION_TOLERANCE_LOW, "abc")
            .unwrap();
        assert!(manager.consistency_config().is_err());

        manager
            .set_global_config_value(config_keys::PROPORTION_TOLERANCE_LOW, "1.2")
            .unwrap();
        assert!(manager.consistency_config().is_err());

        manager
            .set_global_config_value(config_keys::XREF_MANUAL_EDIT_ENABLED, "maybe")
            .unwrap();
        assert!(manager.is_manual_edit_enabled().is_err());
    }
}
