// ==========================================
// 设施新风量引擎 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键 + busy_timeout)
// - 建表幂等, 并记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 全量建表语句 (IF NOT EXISTS, 可重复执行)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now','localtime'))
);

CREATE TABLE IF NOT EXISTS building (
    building_id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    campus TEXT,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS floor (
    floor_id INTEGER PRIMARY KEY,
    building_id INTEGER NOT NULL REFERENCES building(building_id) ON DELETE CASCADE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS occupancy_category (
    category_id INTEGER PRIMARY KEY,
    category TEXT NOT NULL UNIQUE,
    people_outdoor_air_rate REAL NOT NULL,
    area_outdoor_air_rate REAL NOT NULL,
    occupant_density REAL NOT NULL DEFAULT 0,
    standby_allowed INTEGER NOT NULL DEFAULT 0,
    type_group TEXT
);

CREATE TABLE IF NOT EXISTS room (
    room_id INTEGER PRIMARY KEY,
    facility_id TEXT NOT NULL UNIQUE,
    floor_id INTEGER NOT NULL REFERENCES floor(floor_id),
    area REAL NOT NULL CHECK (area > 0),
    population REAL NOT NULL DEFAULT 0 CHECK (population >= 0),
    uncertainty_amount REAL NOT NULL DEFAULT 0 CHECK (uncertainty_amount >= 0),
    occupancy_category_id INTEGER REFERENCES occupancy_category(category_id),
    reservable INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS ahu (
    ahu_id INTEGER PRIMARY KEY,
    building_id INTEGER NOT NULL REFERENCES building(building_id),
    name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    UNIQUE (building_id, name)
);

CREATE TABLE IF NOT EXISTS zone (
    zone_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    building_id INTEGER NOT NULL REFERENCES building(building_id),
    ahu_name TEXT,
    ahu_id INTEGER REFERENCES ahu(ahu_id) ON DELETE SET NULL,
    occupancy_sensor_present INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS room_zone_xref (
    room_id INTEGER NOT NULL REFERENCES room(room_id) ON DELETE CASCADE,
    zone_id INTEGER NOT NULL REFERENCES zone(zone_id) ON DELETE CASCADE,
    xref_area REAL,
    xref_population REAL,
    pr_percent REAL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now','localtime')),
    PRIMARY KEY (room_id, zone_id)
);

CREATE TABLE IF NOT EXISTS event (
    event_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    room_facility_id TEXT NOT NULL,
    enrollment_total INTEGER,
    start_date_time TEXT NOT NULL,
    end_date_time TEXT NOT NULL,
    days_pattern TEXT NOT NULL DEFAULT '-------'
);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    section TEXT,
    entity_id TEXT,
    payload_json TEXT,
    detail TEXT
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now','localtime')),
    PRIMARY KEY (scope_id, key)
);

CREATE INDEX IF NOT EXISTS idx_room_floor ON room(floor_id);
CREATE INDEX IF NOT EXISTS idx_zone_building ON zone(building_id);
CREATE INDEX IF NOT EXISTS idx_xref_zone ON room_zone_xref(zone_id);
CREATE INDEX IF NOT EXISTS idx_event_room ON event(room_facility_id);
CREATE INDEX IF NOT EXISTS idx_action_log_entity ON action_log(section, entity_id);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys 与 busy_timeout 都需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表并写入 schema_version (已是当前版本时不重复写)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    if read_schema_version(conn)? != Some(CURRENT_SCHEMA_VERSION) {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
        tracing::info!(version = CURRENT_SCHEMA_VERSION, "数据库 schema 已初始化");
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO floor (floor_id, building_id, name) VALUES (1, 999, 'L1')",
            [],
        );
        assert!(result.is_err());
    }
}
