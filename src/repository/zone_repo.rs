// ==========================================
// 设施新风量引擎 - 分区数据仓储
// ==========================================
// 职责: zone 表读写 + AHU 外键回填
// ==========================================

use crate::domain::types::{BuildingId, ZoneId};
use crate::domain::zone::Zone;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    zone_id, name, code, building_id, ahu_name, ahu_id, occupancy_sensor_present, active
"#;

/// AHU 外键回填结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AhuBackfillOutcome {
    pub resolved: usize,
    /// 名称无法解析的 (zone_id, ahu_name)
    pub unresolved: Vec<(ZoneId, String)>,
}

pub struct ZoneRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ZoneRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, zone_id: ZoneId) -> RepositoryResult<Option<Zone>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM zone WHERE zone_id = ?1", SELECT_COLUMNS);
        let zone = conn.query_row(&sql, params![zone_id], map_zone).optional()?;
        Ok(zone)
    }

    pub fn find_by_building(&self, building_id: BuildingId) -> RepositoryResult<Vec<Zone>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM zone WHERE building_id = ?1 ORDER BY code",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let zones = stmt
            .query_map(params![building_id], map_zone)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(zones)
    }

    pub fn upsert(&self, zone: &Zone) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO zone (
                zone_id, name, code, building_id, ahu_name, ahu_id,
                occupancy_sensor_present, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(zone_id) DO UPDATE SET
                name = excluded.name,
                code = excluded.code,
                building_id = excluded.building_id,
                ahu_name = excluded.ahu_name,
                ahu_id = excluded.ahu_id,
                occupancy_sensor_present = excluded.occupancy_sensor_present,
                active = excluded.active
            "#,
            params![
                zone.id,
                zone.name,
                zone.code,
                zone.building_id,
                zone.ahu_name,
                zone.ahu_id,
                zone.occupancy_sensor_present,
                zone.active,
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, zone_id: ZoneId) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM zone WHERE zone_id = ?1", params![zone_id])?;
        Ok(rows)
    }

    /// 按 ahu_name 回填 ahu_id (同一建筑内按名称匹配, 单事务)
    ///
    /// 已有 ahu_id 的分区不动; 匹配不到的名称原样返回供告警
    pub fn backfill_ahu_ids(&self, building_id: BuildingId) -> RepositoryResult<AhuBackfillOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::transaction)?;
        let mut outcome = AhuBackfillOutcome::default();

        let pending: Vec<(ZoneId, String)> = {
            let mut stmt = tx.prepare(
                r#"
                SELECT zone_id, ahu_name
                FROM zone
                WHERE building_id = ?1 AND ahu_id IS NULL
                  AND ahu_name IS NOT NULL AND trim(ahu_name) <> ''
                ORDER BY zone_id
                "#,
            )?;
            let rows = stmt
                .query_map(params![building_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows
        };

        for (zone_id, ahu_name) in pending {
            let ahu_id: Option<i64> = tx
                .query_row(
                    r#"
                    SELECT ahu_id FROM ahu
                    WHERE building_id = ?1 AND lower(trim(name)) = lower(trim(?2))
                    LIMIT 1
                    "#,
                    params![building_id, ahu_name],
                    |row| row.get(0),
                )
                .optional()?;

            match ahu_id {
                Some(id) => {
                    tx.execute(
                        "UPDATE zone SET ahu_id = ?1 WHERE zone_id = ?2",
                        params![id, zone_id],
                    )?;
                    outcome.resolved += 1;
                }
                None => outcome.unresolved.push((zone_id, ahu_name)),
            }
        }

        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(outcome)
    }
}

fn map_zone(row: &Row) -> SqliteResult<Zone> {
    Ok(Zone {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        building_id: row.get(3)?,
        ahu_name: row.get(4)?,
        ahu_id: row.get(5)?,
        occupancy_sensor_present: row.get(6)?,
        active: row.get(7)?,
    })
}
