// ==========================================
// 设施新风量引擎 - AHU 数据仓储
// ==========================================
// 职责: ahu 表读写; 旧数据按名称解析 AHU
// 说明: resolve_by_name 只服务于 ZoneRepository::backfill_ahu_ids 迁移,
//       新数据一律走 zone.ahu_id 外键
// ==========================================

use crate::domain::facility::Ahu;
use crate::domain::types::{AhuId, BuildingId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct AhuRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AhuRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, ahu: &Ahu) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO ahu (ahu_id, building_id, name, active)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(ahu_id) DO UPDATE SET
                building_id = excluded.building_id,
                name = excluded.name,
                active = excluded.active
            "#,
            params![ahu.id, ahu.building_id, ahu.name, ahu.active],
        )?;
        Ok(())
    }

    pub fn delete(&self, ahu_id: AhuId) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM ahu WHERE ahu_id = ?1", params![ahu_id])?;
        Ok(rows)
    }

    pub fn find_by_id(&self, ahu_id: AhuId) -> RepositoryResult<Option<Ahu>> {
        let conn = self.get_conn()?;
        let ahu = conn
            .query_row(
                "SELECT ahu_id, building_id, name, active FROM ahu WHERE ahu_id = ?1",
                params![ahu_id],
                map_ahu,
            )
            .optional()?;
        Ok(ahu)
    }

    pub fn list_by_building(&self, building_id: BuildingId) -> RepositoryResult<Vec<Ahu>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT ahu_id, building_id, name, active
            FROM ahu
            WHERE building_id = ?1
            ORDER BY name
            "#,
        )?;
        let ahus = stmt
            .query_map(params![building_id], map_ahu)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(ahus)
    }

    /// 按名称解析 AHU (同一建筑内, 忽略首尾空白与大小写)
    pub fn resolve_by_name(
        &self,
        building_id: BuildingId,
        name: &str,
    ) -> RepositoryResult<Option<Ahu>> {
        let conn = self.get_conn()?;
        let ahu = conn
            .query_row(
                r#"
                SELECT ahu_id, building_id, name, active
                FROM ahu
                WHERE building_id = ?1 AND lower(trim(name)) = lower(trim(?2))
                LIMIT 1
                "#,
                params![building_id, name],
                map_ahu,
            )
            .optional()?;
        Ok(ahu)
    }
}

fn map_ahu(row: &Row) -> SqliteResult<Ahu> {
    Ok(Ahu {
        id: row.get(0)?,
        building_id: row.get(1)?,
        name: row.get(2)?,
        active: row.get(3)?,
    })
}
