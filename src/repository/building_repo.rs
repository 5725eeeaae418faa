// ==========================================
// 设施新风量引擎 - 建筑/楼层数据仓储
// ==========================================
// 职责: building / floor 表读写, 按建筑范围查询的入口
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::facility::{Building, Floor};
use crate::domain::types::BuildingId;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct BuildingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BuildingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // building
    // ==========================================

    pub fn upsert(&self, building: &Building) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO building (building_id, code, name, campus, active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(building_id) DO UPDATE SET
                code = excluded.code,
                name = excluded.name,
                campus = excluded.campus,
                active = excluded.active
            "#,
            params![
                building.id,
                building.code,
                building.name,
                building.campus,
                building.active,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, building_id: BuildingId) -> RepositoryResult<Option<Building>> {
        let conn = self.get_conn()?;
        let building = conn
            .query_row(
                "SELECT building_id, code, name, campus, active FROM building WHERE building_id = ?1",
                params![building_id],
                map_building,
            )
            .optional()?;
        Ok(building)
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<Building>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT building_id, code, name, campus, active
            FROM building
            WHERE active = 1
            ORDER BY code
            "#,
        )?;
        let buildings = stmt
            .query_map([], map_building)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(buildings)
    }

    // ==========================================
    // floor
    // ==========================================

    pub fn upsert_floor(&self, floor: &Floor) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO floor (floor_id, building_id, name)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(floor_id) DO UPDATE SET
                building_id = excluded.building_id,
                name = excluded.name
            "#,
            params![floor.id, floor.building_id, floor.name],
        )?;
        Ok(())
    }

    pub fn find_floors(&self, building_id: BuildingId) -> RepositoryResult<Vec<Floor>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT floor_id, building_id, name FROM floor WHERE building_id = ?1 ORDER BY name",
        )?;
        let floors = stmt
            .query_map(params![building_id], |row| {
                Ok(Floor {
                    id: row.get(0)?,
                    building_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(floors)
    }
}

fn map_building(row: &Row) -> SqliteResult<Building> {
    Ok(Building {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        campus: row.get(3)?,
        active: row.get(4)?,
    })
}
