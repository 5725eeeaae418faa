// ==========================================
// 设施新风量引擎 - 人员类别数据仓储
// ==========================================
// 职责: occupancy_category 表读写 + 按房间批量取类别
// ==========================================

use std::collections::HashMap;

use crate::domain::occupancy::OccupancyCategory;
use crate::domain::types::{BuildingId, OccupancyCategoryId, RoomId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    c.category_id, c.category, c.people_outdoor_air_rate, c.area_outdoor_air_rate,
    c.occupant_density, c.standby_allowed, c.type_group
"#;

pub struct OccupancyCategoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OccupancyCategoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, category: &OccupancyCategory) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO occupancy_category (
                category_id, category, people_outdoor_air_rate, area_outdoor_air_rate,
                occupant_density, standby_allowed, type_group
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(category_id) DO UPDATE SET
                category = excluded.category,
                people_outdoor_air_rate = excluded.people_outdoor_air_rate,
                area_outdoor_air_rate = excluded.area_outdoor_air_rate,
                occupant_density = excluded.occupant_density,
                standby_allowed = excluded.standby_allowed,
                type_group = excluded.type_group
            "#,
            params![
                category.id,
                category.category,
                category.people_outdoor_air_rate,
                category.area_outdoor_air_rate,
                category.occupant_density,
                category.standby_allowed,
                category.type_group,
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, category_id: OccupancyCategoryId) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM occupancy_category WHERE category_id = ?1",
            params![category_id],
        )?;
        Ok(rows)
    }

    pub fn find_by_id(
        &self,
        category_id: OccupancyCategoryId,
    ) -> RepositoryResult<Option<OccupancyCategory>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM occupancy_category c WHERE c.category_id = ?1",
            SELECT_COLUMNS
        );
        let category = conn
            .query_row(&sql, params![category_id], map_category)
            .optional()?;
        Ok(category)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<OccupancyCategory>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM occupancy_category c ORDER BY c.category",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map([], map_category)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(categories)
    }

    /// 建筑内每个房间的人员类别 (未设置类别的房间不在结果中)
    pub fn find_by_building_rooms(
        &self,
        building_id: BuildingId,
    ) -> RepositoryResult<HashMap<RoomId, OccupancyCategory>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT r.room_id, {}
            FROM room r
            JOIN floor f ON f.floor_id = r.floor_id
            JOIN occupancy_category c ON c.category_id = r.occupancy_category_id
            WHERE f.building_id = ?1
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![building_id], |row| {
                let room_id: RoomId = row.get(0)?;
                let category = OccupancyCategory {
                    id: row.get(1)?,
                    category: row.get(2)?,
                    people_outdoor_air_rate: row.get(3)?,
                    area_outdoor_air_rate: row.get(4)?,
                    occupant_density: row.get(5)?,
                    standby_allowed: row.get(6)?,
                    type_group: row.get(7)?,
                };
                Ok((room_id, category))
            })?
            .collect::<SqliteResult<HashMap<_, _>>>()?;
        Ok(rows)
    }
}

fn map_category(row: &Row) -> SqliteResult<OccupancyCategory> {
    Ok(OccupancyCategory {
        id: row.get(0)?,
        category: row.get(1)?,
        people_outdoor_air_rate: row.get(2)?,
        area_outdoor_air_rate: row.get(3)?,
        occupant_density: row.get(4)?,
        standby_allowed: row.get(5)?,
        type_group: row.get(6)?,
    })
}
