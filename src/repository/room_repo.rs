// ==========================================
// 设施新风量引擎 - 房间数据仓储
// ==========================================
// 职责: room 表读写; 按建筑查询经 floor 关联
// ==========================================

use crate::domain::room::Room;
use crate::domain::types::{BuildingId, RoomId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    r.room_id, r.facility_id, r.floor_id, r.area, r.population,
    r.uncertainty_amount, r.occupancy_category_id, r.reservable, r.active
"#;

pub struct RoomRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RoomRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, room_id: RoomId) -> RepositoryResult<Option<Room>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM room r WHERE r.room_id = ?1", SELECT_COLUMNS);
        let room = conn.query_row(&sql, params![room_id], map_room).optional()?;
        Ok(room)
    }

    /// 查询房间, 不存在时返回 NotFound
    pub fn get(&self, room_id: RoomId) -> RepositoryResult<Room> {
        self.find_by_id(room_id)?
            .ok_or_else(|| RepositoryError::not_found("room", room_id))
    }

    pub fn find_by_facility_id(&self, facility_id: &str) -> RepositoryResult<Option<Room>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM room r WHERE r.facility_id = ?1", SELECT_COLUMNS);
        let room = conn
            .query_row(&sql, params![facility_id], map_room)
            .optional()?;
        Ok(room)
    }

    pub fn find_by_building(&self, building_id: BuildingId) -> RepositoryResult<Vec<Room>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM room r
            JOIN floor f ON f.floor_id = r.floor_id
            WHERE f.building_id = ?1
            ORDER BY r.facility_id
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rooms = stmt
            .query_map(params![building_id], map_room)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rooms)
    }

    // ==========================================
    // 写入
    // ==========================================

    pub fn upsert(&self, room: &Room) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO room (
                room_id, facility_id, floor_id, area, population,
                uncertainty_amount, occupancy_category_id, reservable, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(room_id) DO UPDATE SET
                facility_id = excluded.facility_id,
                floor_id = excluded.floor_id,
                area = excluded.area,
                population = excluded.population,
                uncertainty_amount = excluded.uncertainty_amount,
                occupancy_category_id = excluded.occupancy_category_id,
                reservable = excluded.reservable,
                active = excluded.active
            "#,
            params![
                room.id,
                room.facility_id,
                room.floor_id,
                room.area,
                room.population,
                room.uncertainty_amount,
                room.occupancy_category_id,
                room.reservable,
                room.active,
            ],
        )?;
        Ok(())
    }

    /// 删除房间 (交叉引用随外键级联删除)
    pub fn delete(&self, room_id: RoomId) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM room WHERE room_id = ?1", params![room_id])?;
        Ok(rows)
    }
}

fn map_room(row: &Row) -> SqliteResult<Room> {
    Ok(Room {
        id: row.get(0)?,
        facility_id: row.get(1)?,
        floor_id: row.get(2)?,
        area: row.get(3)?,
        population: row.get(4)?,
        uncertainty_amount: row.get(5)?,
        occupancy_category_id: row.get(6)?,
        reservable: row.get(7)?,
        active: row.get(8)?,
    })
}
