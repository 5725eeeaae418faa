// ==========================================
// 设施新风量引擎 - 房间/分区交叉引用仓储
// ==========================================
// 职责: room_zone_xref 表读写
// 约束: 主键 (room_id, zone_id); 整房间替换在单事务内完成
// 红线: Repository 不做校验与重算, 只做数据映射
// ==========================================

use crate::domain::types::{BuildingId, RoomId, ZoneId};
use crate::domain::xref::RoomZoneXref;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};


const UPSERT_SQL: &str = r#"
    INSERT INTO room_zone_xref (room_id, zone_id, xref_area, xref_population, pr_percent, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, datetime('now','localtime'))
    ON CONFLICT(room_id, zone_id) DO UPDATE SET
        xref_area = excluded.xref_area,
        xref_population = excluded.xref_population,
        pr_percent = excluded.pr_percent,
        updated_at = excluded.updated_at
"#;

pub struct XrefRepository {
    conn: Arc<Mutex<Connection>>,
}

impl XrefRepository {
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

    pub fn find(&self, room_id: RoomId, zone_id: ZoneId) -> RepositoryResult<Option<RoomZoneXref>> {
        let conn = self.get_conn()?;
        let xref = conn
            .query_row(
                r#"
                SELECT room_id, zone_id, xref_area, xref_population, pr_percent
                FROM room_zone_xref
                WHERE room_id = ?1 AND zone_id = ?2
                "#,
                params![room_id, zone_id],
                map_xref,
            )
            .optional()?;
        Ok(xref)
    }

    pub fn find_by_room(&self, room_id: RoomId) -> RepositoryResult<Vec<RoomZoneXref>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT room_id, zone_id, xref_area, xref_population, pr_percent
            FROM room_zone_xref
            WHERE room_id = ?1
            ORDER BY zone_id
            "#,
        )?;
        let xrefs = stmt
            .query_map(params![room_id], map_xref)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(xrefs)
    }

    pub fn find_by_zone(&self, zone_id: ZoneId) -> RepositoryResult<Vec<RoomZoneXref>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT room_id, zone_id, xref_area, xref_population, pr_percent
            FROM room_zone_xref
            WHERE zone_id = ?1
            ORDER BY room_id
            "#,
        )?;
        let xrefs = stmt
            .query_map(params![zone_id], map_xref)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(xrefs)
    }

    /// 建筑内全部交叉引用 (经 room -> floor 关联)
    pub fn find_by_building(&self, building_id: BuildingId) -> RepositoryResult<Vec<RoomZoneXref>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT x.room_id, x.zone_id, x.xref_area, x.xref_population, x.pr_percent
            FROM room_zone_xref x
            JOIN room r ON r.room_id = x.room_id
            JOIN floor f ON f.floor_id = r.floor_id
            WHERE f.building_id = ?1
            ORDER BY x.room_id, x.zone_id
            "#,
        )?;
        let xrefs = stmt
            .query_map(params![building_id], map_xref)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(xrefs)
    }

    // ==========================================
    // 写入
    // ==========================================

    pub fn upsert(&self, xref: &RoomZoneXref) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            UPSERT_SQL,
            params![
                xref.room_id,
                xref.zone_id,
                xref.xref_area,
                xref.xref_population,
                xref.pr_percent,
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, room_id: RoomId, zone_id: ZoneId) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM room_zone_xref WHERE room_id = ?1 AND zone_id = ?2",
            params![room_id, zone_id],
        )?;
        Ok(rows)
    }

    /// 用新的分配整体替换某房间的交叉引用 (单事务)
    ///
    /// 不在 xrefs 中的旧关联会被删除
    pub fn replace_for_room(&self, room_id: RoomId, xrefs: &[RoomZoneXref]) -> RepositoryResult<usize> {
        if let Some(foreign) = xrefs.iter().find(|x| x.room_id != room_id) {
            return Err(RepositoryError::FieldValueError {
                field: "room_id".to_string(),
                message: format!(
                    "替换房间{}的分配时出现房间{}的行",
                    room_id, foreign.room_id
                ),
            });
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::transaction)?;

        tx.execute(
            "DELETE FROM room_zone_xref WHERE room_id = ?1",
            params![room_id],
        )?;

        let mut count = 0;
        for xref in xrefs {
            tx.execute(
                UPSERT_SQL,
                params![
                    xref.room_id,
                    xref.zone_id,
                    xref.xref_area,
                    xref.xref_population,
                    xref.pr_percent,
                ],
            )?;
            count += 1;
        }

        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(count)
    }
}

fn map_xref(row: &Row) -> SqliteResult<RoomZoneXref> {
    Ok(RoomZoneXref {
        room_id: row.get(0)?,
        zone_id: row.get(1)?,
        xref_area: row.get(2)?,
        xref_population: row.get(3)?,
        pr_percent: row.get(4)?,
    })
}
