// ==========================================
// 设施新风量引擎 - 活动数据仓储
// ==========================================
// 职责: event 表读写 (外部教务数据落地后只读使用)
// 说明: 活动按 room_facility_id 关联房间, 不设外键;
//       引用不存在的房间由汇总引擎以 UnknownRoom 告警
// ==========================================

use chrono::NaiveDateTime;

use crate::domain::event::Event;
use crate::domain::types::EventId;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct EventRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EventRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, event: &Event) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO event (
                event_id, title, room_facility_id, enrollment_total,
                start_date_time, end_date_time, days_pattern
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(event_id) DO UPDATE SET
                title = excluded.title,
                room_facility_id = excluded.room_facility_id,
                enrollment_total = excluded.enrollment_total,
                start_date_time = excluded.start_date_time,
                end_date_time = excluded.end_date_time,
                days_pattern = excluded.days_pattern
            "#,
            params![
                event.id,
                event.title,
                event.room_facility_id,
                event.enrollment_total,
                event.start_date_time.format(TS_FORMAT).to_string(),
                event.end_date_time.format(TS_FORMAT).to_string(),
                event.days_pattern(),
            ],
        )?;
        Ok(())
    }

    /// 批量写入 (单事务)
    pub fn batch_upsert(&self, events: &[Event]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::transaction)?;

        let mut count = 0;
        for event in events {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO event (
                    event_id, title, room_facility_id, enrollment_total,
                    start_date_time, end_date_time, days_pattern
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    event.id,
                    event.title,
                    event.room_facility_id,
                    event.enrollment_total,
                    event.start_date_time.format(TS_FORMAT).to_string(),
                    event.end_date_time.format(TS_FORMAT).to_string(),
                    event.days_pattern(),
                ],
            )?;
            count += 1;
        }

        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(count)
    }

    pub fn find_by_id(&self, event_id: EventId) -> RepositoryResult<Option<Event>> {
        let conn = self.get_conn()?;
        let event = conn
            .query_row(
                r#"
                SELECT event_id, title, room_facility_id, enrollment_total,
                       start_date_time, end_date_time, days_pattern
                FROM event
                WHERE event_id = ?1
                "#,
                params![event_id],
                map_event,
            )
            .optional()?;
        Ok(event)
    }

    /// 按房间编码前缀查询 (包含引用了不存在房间的活动)
    pub fn find_by_facility_prefix(&self, prefix: &str) -> RepositoryResult<Vec<Event>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT event_id, title, room_facility_id, enrollment_total,
                   start_date_time, end_date_time, days_pattern
            FROM event
            WHERE substr(room_facility_id, 1, length(?1)) = ?1
            ORDER BY event_id
            "#,
        )?;
        let events = stmt
            .query_map(params![prefix], map_event)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(events)
    }
}

fn map_event(row: &Row) -> SqliteResult<Event> {
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;
    let pattern: String = row.get(6)?;

    let start_date_time = NaiveDateTime::parse_from_str(&start_str, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let end_date_time = NaiveDateTime::parse_from_str(&end_str, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        room_facility_id: row.get(2)?,
        enrollment_total: row.get(3)?,
        start_date_time,
        end_date_time,
        day_of_week_flags: Event::flags_from_pattern(&pattern),
    })
}
