// ==========================================
// 设施新风量引擎 - 活动新风量汇总引擎
// ==========================================
// 职责: 按排课/考试活动计算房间、分区的新风需求并分组汇总
// 输入: 活动 + 房间 + 交叉引用 + 房间人员类别
// 输出: AirflowResult 明细 + 分组汇总 + 分区峰值
// 红线: 只读派生数据, 不回写 (回写只走 RoomZoneAllocator::apply_manual_share)
// ==========================================

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::airflow::{AirflowGroupSummary, AirflowResult, GroupKey, ZonePeakDemand};
use crate::domain::event::Event;
use crate::domain::occupancy::OccupancyCategory;
use crate::domain::room::Room;
use crate::domain::types::{EventId, GroupingMode, RoomId, ZoneId};
use crate::domain::warning::DataQualityWarning;
use crate::domain::xref::RoomZoneXref;

/// 汇总结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAirflowReport {
    pub mode: GroupingMode,
    pub rows: Vec<AirflowResult>,
    pub groups: Vec<AirflowGroupSummary>,
    /// 无法落到任何明细行的告警 (例如活动引用了不存在的房间)
    pub unassigned_warnings: Vec<DataQualityWarning>,
}

// ==========================================
// EventAirflowAggregator - 活动新风量汇总引擎
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct EventAirflowAggregator {
    // 无状态引擎
}

impl EventAirflowAggregator {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 按活动计算新风量并按分组模式汇总
    ///
    /// 每个 (房间, 分区, 活动) 生成一行:
    /// - people_outdoor_air = 人员新风率 × 活动人数
    /// - area_outdoor_air = 面积新风率 × 分区面积份额
    /// - zone_outdoor_air = pr_percent × (活动人数 + 不确定裕量) × 人员新风率
    ///
    /// 活动人数超过房间设计人数时只标记, 不截断
    #[instrument(skip_all, fields(events = events.len(), rooms = rooms.len(), xrefs = xrefs.len(), mode = %mode))]
    pub fn aggregate_by_event(
        &self,
        events: &[Event],
        rooms: &[Room],
        xrefs: &[RoomZoneXref],
        categories: &HashMap<RoomId, OccupancyCategory>,
        mode: GroupingMode,
    ) -> EventAirflowReport {
        let rooms_by_facility: HashMap<&str, &Room> =
            rooms.iter().map(|r| (r.facility_id.as_str(), r)).collect();
        let xrefs_by_room = index_xrefs_by_room(xrefs);

        let mut rows = Vec::new();
        let mut unassigned_warnings = Vec::new();

        for event in events {
            let room = match rooms_by_facility.get(event.room_facility_id.as_str()) {
                Some(r) => *r,
                None => {
                    unassigned_warnings.push(DataQualityWarning::UnknownRoom {
                        event_id: event.id,
                        room_facility_id: event.room_facility_id.clone(),
                    });
                    continue;
                }
            };

            let room_xrefs = xrefs_by_room.get(&room.id).map(Vec::as_slice).unwrap_or(&[]);
            rows.extend(self.rows_for_event(event, room, room_xrefs, categories.get(&room.id)));
        }

        let over_capacity = rows.iter().filter(|r| r.over_capacity).count();
        if over_capacity > 0 {
            tracing::warn!(over_capacity, "存在活动人数超过房间设计人数");
        }

        let groups = self.group_rows(&rows, mode);
        EventAirflowReport {
            mode,
            rows,
            groups,
            unassigned_warnings,
        }
    }

    /// 房间设计口径 (无活动): 每个 (房间, 分区) 一行,
    /// 人员新风按分区人数份额计算
    pub fn design_airflow(
        &self,
        rooms: &[Room],
        xrefs: &[RoomZoneXref],
        categories: &HashMap<RoomId, OccupancyCategory>,
    ) -> Vec<AirflowResult> {
        let xrefs_by_room = index_xrefs_by_room(xrefs);
        let mut rows = Vec::new();

        for room in rooms {
            let category = categories.get(&room.id);
            let (people_rate, area_rate, mut base_warnings) = rates_of(room, category);
            let room_xrefs = xrefs_by_room.get(&room.id).map(Vec::as_slice).unwrap_or(&[]);

            if room_xrefs.is_empty() {
                base_warnings.push(DataQualityWarning::NoZoneAssignment { room_id: room.id });
                rows.push(AirflowResult {
                    room_id: room.id,
                    facility_id: room.facility_id.clone(),
                    zone_id: None,
                    event_id: None,
                    people_outdoor_air_rate: people_rate,
                    area_outdoor_air_rate: area_rate,
                    people_outdoor_air: people_rate * room.design_population(),
                    area_outdoor_air: area_rate * room.area,
                    total_outdoor_air: people_rate * room.design_population() + area_rate * room.area,
                    zone_outdoor_air: 0.0,
                    over_capacity: false,
                    warnings: base_warnings,
                });
                continue;
            }

            for xref in room_xrefs {
                let mut warnings = base_warnings.clone();
                let population = numeric_or_zero(xref, "xref_population", xref.xref_population, &mut warnings);
                let area = numeric_or_zero(xref, "xref_area", xref.xref_area, &mut warnings);
                let people = people_rate * population;
                let area_oa = area_rate * area;

                rows.push(AirflowResult {
                    room_id: room.id,
                    facility_id: room.facility_id.clone(),
                    zone_id: Some(xref.zone_id),
                    event_id: None,
                    people_outdoor_air_rate: people_rate,
                    area_outdoor_air_rate: area_rate,
                    people_outdoor_air: people,
                    area_outdoor_air: area_oa,
                    total_outdoor_air: people + area_oa,
                    zone_outdoor_air: people,
                    over_capacity: false,
                    warnings,
                });
            }
        }

        rows
    }

    /// 按分组模式汇总明细行
    ///
    /// 同一组内每个 (房间, 活动) 的活动新风只计一次,
    /// 避免一个活动因房间跨多个分区而被重复累加
    pub fn group_rows(&self, rows: &[AirflowResult], mode: GroupingMode) -> Vec<AirflowGroupSummary> {
        let mut groups: BTreeMap<GroupKey, AirflowGroupSummary> = BTreeMap::new();
        let mut counted: HashSet<(GroupKey, RoomId, Option<EventId>)> = HashSet::new();

        for row in rows {
            let key = group_key(row, mode);
            let summary = groups
                .entry(key)
                .or_insert_with(|| AirflowGroupSummary::empty(key));

            summary.row_count += 1;
            summary.people_outdoor_air_rate_sum += row.people_outdoor_air_rate;
            summary.zone_outdoor_air_sum += row.zone_outdoor_air;
            summary.max_event_outdoor_air = summary.max_event_outdoor_air.max(row.people_outdoor_air);
            summary.max_zone_outdoor_air = summary.max_zone_outdoor_air.max(row.zone_outdoor_air);
            if !row.warnings.is_empty() {
                summary.warning_count += 1;
            }

            if counted.insert((key, row.room_id, row.event_id)) {
                summary.event_outdoor_air_sum += row.people_outdoor_air;
                if row.over_capacity {
                    summary.over_capacity_count += 1;
                }
            }
        }

        groups.into_values().collect()
    }

    /// 分区峰值需求: 同一分区下时间重叠的活动同时在场时的最大分摊新风
    ///
    /// 候选时刻取 (星期, 各活动在该星期的首次上课日, 各活动起始时刻) 的组合,
    /// 区间重叠的最大值必然出现在某个区间的起点。
    /// 活动只在学期跨度内且 day_of_week_flags 标记的日期上课。
    pub fn peak_zone_demand(&self, events: &[Event], rows: &[AirflowResult]) -> Vec<ZonePeakDemand> {
        let events_by_id: HashMap<EventId, &Event> = events.iter().map(|e| (e.id, e)).collect();

        // zone_id -> [(活动, 分摊新风)]
        let mut by_zone: BTreeMap<ZoneId, Vec<(&Event, f64)>> = BTreeMap::new();
        for row in rows {
            if let (Some(zone_id), Some(event_id)) = (row.zone_id, row.event_id) {
                if let Some(event) = events_by_id.get(&event_id) {
                    by_zone
                        .entry(zone_id)
                        .or_default()
                        .push((*event, row.zone_outdoor_air));
                }
            }
        }

        by_zone
            .into_iter()
            .map(|(zone_id, members)| peak_for_zone(zone_id, &members))
            .collect()
    }

    /// 单个活动在房间内生成的明细行
    fn rows_for_event(
        &self,
        event: &Event,
        room: &Room,
        room_xrefs: &[RoomZoneXref],
        category: Option<&OccupancyCategory>,
    ) -> Vec<AirflowResult> {
        let (people_rate, area_rate, mut base_warnings) = rates_of(room, category);

        let enrollment = match event.enrollment_total {
            Some(n) => n as f64,
            None => {
                base_warnings.push(DataQualityWarning::missing_value(
                    "event",
                    event.id,
                    "enrollment_total",
                ));
                0.0
            }
        };

        let capacity = room.design_population();
        let over_capacity = enrollment > capacity;
        if over_capacity {
            base_warnings.push(DataQualityWarning::CapacityExceeded {
                event_id: event.id,
                room_id: room.id,
                enrollment,
                capacity,
            });
        }

        let event_outdoor_air = people_rate * enrollment;

        if room_xrefs.is_empty() {
            base_warnings.push(DataQualityWarning::NoZoneAssignment { room_id: room.id });
            return vec![AirflowResult {
                room_id: room.id,
                facility_id: room.facility_id.clone(),
                zone_id: None,
                event_id: Some(event.id),
                people_outdoor_air_rate: people_rate,
                area_outdoor_air_rate: area_rate,
                people_outdoor_air: event_outdoor_air,
                area_outdoor_air: 0.0,
                total_outdoor_air: event_outdoor_air,
                zone_outdoor_air: 0.0,
                over_capacity,
                warnings: base_warnings,
            }];
        }

        room_xrefs
            .iter()
            .map(|xref| {
                let mut warnings = base_warnings.clone();
                let pr_percent = numeric_or_zero(xref, "pr_percent", xref.pr_percent, &mut warnings);
                let area = numeric_or_zero(xref, "xref_area", xref.xref_area, &mut warnings);

                let area_outdoor_air = area_rate * area;
                let zone_outdoor_air =
                    pr_percent * (enrollment + room.uncertainty_amount) * people_rate;

                AirflowResult {
                    room_id: room.id,
                    facility_id: room.facility_id.clone(),
                    zone_id: Some(xref.zone_id),
                    event_id: Some(event.id),
                    people_outdoor_air_rate: people_rate,
                    area_outdoor_air_rate: area_rate,
                    people_outdoor_air: event_outdoor_air,
                    area_outdoor_air,
                    total_outdoor_air: event_outdoor_air + area_outdoor_air,
                    zone_outdoor_air,
                    over_capacity,
                    warnings,
                }
            })
            .collect()
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn index_xrefs_by_room(xrefs: &[RoomZoneXref]) -> HashMap<RoomId, Vec<RoomZoneXref>> {
    let mut map: HashMap<RoomId, Vec<RoomZoneXref>> = HashMap::new();
    for xref in xrefs {
        map.entry(xref.room_id).or_default().push(xref.clone());
    }
    for list in map.values_mut() {
        list.sort_by_key(|x| x.zone_id);
    }
    map
}

/// 房间的 (人员新风率, 面积新风率, 告警); 类别缺失时为 0 并告警
fn rates_of(
    room: &Room,
    category: Option<&OccupancyCategory>,
) -> (f64, f64, Vec<DataQualityWarning>) {
    match category {
        Some(c) => (c.people_outdoor_air_rate, c.area_outdoor_air_rate, Vec::new()),
        None => (
            0.0,
            0.0,
            vec![DataQualityWarning::MissingCategory {
                room_id: Some(room.id),
            }],
        ),
    }
}

fn numeric_or_zero(
    xref: &RoomZoneXref,
    field: &str,
    value: Option<f64>,
    warnings: &mut Vec<DataQualityWarning>,
) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => {
            warnings.push(DataQualityWarning::missing_value(
                "room_zone_xref",
                format!("{}:{}", xref.room_id, xref.zone_id),
                field,
            ));
            0.0
        }
    }
}

fn group_key(row: &AirflowResult, mode: GroupingMode) -> GroupKey {
    match mode {
        GroupingMode::Room => GroupKey::Room { room_id: row.room_id },
        GroupingMode::Zone => GroupKey::Zone { zone_id: row.zone_id },
        GroupingMode::ZoneEvent => GroupKey::ZoneEvent {
            zone_id: row.zone_id,
            event_id: row.event_id,
        },
        GroupingMode::RoomEvent => GroupKey::RoomEvent {
            room_id: row.room_id,
            event_id: row.event_id,
        },
        GroupingMode::Event => GroupKey::Event { event_id: row.event_id },
    }
}

fn peak_for_zone(zone_id: ZoneId, members: &[(&Event, f64)]) -> ZonePeakDemand {
    let mut best = ZonePeakDemand {
        zone_id,
        peak_zone_outdoor_air: 0.0,
        weekday_index: None,
        at_time: None,
        concurrent_event_ids: Vec::new(),
    };

    for weekday in 0..7 {
        // 重叠集合的最大值必然出现在某个活动在该星期的首次上课日
        let dates: BTreeSet<NaiveDate> = members
            .iter()
            .filter_map(|(e, _)| e.first_date_on(weekday))
            .collect();
        let times: BTreeSet<NaiveTime> = members
            .iter()
            .filter(|(e, _)| e.meets_on(weekday))
            .map(|(e, _)| e.start_time())
            .collect();

        for date in &dates {
            for time in &times {
                let active: Vec<&(&Event, f64)> = members
                    .iter()
                    .filter(|(e, _)| e.active_at(*date, *time))
                    .collect();
                let demand: f64 = active.iter().map(|(_, oa)| *oa).sum();

                if demand > best.peak_zone_outdoor_air {
                    let mut ids: Vec<EventId> = active.iter().map(|(e, _)| e.id).collect();
                    ids.sort_unstable();
                    best.peak_zone_outdoor_air = demand;
                    best.weekday_index = Some(weekday);
                    best.at_time = Some(*time);
                    best.concurrent_event_ids = ids;
                }
            }
        }
    }

    best
}
