// ==========================================
// 设施新风量引擎 - 新风量报表 API
// ==========================================
// 职责: 房间设计新风、活动新风汇总、分区/AHU 汇总、分区峰值、CSV 导出
// 红线: 只读, 不回写任何参考数据
// ==========================================

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{config_error, ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::airflow::{AirflowGroupSummary, AirflowResult, ZonePeakDemand};
use crate::domain::event::Event;
use crate::domain::facility::Building;
use crate::domain::occupancy::OccupancyCategory;
use crate::domain::room::Room;
use crate::domain::types::{BuildingId, GroupingMode, RoomId};
use crate::domain::xref::RoomZoneXref;
use crate::engine::consistency::{AhuAirflowSummary, ConsistencyChecker, ZoneGroupCheck};
use crate::engine::event_airflow::{EventAirflowAggregator, EventAirflowReport};
use crate::repository::building_repo::BuildingRepository;
use crate::repository::event_repo::EventRepository;
use crate::repository::occupancy_repo::OccupancyCategoryRepository;
use crate::repository::room_repo::RoomRepository;
use crate::repository::xref_repo::XrefRepository;
use crate::repository::zone_repo::ZoneRepository;

/// 房间设计口径报表 (房间页)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomAirflowReport {
    pub building_id: BuildingId,
    pub rows: Vec<AirflowResult>,
    pub rooms: Vec<AirflowGroupSummary>,
}

/// CSV 导出行 (告警拼接为单列)
#[derive(Debug, Serialize)]
struct AirflowCsvRow<'a> {
    facility_id: &'a str,
    room_id: i64,
    zone_id: Option<i64>,
    event_id: Option<i64>,
    people_outdoor_air_rate: f64,
    area_outdoor_air_rate: f64,
    people_outdoor_air: f64,
    area_outdoor_air: f64,
    total_outdoor_air: f64,
    zone_outdoor_air: f64,
    over_capacity: bool,
    warnings: String,
}

/// 活动汇总的输入数据
struct EventInputs {
    rooms: Vec<Room>,
    xrefs: Vec<RoomZoneXref>,
    categories: HashMap<RoomId, OccupancyCategory>,
    events: Vec<Event>,
}

// ==========================================
// AirflowApi - 新风量报表 API
// ==========================================
pub struct AirflowApi {
    building_repo: Arc<BuildingRepository>,
    room_repo: Arc<RoomRepository>,
    zone_repo: Arc<ZoneRepository>,
    xref_repo: Arc<XrefRepository>,
    event_repo: Arc<EventRepository>,
    occupancy_repo: Arc<OccupancyCategoryRepository>,
    config_manager: Arc<ConfigManager>,
    aggregator: EventAirflowAggregator,
}

impl AirflowApi {
    pub fn new(
        building_repo: Arc<BuildingRepository>,
        room_repo: Arc<RoomRepository>,
        zone_repo: Arc<ZoneRepository>,
        xref_repo: Arc<XrefRepository>,
        event_repo: Arc<EventRepository>,
        occupancy_repo: Arc<OccupancyCategoryRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            building_repo,
            room_repo,
            zone_repo,
            xref_repo,
            event_repo,
            occupancy_repo,
            config_manager,
            aggregator: EventAirflowAggregator::new(),
        }
    }

    /// 房间设计新风 (按分区份额, 不含活动)
    pub fn room_airflow_report(&self, building_id: BuildingId) -> ApiResult<RoomAirflowReport> {
        self.get_building(building_id)?;

        let rooms = self.room_repo.find_by_building(building_id)?;
        let xrefs = self.xref_repo.find_by_building(building_id)?;
        let categories = self.occupancy_repo.find_by_building_rooms(building_id)?;

        let rows = self.aggregator.design_airflow(&rooms, &xrefs, &categories);
        let summaries = self.aggregator.group_rows(&rows, GroupingMode::Room);

        Ok(RoomAirflowReport {
            building_id,
            rows,
            rooms: summaries,
        })
    }

    /// 活动新风汇总
    ///
    /// 活动按建筑代码前缀选取, 引用了不存在房间的活动以告警形式返回
    pub fn event_airflow_report(
        &self,
        building_id: BuildingId,
        mode: GroupingMode,
    ) -> ApiResult<EventAirflowReport> {
        let inputs = self.load_event_inputs(building_id)?;
        let report = self.aggregator.aggregate_by_event(
            &inputs.events,
            &inputs.rooms,
            &inputs.xrefs,
            &inputs.categories,
            mode,
        );

        let flagged = report.rows.iter().filter(|r| !r.warnings.is_empty()).count();
        if flagged > 0 || !report.unassigned_warnings.is_empty() {
            tracing::warn!(
                building_id,
                %mode,
                flagged_rows = flagged,
                unassigned = report.unassigned_warnings.len(),
                "活动新风汇总存在数据质量告警"
            );
        }

        Ok(report)
    }

    /// 分区检查 (成员房间份额与新风量合计)
    pub fn zone_report(&self, building_id: BuildingId) -> ApiResult<Vec<ZoneGroupCheck>> {
        self.get_building(building_id)?;
        let checker = self.checker()?;

        let zones = self.zone_repo.find_by_building(building_id)?;
        let rooms = self.room_repo.find_by_building(building_id)?;
        let xrefs = self.xref_repo.find_by_building(building_id)?;
        let categories = self.occupancy_repo.find_by_building_rooms(building_id)?;

        Ok(zones
            .iter()
            .map(|zone| checker.check_zone_group(zone, &rooms, &xrefs, &categories))
            .collect())
    }

    /// 按 AHU 汇总分区检查
    pub fn ahu_summary(&self, building_id: BuildingId) -> ApiResult<Vec<AhuAirflowSummary>> {
        let checks = self.zone_report(building_id)?;
        Ok(self.checker()?.roll_up_by_ahu(&checks))
    }

    /// 各分区在一周内的峰值需求
    pub fn peak_zone_demand(&self, building_id: BuildingId) -> ApiResult<Vec<ZonePeakDemand>> {
        let inputs = self.load_event_inputs(building_id)?;
        let report = self.aggregator.aggregate_by_event(
            &inputs.events,
            &inputs.rooms,
            &inputs.xrefs,
            &inputs.categories,
            GroupingMode::ZoneEvent,
        );
        Ok(self.aggregator.peak_zone_demand(&inputs.events, &report.rows))
    }

    /// 导出明细行为 CSV, 返回写出的行数
    pub fn export_csv<W: Write>(&self, rows: &[AirflowResult], writer: W) -> ApiResult<usize> {
        let mut wtr = csv::Writer::from_writer(writer);

        for row in rows {
            let warnings: Vec<String> = row.warnings.iter().map(|w| w.to_string()).collect();
            wtr.serialize(AirflowCsvRow {
                facility_id: &row.facility_id,
                room_id: row.room_id,
                zone_id: row.zone_id,
                event_id: row.event_id,
                people_outdoor_air_rate: row.people_outdoor_air_rate,
                area_outdoor_air_rate: row.area_outdoor_air_rate,
                people_outdoor_air: row.people_outdoor_air,
                area_outdoor_air: row.area_outdoor_air,
                total_outdoor_air: row.total_outdoor_air,
                zone_outdoor_air: row.zone_outdoor_air,
                over_capacity: row.over_capacity,
                warnings: warnings.join("; "),
            })
            .map_err(|e| ApiError::InternalError(format!("CSV 写出失败: {}", e)))?;
        }

        wtr.flush()
            .map_err(|e| ApiError::InternalError(format!("CSV 写出失败: {}", e)))?;
        Ok(rows.len())
    }

    // ==========================================
    // 内部
    // ==========================================

    fn get_building(&self, building_id: BuildingId) -> ApiResult<Building> {
        self.building_repo
            .find_by_id(building_id)?
            .ok_or_else(|| ApiError::NotFound(format!("建筑(id={})不存在", building_id)))
    }

    fn load_event_inputs(&self, building_id: BuildingId) -> ApiResult<EventInputs> {
        let building = self.get_building(building_id)?;
        Ok(EventInputs {
            rooms: self.room_repo.find_by_building(building_id)?,
            xrefs: self.xref_repo.find_by_building(building_id)?,
            categories: self.occupancy_repo.find_by_building_rooms(building_id)?,
            events: self
                .event_repo
                .find_by_facility_prefix(&format!("{}-", building.code))?,
        })
    }

    fn checker(&self) -> ApiResult<ConsistencyChecker> {
        let config = self.config_manager.consistency_config().map_err(config_error)?;
        Ok(ConsistencyChecker::new(config))
    }
}
