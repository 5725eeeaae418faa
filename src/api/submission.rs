// ==========================================
// 设施新风量引擎 - 表单提交 API
// ==========================================
// 职责: 按 section 路由 { section, delete, data } 提交, 校验后落库
// 输入: JSON 提交体, data 中字段均可缺失
// 输出: SubmissionOutcome (xref 提交附带房间一致性检查)
// 红线: 原始行先反序列化为全 Option 结构, 校验通过才转换为领域类型
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::api::error::{ApiError, ApiResult};
use crate::api::xref_api::{XrefApi, XrefWriteResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::facility::Ahu;
use crate::domain::occupancy::OccupancyCategory;
use crate::domain::room::Room;
use crate::domain::types::{BuildingId, Section};
use crate::domain::zone::Zone;
use crate::engine::allocator::validate_room;
use crate::engine::error::ensure_non_negative;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::ahu_repo::AhuRepository;
use crate::repository::occupancy_repo::OccupancyCategoryRepository;
use crate::repository::room_repo::RoomRepository;
use crate::repository::zone_repo::{AhuBackfillOutcome, ZoneRepository};

/// 提交体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub section: Section,
    #[serde(default)]
    pub delete: u8, // 0 = 新增/修改, 1 = 删除
    pub data: JsonValue,
}

/// 提交结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub section: Section,
    pub entity_id: String,
    pub deleted: bool,
    pub xref: Option<XrefWriteResult>,
}

// ==========================================
// 原始行 (字段全部可缺失)
// ==========================================

#[derive(Debug, Deserialize)]
struct RawXrefRow {
    room_id: Option<i64>,
    zone_id: Option<i64>,
    xref_area: Option<f64>,
    xref_population: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRoomRow {
    room_id: Option<i64>,
    facility_id: Option<String>,
    floor_id: Option<i64>,
    area: Option<f64>,
    population: Option<f64>,
    uncertainty_amount: Option<f64>,
    occupancy_category_id: Option<i64>,
    reservable: Option<bool>,
    active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawZoneRow {
    zone_id: Option<i64>,
    name: Option<String>,
    code: Option<String>,
    building_id: Option<i64>,
    ahu_name: Option<String>,
    ahu_id: Option<i64>,
    occupancy_sensor_present: Option<bool>,
    active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawAhuRow {
    ahu_id: Option<i64>,
    building_id: Option<i64>,
    name: Option<String>,
    active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawCategoryRow {
    category_id: Option<i64>,
    category: Option<String>,
    people_outdoor_air_rate: Option<f64>,
    area_outdoor_air_rate: Option<f64>,
    occupant_density: Option<f64>,
    standby_allowed: Option<bool>,
    type_group: Option<String>,
}

/// 必填字段收集器
struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    fn new() -> Self {
        Self { missing: Vec::new() }
    }

    fn take<T>(&mut self, field: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing.push(field);
        }
        value
    }

    fn text(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        let value = value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.take(field, value)
    }

    fn finish(self) -> ApiResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(format!(
                "行缺少必填数据: {}",
                self.missing.join(", ")
            )))
        }
    }
}

// ==========================================
// SubmissionApi - 表单提交 API
// ==========================================
pub struct SubmissionApi {
    xref_api: Arc<XrefApi>,
    room_repo: Arc<RoomRepository>,
    zone_repo: Arc<ZoneRepository>,
    ahu_repo: Arc<AhuRepository>,
    occupancy_repo: Arc<OccupancyCategoryRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl SubmissionApi {
    pub fn new(
        xref_api: Arc<XrefApi>,
        room_repo: Arc<RoomRepository>,
        zone_repo: Arc<ZoneRepository>,
        ahu_repo: Arc<AhuRepository>,
        occupancy_repo: Arc<OccupancyCategoryRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            xref_api,
            room_repo,
            zone_repo,
            ahu_repo,
            occupancy_repo,
            action_log_repo,
        }
    }

    /// 处理一次提交
    pub fn submit(&self, payload: &SubmissionPayload, actor: &str) -> ApiResult<SubmissionOutcome> {
        if actor.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        let delete = match payload.delete {
            0 => false,
            1 => true,
            other => {
                return Err(ApiError::InvalidInput(format!(
                    "delete 只能为 0 或 1: {}",
                    other
                )))
            }
        };

        tracing::debug!(section = %payload.section, delete, actor, "收到表单提交");

        match payload.section {
            Section::Xref => self.submit_xref(&payload.data, delete, actor),
            Section::Rooms => self.submit_room(&payload.data, delete, actor),
            Section::Zones => self.submit_zone(&payload.data, delete, actor),
            Section::Ahus => self.submit_ahu(&payload.data, delete, actor),
            Section::OccupancyCategories => self.submit_category(&payload.data, delete, actor),
        }
    }

    /// 按 ahu_name 回填建筑内分区的 ahu_id
    pub fn backfill_ahu_ids(&self, building_id: BuildingId, actor: &str) -> ApiResult<AhuBackfillOutcome> {
        if actor.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        let outcome = self.zone_repo.backfill_ahu_ids(building_id)?;
        for (zone_id, ahu_name) in &outcome.unresolved {
            tracing::warn!(zone_id, ahu_name = %ahu_name, "AHU 名称无法解析");
        }

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::AhuBackfill, actor)
                .with_target(&Section::Zones.to_string(), building_id)
                .with_payload(serde_json::json!({
                    "resolved": outcome.resolved,
                    "unresolved": outcome.unresolved,
                }))
                .with_detail(format!(
                    "回填AHU外键: 成功{}条, 未解析{}条",
                    outcome.resolved,
                    outcome.unresolved.len()
                )),
        )?;
        tracing::info!(building_id, resolved = outcome.resolved, "AHU 外键回填完成");

        Ok(outcome)
    }

    // ==========================================
    // 各 section 处理
    // ==========================================

    fn submit_xref(&self, data: &JsonValue, delete: bool, actor: &str) -> ApiResult<SubmissionOutcome> {
        let raw: RawXrefRow = parse_row(data)?;
        let mut required = Required::new();
        let room_id = required.take("room_id", raw.room_id);
        let zone_id = required.take("zone_id", raw.zone_id);
        required.finish()?;
        let (room_id, zone_id) = (room_id.unwrap_or_default(), zone_id.unwrap_or_default());

        let result = if delete {
            self.xref_api.unlink_zone(room_id, zone_id, actor)?
        } else {
            let already_linked = self
                .xref_api
                .list_room_xrefs(room_id)?
                .iter()
                .any(|x| x.zone_id == zone_id);
            let has_share = raw.xref_area.is_some() || raw.xref_population.is_some();
            match (already_linked, has_share) {
                (true, true) => self.xref_api.apply_manual_share(
                    room_id,
                    zone_id,
                    raw.xref_area,
                    raw.xref_population,
                    actor,
                )?,
                (false, true) => self.xref_api.link_zone_with_share(
                    room_id,
                    zone_id,
                    raw.xref_area,
                    raw.xref_population,
                    actor,
                )?,
                (false, false) => self.xref_api.link_zone(room_id, zone_id, actor)?,
                (true, false) => {
                    return Err(ApiError::ValidationError(
                        "行缺少必填数据: xref_area, xref_population".to_string(),
                    ))
                }
            }
        };

        Ok(SubmissionOutcome {
            section: Section::Xref,
            entity_id: format!("{}:{}", room_id, zone_id),
            deleted: delete,
            xref: Some(result),
        })
    }

    fn submit_room(&self, data: &JsonValue, delete: bool, actor: &str) -> ApiResult<SubmissionOutcome> {
        let raw: RawRoomRow = parse_row(data)?;

        if delete {
            let mut required = Required::new();
            let room_id = required.take("room_id", raw.room_id);
            required.finish()?;
            return self.finish_delete(Section::Rooms, room_id.unwrap_or_default(), actor, |id| {
                self.room_repo.delete(id)
            });
        }

        let mut required = Required::new();
        let room_id = required.take("room_id", raw.room_id);
        let facility_id = required.text("facility_id", raw.facility_id);
        let floor_id = required.take("floor_id", raw.floor_id);
        let area = required.take("area", raw.area);
        required.finish()?;

        let room = Room {
            id: room_id.unwrap_or_default(),
            facility_id: facility_id.unwrap_or_default(),
            floor_id: floor_id.unwrap_or_default(),
            area: area.unwrap_or_default(),
            population: raw.population.unwrap_or(0.0),
            uncertainty_amount: raw.uncertainty_amount.unwrap_or(0.0),
            occupancy_category_id: raw.occupancy_category_id,
            reservable: raw.reservable.unwrap_or(false),
            active: raw.active.unwrap_or(true),
        };
        validate_room(&room)?;

        self.room_repo.upsert(&room)?;
        self.log_upsert(Section::Rooms, room.id, serde_json::to_value(&room).ok(), actor)?;

        Ok(SubmissionOutcome {
            section: Section::Rooms,
            entity_id: room.id.to_string(),
            deleted: false,
            xref: None,
        })
    }

    fn submit_zone(&self, data: &JsonValue, delete: bool, actor: &str) -> ApiResult<SubmissionOutcome> {
        let raw: RawZoneRow = parse_row(data)?;

        if delete {
            let mut required = Required::new();
            let zone_id = required.take("zone_id", raw.zone_id);
            required.finish()?;
            return self.finish_delete(Section::Zones, zone_id.unwrap_or_default(), actor, |id| {
                self.zone_repo.delete(id)
            });
        }

        let mut required = Required::new();
        let zone_id = required.take("zone_id", raw.zone_id);
        let name = required.text("name", raw.name);
        let code = required.text("code", raw.code);
        let building_id = required.take("building_id", raw.building_id);
        required.finish()?;

        let building_id = building_id.unwrap_or_default();
        let ahu_name = raw
            .ahu_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // 新提交只给了名称时, 就地解析为外键
        let ahu_id = match (raw.ahu_id, ahu_name.as_deref()) {
            (Some(id), _) => Some(id),
            (None, Some(name)) => self
                .ahu_repo
                .resolve_by_name(building_id, name)?
                .map(|ahu| ahu.id),
            (None, None) => None,
        };

        let zone = Zone {
            id: zone_id.unwrap_or_default(),
            name: name.unwrap_or_default(),
            code: code.unwrap_or_default(),
            building_id,
            ahu_name,
            ahu_id,
            occupancy_sensor_present: raw.occupancy_sensor_present.unwrap_or(false),
            active: raw.active.unwrap_or(true),
        };

        self.zone_repo.upsert(&zone)?;
        self.log_upsert(Section::Zones, zone.id, serde_json::to_value(&zone).ok(), actor)?;

        Ok(SubmissionOutcome {
            section: Section::Zones,
            entity_id: zone.id.to_string(),
            deleted: false,
            xref: None,
        })
    }

    fn submit_ahu(&self, data: &JsonValue, delete: bool, actor: &str) -> ApiResult<SubmissionOutcome> {
        let raw: RawAhuRow = parse_row(data)?;

        if delete {
            let mut required = Required::new();
            let ahu_id = required.take("ahu_id", raw.ahu_id);
            required.finish()?;
            return self.finish_delete(Section::Ahus, ahu_id.unwrap_or_default(), actor, |id| {
                self.ahu_repo.delete(id)
            });
        }

        let mut required = Required::new();
        let ahu_id = required.take("ahu_id", raw.ahu_id);
        let building_id = required.take("building_id", raw.building_id);
        let name = required.text("name", raw.name);
        required.finish()?;

        let ahu = Ahu {
            id: ahu_id.unwrap_or_default(),
            building_id: building_id.unwrap_or_default(),
            name: name.unwrap_or_default(),
            active: raw.active.unwrap_or(true),
        };

        self.ahu_repo.upsert(&ahu)?;
        self.log_upsert(Section::Ahus, ahu.id, serde_json::to_value(&ahu).ok(), actor)?;

        Ok(SubmissionOutcome {
            section: Section::Ahus,
            entity_id: ahu.id.to_string(),
            deleted: false,
            xref: None,
        })
    }

    fn submit_category(&self, data: &JsonValue, delete: bool, actor: &str) -> ApiResult<SubmissionOutcome> {
        let raw: RawCategoryRow = parse_row(data)?;

        if delete {
            let mut required = Required::new();
            let category_id = required.take("category_id", raw.category_id);
            required.finish()?;
            return self.finish_delete(
                Section::OccupancyCategories,
                category_id.unwrap_or_default(),
                actor,
                |id| self.occupancy_repo.delete(id),
            );
        }

        let mut required = Required::new();
        let category_id = required.take("category_id", raw.category_id);
        let name = required.text("category", raw.category);
        let people_rate = required.take("people_outdoor_air_rate", raw.people_outdoor_air_rate);
        let area_rate = required.take("area_outdoor_air_rate", raw.area_outdoor_air_rate);
        required.finish()?;

        let category = OccupancyCategory {
            id: category_id.unwrap_or_default(),
            category: name.unwrap_or_default(),
            people_outdoor_air_rate: ensure_non_negative(
                "people_outdoor_air_rate",
                people_rate.unwrap_or_default(),
            )?,
            area_outdoor_air_rate: ensure_non_negative(
                "area_outdoor_air_rate",
                area_rate.unwrap_or_default(),
            )?,
            occupant_density: ensure_non_negative(
                "occupant_density",
                raw.occupant_density.unwrap_or(0.0),
            )?,
            standby_allowed: raw.standby_allowed.unwrap_or(false),
            type_group: raw.type_group,
        };

        self.occupancy_repo.upsert(&category)?;
        self.log_upsert(
            Section::OccupancyCategories,
            category.id,
            serde_json::to_value(&category).ok(),
            actor,
        )?;

        Ok(SubmissionOutcome {
            section: Section::OccupancyCategories,
            entity_id: category.id.to_string(),
            deleted: false,
            xref: None,
        })
    }

    // ==========================================
    // 内部
    // ==========================================

    fn finish_delete<F>(&self, section: Section, id: i64, actor: &str, delete: F) -> ApiResult<SubmissionOutcome>
    where
        F: FnOnce(i64) -> crate::repository::error::RepositoryResult<usize>,
    {
        let rows = delete(id)?;
        if rows == 0 {
            return Err(ApiError::NotFound(format!("{}(id={})不存在", section, id)));
        }

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::Delete, actor)
                .with_target(&section.to_string(), id)
                .with_detail(format!("删除{}: {}", section, id)),
        )?;
        tracing::info!(section = %section, id, actor, "参考数据已删除");

        Ok(SubmissionOutcome {
            section,
            entity_id: id.to_string(),
            deleted: true,
            xref: None,
        })
    }

    fn log_upsert(&self, section: Section, id: i64, payload: Option<JsonValue>, actor: &str) -> ApiResult<()> {
        let mut log = ActionLog::new(ActionType::Upsert, actor)
            .with_target(&section.to_string(), id)
            .with_detail(format!("保存{}: {}", section, id));
        if let Some(payload) = payload {
            log = log.with_payload(payload);
        }
        self.action_log_repo.insert(&log)?;
        tracing::info!(section = %section, id, actor, "参考数据已保存");
        Ok(())
    }
}

fn parse_row<T: for<'de> Deserialize<'de>>(data: &JsonValue) -> ApiResult<T> {
    serde_json::from_value(data.clone())
        .map_err(|e| ApiError::InvalidInput(format!("提交数据格式错误: {}", e)))
}
