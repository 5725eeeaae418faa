// ==========================================
// 设施新风量引擎 - 房间/分区分配 API
// ==========================================
// 职责: 分区份额的均分、人工编辑、关联增删与一致性检查
// 红线: 均分会覆盖人工分配, 未经确认直接拒绝
// 红线: 所有写入记录 ActionLog; 数据质量告警只回传不阻断
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{config_error, ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::room::Room;
use crate::domain::types::{BuildingId, RoomId, Section, ZoneId};
use crate::domain::xref::RoomZoneXref;
use crate::engine::allocator::RoomZoneAllocator;
use crate::engine::consistency::{ConsistencyChecker, RoomGroupCheck};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::room_repo::RoomRepository;
use crate::repository::xref_repo::XrefRepository;
use crate::repository::zone_repo::ZoneRepository;

/// 写入结果: 落库后的分配 + 房间一致性检查
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrefWriteResult {
    pub room_id: RoomId,
    pub xrefs: Vec<RoomZoneXref>,
    pub check: RoomGroupCheck,
}

/// 建筑内全部房间的一致性检查
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingConsistencyReport {
    pub building_id: BuildingId,
    pub room_checks: Vec<RoomGroupCheck>,
    pub unbalanced_room_ids: Vec<RoomId>,
}

// ==========================================
// XrefApi - 房间/分区分配 API
// ==========================================
pub struct XrefApi {
    room_repo: Arc<RoomRepository>,
    zone_repo: Arc<ZoneRepository>,
    xref_repo: Arc<XrefRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    allocator: RoomZoneAllocator,
}

impl XrefApi {
    pub fn new(
        room_repo: Arc<RoomRepository>,
        zone_repo: Arc<ZoneRepository>,
        xref_repo: Arc<XrefRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            room_repo,
            zone_repo,
            xref_repo,
            action_log_repo,
            config_manager,
            allocator: RoomZoneAllocator::new(),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn list_room_xrefs(&self, room_id: RoomId) -> ApiResult<Vec<RoomZoneXref>> {
        self.room_repo.get(room_id)?;
        Ok(self.xref_repo.find_by_room(room_id)?)
    }

    pub fn check_room(&self, room_id: RoomId) -> ApiResult<RoomGroupCheck> {
        let room = self.room_repo.get(room_id)?;
        let xrefs = self.xref_repo.find_by_room(room_id)?;
        Ok(self.checker()?.check_room_group(&room, &xrefs))
    }

    pub fn check_building(&self, building_id: BuildingId) -> ApiResult<BuildingConsistencyReport> {
        let checker = self.checker()?;
        let rooms = self.room_repo.find_by_building(building_id)?;
        let xrefs = self.xref_repo.find_by_building(building_id)?;

        let room_checks: Vec<RoomGroupCheck> = rooms
            .iter()
            .map(|room| checker.check_room_group(room, &xrefs))
            .collect();
        let unbalanced_room_ids: Vec<RoomId> = room_checks
            .iter()
            .filter(|c| !c.is_balanced())
            .map(|c| c.room_id)
            .collect();

        if !unbalanced_room_ids.is_empty() {
            tracing::warn!(
                building_id,
                unbalanced = unbalanced_room_ids.len(),
                "建筑内存在分区分配不平衡的房间"
            );
        }

        Ok(BuildingConsistencyReport {
            building_id,
            room_checks,
            unbalanced_room_ids,
        })
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 均分房间到已关联的全部分区 (autoCalculate)
    ///
    /// 会覆盖该房间所有人工分配, `confirmed` 为 false 时返回 ConfirmationRequired
    pub fn auto_calculate(
        &self,
        room_id: RoomId,
        confirmed: bool,
        actor: &str,
    ) -> ApiResult<XrefWriteResult> {
        validate_actor(actor)?;
        if !self
            .config_manager
            .is_auto_calculate_enabled()
            .map_err(config_error)?
        {
            return Err(ApiError::FeatureDisabled("均分重置已关闭".to_string()));
        }

        let room = self.room_repo.get(room_id)?;
        let existing = self.xref_repo.find_by_room(room_id)?;
        if existing.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "房间{}未关联任何分区, 无法均分",
                room.facility_id
            )));
        }

        if !confirmed {
            return Err(ApiError::ConfirmationRequired(format!(
                "均分将覆盖房间{}在{}个分区上的人工分配",
                room.facility_id,
                existing.len()
            )));
        }

        let zone_ids: Vec<ZoneId> = existing.iter().map(|x| x.zone_id).collect();
        let xrefs = self.allocator.allocate_equal_shares(&room, &zone_ids)?;
        for xref in &xrefs {
            self.allocator.validate_for_persistence(xref)?;
        }

        self.xref_repo.replace_for_room(room_id, &xrefs)?;

        self.log_action(
            ActionLog::new(ActionType::AutoCalculate, actor)
                .with_target(&Section::Xref.to_string(), room_id)
                .with_payload(serde_json::json!({
                    "facility_id": room.facility_id,
                    "zone_ids": zone_ids,
                    "previous": existing,
                }))
                .with_detail(format!("均分房间{}到{}个分区", room.facility_id, zone_ids.len())),
        )?;
        tracing::info!(room_id, zones = zone_ids.len(), actor, "房间分区份额已均分");

        self.finish_write(&room, xrefs)
    }

    /// 人工修改某个分区的面积/人数份额
    ///
    /// 人数变化时 pr_percent 随之重算; 房间设计人数为 0 时返回 DivisionByZero 且不落库
    pub fn apply_manual_share(
        &self,
        room_id: RoomId,
        zone_id: ZoneId,
        new_area: Option<f64>,
        new_population: Option<f64>,
        actor: &str,
    ) -> ApiResult<XrefWriteResult> {
        validate_actor(actor)?;
        if new_area.is_none() && new_population.is_none() {
            return Err(ApiError::InvalidInput("面积与人数至少修改一项".to_string()));
        }
        if !self
            .config_manager
            .is_manual_edit_enabled()
            .map_err(config_error)?
        {
            return Err(ApiError::FeatureDisabled("分区份额人工编辑已关闭".to_string()));
        }

        let room = self.room_repo.get(room_id)?;
        let current = self.xref_repo.find(room_id, zone_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("房间{}与分区{}的关联不存在", room_id, zone_id))
        })?;

        let updated = self
            .allocator
            .apply_manual_share(&room, &current, new_area, new_population)?;
        self.allocator.validate_for_persistence(&updated)?;

        self.xref_repo.upsert(&updated)?;

        self.log_action(
            ActionLog::new(ActionType::ManualShare, actor)
                .with_target(&Section::Xref.to_string(), format!("{}:{}", room_id, zone_id))
                .with_payload(serde_json::json!({
                    "before": current,
                    "after": updated,
                }))
                .with_detail(format!("人工修改房间{}在分区{}的份额", room.facility_id, zone_id)),
        )?;
        tracing::info!(room_id, zone_id, actor, "分区份额已人工修改");

        let xrefs = self.xref_repo.find_by_room(room_id)?;
        self.finish_write(&room, xrefs)
    }

    /// 新增房间-分区关联, 份额初始化为 0 (随后由均分或人工编辑补齐)
    pub fn link_zone(&self, room_id: RoomId, zone_id: ZoneId, actor: &str) -> ApiResult<XrefWriteResult> {
        validate_actor(actor)?;

        let room = self.ensure_linkable(room_id, zone_id)?;
        let xref = RoomZoneXref::zeroed(room_id, zone_id);
        self.allocator.validate_for_persistence(&xref)?;
        self.xref_repo.upsert(&xref)?;

        self.log_link(&room, zone_id, actor)?;

        let xrefs = self.xref_repo.find_by_room(room_id)?;
        self.finish_write(&room, xrefs)
    }

    /// 新增关联并同时写入人工份额
    ///
    /// 份额先在内存中计算并校验, 通过后才落库; 任一校验失败时关联与日志都不写入
    pub fn link_zone_with_share(
        &self,
        room_id: RoomId,
        zone_id: ZoneId,
        new_area: Option<f64>,
        new_population: Option<f64>,
        actor: &str,
    ) -> ApiResult<XrefWriteResult> {
        validate_actor(actor)?;
        if new_area.is_none() && new_population.is_none() {
            return Err(ApiError::InvalidInput("面积与人数至少修改一项".to_string()));
        }
        if !self
            .config_manager
            .is_manual_edit_enabled()
            .map_err(config_error)?
        {
            return Err(ApiError::FeatureDisabled("分区份额人工编辑已关闭".to_string()));
        }

        let room = self.ensure_linkable(room_id, zone_id)?;
        let linked = RoomZoneXref::zeroed(room_id, zone_id);
        let updated = self
            .allocator
            .apply_manual_share(&room, &linked, new_area, new_population)?;
        self.allocator.validate_for_persistence(&updated)?;

        self.xref_repo.upsert(&updated)?;

        self.log_link(&room, zone_id, actor)?;
        self.log_action(
            ActionLog::new(ActionType::ManualShare, actor)
                .with_target(&Section::Xref.to_string(), format!("{}:{}", room_id, zone_id))
                .with_payload(serde_json::json!({
                    "before": linked,
                    "after": updated,
                }))
                .with_detail(format!("人工修改房间{}在分区{}的份额", room.facility_id, zone_id)),
        )?;
        tracing::info!(room_id, zone_id, actor, "新关联分区并写入人工份额");

        let xrefs = self.xref_repo.find_by_room(room_id)?;
        self.finish_write(&room, xrefs)
    }

    /// 删除房间-分区关联 (其余分区份额不自动调整)
    pub fn unlink_zone(&self, room_id: RoomId, zone_id: ZoneId, actor: &str) -> ApiResult<XrefWriteResult> {
        validate_actor(actor)?;

        let room = self.room_repo.get(room_id)?;
        let previous = self.xref_repo.find(room_id, zone_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("房间{}与分区{}的关联不存在", room_id, zone_id))
        })?;
        self.xref_repo.delete(room_id, zone_id)?;

        self.log_action(
            ActionLog::new(ActionType::UnlinkZone, actor)
                .with_target(&Section::Xref.to_string(), format!("{}:{}", room_id, zone_id))
                .with_payload(serde_json::json!({ "previous": previous }))
                .with_detail(format!("房间{}解除分区{}", room.facility_id, zone_id)),
        )?;

        let xrefs = self.xref_repo.find_by_room(room_id)?;
        self.finish_write(&room, xrefs)
    }

    // ==========================================
    // 内部
    // ==========================================

    /// 房间与分区存在且尚未关联
    fn ensure_linkable(&self, room_id: RoomId, zone_id: ZoneId) -> ApiResult<Room> {
        let room = self.room_repo.get(room_id)?;
        self.zone_repo
            .find_by_id(zone_id)?
            .ok_or_else(|| ApiError::NotFound(format!("分区(id={})不存在", zone_id)))?;
        if self.xref_repo.find(room_id, zone_id)?.is_some() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "房间{}已关联分区{}",
                room.facility_id, zone_id
            )));
        }
        Ok(room)
    }

    fn log_link(&self, room: &Room, zone_id: ZoneId, actor: &str) -> ApiResult<()> {
        self.log_action(
            ActionLog::new(ActionType::LinkZone, actor)
                .with_target(&Section::Xref.to_string(), format!("{}:{}", room.id, zone_id))
                .with_detail(format!("房间{}关联分区{}", room.facility_id, zone_id)),
        )
    }

    fn checker(&self) -> ApiResult<ConsistencyChecker> {
        let config = self.config_manager.consistency_config().map_err(config_error)?;
        Ok(ConsistencyChecker::new(config))
    }

    fn finish_write(&self, room: &Room, xrefs: Vec<RoomZoneXref>) -> ApiResult<XrefWriteResult> {
        let check = self.checker()?.check_room_group(room, &xrefs);
        if !check.is_balanced() {
            for warning in &check.warnings {
                tracing::warn!(room_id = room.id, %warning, "分区分配数据质量告警");
            }
        }
        Ok(XrefWriteResult {
            room_id: room.id,
            xrefs,
            check,
        })
    }

    fn log_action(&self, log: ActionLog) -> ApiResult<()> {
        self.action_log_repo.insert(&log)?;
        Ok(())
    }
}

fn validate_actor(actor: &str) -> ApiResult<()> {
    if actor.trim().is_empty() {
        return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
    }
    Ok(())
}
