// ==========================================
// 设施新风量引擎 - 房间/分区分配引擎
// ==========================================
// 职责: 房间面积、设计人数、人数占比在分区间的分配
// 输入: 房间 + 服务该房间的分区列表 / 单条交叉引用
// 输出: RoomZoneXref (由调用方落库)
// 红线: 均分 (autoCalculate) 会覆盖人工分配, 必须经用户确认后调用
// ==========================================

use std::collections::HashSet;

use crate::domain::room::Room;
use crate::domain::types::ZoneId;
use crate::domain::xref::RoomZoneXref;
use crate::engine::error::{ensure_non_negative, EngineError, EngineResult};

/// 分母判零阈值
const ZERO_EPSILON: f64 = 1e-12;

// ==========================================
// RoomZoneAllocator - 房间/分区分配引擎
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct RoomZoneAllocator {
    // 无状态引擎
}

impl RoomZoneAllocator {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 均分房间到各分区 (autoCalculate)
    ///
    /// 每个分区得到:
    /// - xref_area = area / n
    /// - xref_population = (population + uncertainty_amount) / n
    /// - pr_percent = 1 / n
    ///
    /// # 错误
    /// - InvalidInput: 房间数据不合法或分区列表为空
    /// - ValidationError: 分区列表含重复ID
    #[tracing::instrument(skip(self, room), fields(room_id = room.id, zone_count = zone_ids.len()))]
    pub fn allocate_equal_shares(
        &self,
        room: &Room,
        zone_ids: &[ZoneId],
    ) -> EngineResult<Vec<RoomZoneXref>> {
        validate_room(room)?;

        if zone_ids.is_empty() {
            return Err(EngineError::invalid("zone_ids", "至少需要一个分区"));
        }

        let mut seen = HashSet::new();
        for zone_id in zone_ids {
            if !seen.insert(*zone_id) {
                return Err(EngineError::ValidationError(format!(
                    "房间{}的分区列表重复: zone_id={}",
                    room.id, zone_id
                )));
            }
        }

        let n = zone_ids.len() as f64;
        let area_share = room.area / n;
        let population_share = room.design_population() / n;
        let pr_percent = 1.0 / n;

        Ok(zone_ids
            .iter()
            .map(|zone_id| RoomZoneXref {
                room_id: room.id,
                zone_id: *zone_id,
                xref_area: Some(area_share),
                xref_population: Some(population_share),
                pr_percent: Some(pr_percent),
            })
            .collect())
    }

    /// 人工修改单个分区的份额
    ///
    /// 人数变化时按提交时的人数比例重算:
    /// pr_percent = xref_population / (population + uncertainty_amount)
    /// pr_percent 不可单独编辑
    ///
    /// # 错误
    /// - ValidationError: xref 不属于该房间
    /// - InvalidInput: 新值为负数或非数值
    /// - DivisionByZero: 房间设计人数为 0 (此时不得落库)
    pub fn apply_manual_share(
        &self,
        room: &Room,
        xref: &RoomZoneXref,
        new_area: Option<f64>,
        new_population: Option<f64>,
    ) -> EngineResult<RoomZoneXref> {
        if xref.room_id != room.id {
            return Err(EngineError::ValidationError(format!(
                "交叉引用属于房间{}, 与房间{}不匹配",
                xref.room_id, room.id
            )));
        }

        let mut updated = xref.clone();

        if let Some(area) = new_area {
            updated.xref_area = Some(ensure_non_negative("xref_area", area)?);
        }

        if let Some(population) = new_population {
            let population = ensure_non_negative("xref_population", population)?;
            updated.pr_percent = Some(proportion_of(room, population)?);
            updated.xref_population = Some(population);
        }

        Ok(updated)
    }

    /// 持久化前校验必填字段 (room_id, zone_id, 人数份额)
    ///
    /// # 错误
    /// - ValidationError: 行缺少必填数据
    /// - InvalidInput: 已填数值为负数或非数值
    pub fn validate_for_persistence(&self, xref: &RoomZoneXref) -> EngineResult<()> {
        let mut missing = Vec::new();
        if xref.room_id <= 0 {
            missing.push("room_id");
        }
        if xref.zone_id <= 0 {
            missing.push("zone_id");
        }
        if xref.xref_population.is_none() {
            missing.push("xref_population");
        }
        if !missing.is_empty() {
            return Err(EngineError::ValidationError(format!(
                "行缺少必填数据: {}",
                missing.join(", ")
            )));
        }

        if let Some(area) = xref.xref_area {
            ensure_non_negative("xref_area", area)?;
        }
        if let Some(population) = xref.xref_population {
            ensure_non_negative("xref_population", population)?;
        }
        if let Some(pr) = xref.pr_percent {
            ensure_non_negative("pr_percent", pr)?;
        }
        Ok(())
    }
}

/// 人数占比 = 分区人数 / 房间设计人数
fn proportion_of(room: &Room, population: f64) -> EngineResult<f64> {
    let denominator = room.design_population();
    if !denominator.is_finite() || denominator.abs() < ZERO_EPSILON {
        return Err(EngineError::DivisionByZero { room_id: room.id });
    }
    Ok(population / denominator)
}

/// 校验房间不变量: area > 0, population >= 0, uncertainty_amount >= 0
pub fn validate_room(room: &Room) -> EngineResult<()> {
    if !room.area.is_finite() || room.area <= 0.0 {
        return Err(EngineError::invalid(
            "area",
            format!("房间{}面积必须大于0: {}", room.id, room.area),
        ));
    }
    ensure_non_negative("population", room.population)?;
    ensure_non_negative("uncertainty_amount", room.uncertainty_amount)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_room(area: f64, population: f64, uncertainty: f64) -> Room {
        Room {
            id: 7,
            facility_id: "ENG-101".to_string(),
            floor_id: 1,
            area,
            population,
            uncertainty_amount: uncertainty,
            occupancy_category_id: Some(1),
            reservable: true,
            active: true,
        }
    }

    #[test]
    fn test_example_two_zones() {
        let allocator = RoomZoneAllocator::new();
        let room = create_test_room(1000.0, 40.0, 5.0);

        let xrefs = allocator.allocate_equal_shares(&room, &[11, 12]).unwrap();

        assert_eq!(xrefs.len(), 2);
        for xref in &xrefs {
            assert_eq!(xref.room_id, 7);
            assert_eq!(xref.xref_area, Some(500.0));
            assert_eq!(xref.xref_population, Some(22.5));
            assert_eq!(xref.pr_percent, Some(0.5));
        }
        assert_eq!(xrefs[0].zone_id, 11);
        assert_eq!(xrefs[1].zone_id, 12);
    }

    #[test]
    fn test_equal_split_sums_match_room() {
        let allocator = RoomZoneAllocator::new();
        let room = create_test_room(1234.5, 37.0, 3.0);

        for n in 1..=9 {
            let zone_ids: Vec<ZoneId> = (1..=n).collect();
            let xrefs = allocator.allocate_equal_shares(&room, &zone_ids).unwrap();

            let area: f64 = xrefs.iter().filter_map(|x| x.xref_area).sum();
            let population: f64 = xrefs.iter().filter_map(|x| x.xref_population).sum();
            let pr: f64 = xrefs.iter().filter_map(|x| x.pr_percent).sum();

            assert_eq!(xrefs.len(), n as usize);
            assert!((area - 1234.5).abs() < 1e-9, "n={} area={}", n, area);
            assert!((population - 40.0).abs() < 1e-9, "n={} population={}", n, population);
            assert!((pr - 1.0).abs() < 1e-9, "n={} pr={}", n, pr);
        }
    }

    #[test]
    fn test_allocate_rejects_empty_and_duplicate_zones() {
        let allocator = RoomZoneAllocator::new();
        let room = create_test_room(100.0, 10.0, 0.0);

        assert!(matches!(
            allocator.allocate_equal_shares(&room, &[]),
            Err(EngineError::InvalidInput { .. })
        ));
        assert!(matches!(
            allocator.allocate_equal_shares(&room, &[3, 3]),
            Err(EngineError::ValidationError(_))
        ));
    }

    #[test]
    fn test_allocate_rejects_invalid_room() {
        let allocator = RoomZoneAllocator::new();

        let zero_area = create_test_room(0.0, 10.0, 0.0);
        assert!(matches!(
            allocator.allocate_equal_shares(&zero_area, &[1]),
            Err(EngineError::InvalidInput { ref field, .. }) if field == "area"
        ));

        let negative_population = create_test_room(100.0, -1.0, 0.0);
        assert!(matches!(
            allocator.allocate_equal_shares(&negative_population, &[1]),
            Err(EngineError::InvalidInput { ref field, .. }) if field == "population"
        ));
    }

    #[test]
    fn test_manual_share_recomputes_proportion() {
        let allocator = RoomZoneAllocator::new();
        let room = create_test_room(1000.0, 40.0, 5.0);
        let xref = allocator.allocate_equal_shares(&room, &[1, 2]).unwrap()[0].clone();

        let updated = allocator
            .apply_manual_share(&room, &xref, None, Some(30.0))
            .unwrap();

        assert_eq!(updated.xref_population, Some(30.0));
        assert!((updated.pr_percent.unwrap() - 30.0 / 45.0).abs() < 1e-12);
        // 面积未改动
        assert_eq!(updated.xref_area, Some(500.0));
    }

    #[test]
    fn test_manual_area_only_keeps_proportion() {
        let allocator = RoomZoneAllocator::new();
        let room = create_test_room(1000.0, 40.0, 5.0);
        let xref = allocator.allocate_equal_shares(&room, &[1, 2]).unwrap()[0].clone();

        let updated = allocator
            .apply_manual_share(&room, &xref, Some(700.0), None)
            .unwrap();

        assert_eq!(updated.xref_area, Some(700.0));
        assert_eq!(updated.pr_percent, Some(0.5));
    }

    #[test]
    fn test_manual_share_division_by_zero() {
        let allocator = RoomZoneAllocator::new();
        let room = create_test_room(200.0, 0.0, 0.0);
        let xref = RoomZoneXref::unallocated(room.id, 3);

        let err = allocator
            .apply_manual_share(&room, &xref, None, Some(0.0))
            .unwrap_err();
        assert_eq!(err, EngineError::DivisionByZero { room_id: 7 });
    }

    #[test]
    fn test_manual_share_rejects_foreign_xref_and_negative() {
        let allocator = RoomZoneAllocator::new();
        let room = create_test_room(200.0, 10.0, 0.0);

        let foreign = RoomZoneXref::unallocated(99, 3);
        assert!(matches!(
            allocator.apply_manual_share(&room, &foreign, Some(1.0), None),
            Err(EngineError::ValidationError(_))
        ));

        let own = RoomZoneXref::unallocated(room.id, 3);
        assert!(matches!(
            allocator.apply_manual_share(&room, &own, Some(-5.0), None),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_validate_for_persistence() {
        let allocator = RoomZoneAllocator::new();

        let missing = RoomZoneXref::unallocated(1, 2);
        let err = allocator.validate_for_persistence(&missing).unwrap_err();
        assert!(err.to_string().contains("xref_population"));

        let mut ok = RoomZoneXref::unallocated(1, 2);
        ok.xref_population = Some(4.0);
        assert!(allocator.validate_for_persistence(&ok).is_ok());

        let no_zone = RoomZoneXref {
            zone_id: 0,
            ..ok.clone()
        };
        assert!(matches!(
            allocator.validate_for_persistence(&no_zone),
            Err(EngineError::ValidationError(_))
        ));
    }
}
