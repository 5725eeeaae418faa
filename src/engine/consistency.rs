// ==========================================
// 设施新风量引擎 - 一致性检查
// ==========================================
// 职责: 标记分区分配合计与房间口径不一致的情况
// 输入: 房间 + 交叉引用 / 分区 + 成员房间
// 输出: 检查结果 + 数据质量告警 (仅用于标色, 不阻断写入)
// ==========================================

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::occupancy::OccupancyCategory;
use crate::domain::room::Room;
use crate::domain::types::{AhuId, RoomId, ZoneId};
use crate::domain::warning::DataQualityWarning;
use crate::domain::xref::RoomZoneXref;
use crate::domain::zone::Zone;
use crate::engine::outdoor_air::OutdoorAirCalculator;

// ==========================================
// ConsistencyConfig - 容差配置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    pub proportion_low: f64,  // Σ pr_percent 下限 (含)
    pub proportion_high: f64, // Σ pr_percent 上限 (含)
    pub decimals: u32,        // 比较前的舍入位数
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            proportion_low: 0.99,
            proportion_high: 1.0,
            decimals: 2,
        }
    }
}

impl ConsistencyConfig {
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.decimals as i32);
        (value * factor).round() / factor
    }

    fn same(&self, a: f64, b: f64) -> bool {
        (self.round(a) - self.round(b)).abs() < 1e-9
    }
}

// ==========================================
// RoomGroupCheck - 房间分组检查结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomGroupCheck {
    pub room_id: RoomId,
    pub area_ok: bool,
    pub population_ok: bool,
    pub proportion_ok: bool,
    pub area_sum: f64,
    pub population_sum: f64,
    pub proportion_sum: Option<f64>, // 任一 pr_percent 为空时为 None
    pub zone_count: usize,
    pub warnings: Vec<DataQualityWarning>,
}

impl RoomGroupCheck {
    pub fn is_balanced(&self) -> bool {
        self.area_ok && self.population_ok && self.proportion_ok
    }
}

// ==========================================
// ZoneGroupCheck - 分区分组检查结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneGroupCheck {
    pub zone_id: ZoneId,
    pub ahu_id: Option<AhuId>,
    pub ahu_name: Option<String>,
    pub room_count: usize,
    pub population_sum: f64,
    pub area_sum: f64,
    pub people_outdoor_air_rate_sum: f64,
    pub people_outdoor_air: f64,
    pub area_outdoor_air: f64,
    pub total_outdoor_air: f64,
    pub unbalanced_room_ids: Vec<RoomId>,
    pub warnings: Vec<DataQualityWarning>,
}

impl ZoneGroupCheck {
    pub fn is_balanced(&self) -> bool {
        self.unbalanced_room_ids.is_empty()
    }
}

// ==========================================
// AhuAirflowSummary - AHU 汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AhuAirflowSummary {
    pub ahu_id: Option<AhuId>,
    pub ahu_name: Option<String>,
    pub zone_ids: Vec<ZoneId>,
    pub population_sum: f64,
    pub area_sum: f64,
    pub total_outdoor_air: f64,
    pub unbalanced_zone_count: usize,
}

// ==========================================
// ConsistencyChecker - 一致性检查器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsistencyChecker {
    config: ConsistencyConfig,
    calculator: OutdoorAirCalculator,
}

impl ConsistencyChecker {
    pub fn new(config: ConsistencyConfig) -> Self {
        Self {
            config,
            calculator: OutdoorAirCalculator::new(),
        }
    }

    pub fn config(&self) -> &ConsistencyConfig {
        &self.config
    }

    /// 检查单个房间的分区分配
    ///
    /// - area_ok: round(Σ xref_area) == round(area)
    /// - population_ok: round(Σ xref_population) == round(population + uncertainty_amount)
    /// - proportion_ok: low <= round(Σ pr_percent) <= high, 任一为空即失败
    ///
    /// 不属于该房间的交叉引用会被忽略
    pub fn check_room_group(&self, room: &Room, xrefs: &[RoomZoneXref]) -> RoomGroupCheck {
        let mut warnings = Vec::new();
        let own: Vec<&RoomZoneXref> = xrefs.iter().filter(|x| x.room_id == room.id).collect();

        if own.is_empty() {
            warnings.push(DataQualityWarning::NoZoneAssignment { room_id: room.id });
        }

        let mut area_sum = 0.0;
        let mut population_sum = 0.0;
        let mut proportion_sum = Some(0.0);

        for xref in &own {
            let xref_id = format!("{}:{}", xref.room_id, xref.zone_id);
            match xref.xref_area {
                Some(v) => area_sum += v,
                None => warnings.push(DataQualityWarning::missing_value("room_zone_xref", &xref_id, "xref_area")),
            }
            match xref.xref_population {
                Some(v) => population_sum += v,
                None => warnings.push(DataQualityWarning::missing_value(
                    "room_zone_xref",
                    &xref_id,
                    "xref_population",
                )),
            }
            proportion_sum = match (proportion_sum, xref.pr_percent) {
                (Some(acc), Some(v)) => Some(acc + v),
                _ => None,
            };
        }
        if own.is_empty() {
            proportion_sum = None;
        }

        let area_ok = self.config.same(area_sum, room.area);
        let population_ok = self.config.same(population_sum, room.design_population());
        let proportion_ok = proportion_sum
            .map(|sum| {
                let rounded = self.config.round(sum);
                rounded >= self.config.proportion_low - 1e-9
                    && rounded <= self.config.proportion_high + 1e-9
            })
            .unwrap_or(false);

        if !area_ok {
            warnings.push(DataQualityWarning::ReconciliationMismatch {
                room_id: room.id,
                field: "xref_area".to_string(),
                expected: room.area,
                actual: Some(area_sum),
            });
        }
        if !population_ok {
            warnings.push(DataQualityWarning::ReconciliationMismatch {
                room_id: room.id,
                field: "xref_population".to_string(),
                expected: room.design_population(),
                actual: Some(population_sum),
            });
        }
        if !proportion_ok {
            warnings.push(DataQualityWarning::ReconciliationMismatch {
                room_id: room.id,
                field: "pr_percent".to_string(),
                expected: 1.0,
                actual: proportion_sum,
            });
        }

        RoomGroupCheck {
            room_id: room.id,
            area_ok,
            population_ok,
            proportion_ok,
            area_sum,
            population_sum,
            proportion_sum,
            zone_count: own.len(),
            warnings,
        }
    }

    /// 检查分区: 汇总成员房间的人数/面积份额与新风量,
    /// 并列出自身分配不平衡的成员房间
    ///
    /// # 参数
    /// - `zone`: 分区
    /// - `rooms`: 候选房间 (按 ID 查找)
    /// - `xrefs`: 交叉引用 (至少包含该分区成员房间的全部分区分配)
    /// - `categories`: 房间ID -> 人员类别
    pub fn check_zone_group(
        &self,
        zone: &Zone,
        rooms: &[Room],
        xrefs: &[RoomZoneXref],
        categories: &HashMap<RoomId, OccupancyCategory>,
    ) -> ZoneGroupCheck {
        let rooms_by_id: HashMap<RoomId, &Room> = rooms.iter().map(|r| (r.id, r)).collect();
        let mut warnings = Vec::new();

        let mut population_sum = 0.0;
        let mut area_sum = 0.0;
        let mut people_outdoor_air_rate_sum = 0.0;
        let mut people_outdoor_air = 0.0;
        let mut area_outdoor_air = 0.0;
        let mut unbalanced_room_ids = Vec::new();
        let mut room_count = 0;

        for xref in xrefs.iter().filter(|x| x.zone_id == zone.id) {
            let room = match rooms_by_id.get(&xref.room_id) {
                Some(r) => *r,
                None => {
                    warnings.push(DataQualityWarning::missing_value(
                        "room",
                        xref.room_id,
                        "room_id",
                    ));
                    continue;
                }
            };
            room_count += 1;

            let xref_id = format!("{}:{}", xref.room_id, xref.zone_id);
            let population = xref.xref_population.unwrap_or_else(|| {
                warnings.push(DataQualityWarning::missing_value("room_zone_xref", &xref_id, "xref_population"));
                0.0
            });
            let area = xref.xref_area.unwrap_or_else(|| {
                warnings.push(DataQualityWarning::missing_value("room_zone_xref", &xref_id, "xref_area"));
                0.0
            });

            let category = categories.get(&room.id);
            if let Some(c) = category {
                people_outdoor_air_rate_sum += c.people_outdoor_air_rate;
            }

            // 份额已在上面判空, 负数在库中出现时按数据问题记录并跳过
            match self
                .calculator
                .compute_for_room(Some(room.id), category, population, area)
            {
                Ok(result) => {
                    people_outdoor_air += result.components.people_component;
                    area_outdoor_air += result.components.area_component;
                    warnings.extend(result.warnings);
                }
                Err(e) => {
                    tracing::warn!(room_id = room.id, zone_id = zone.id, error = %e, "分区份额数据异常");
                    warnings.push(DataQualityWarning::missing_value("room_zone_xref", &xref_id, "share"));
                }
            }

            population_sum += population;
            area_sum += area;

            let room_check = self.check_room_group(room, xrefs);
            if !room_check.is_balanced() {
                unbalanced_room_ids.push(room.id);
            }
        }

        if let (None, Some(name)) = (zone.ahu_id, zone.ahu_name.as_ref()) {
            warnings.push(DataQualityWarning::UnresolvedAhu {
                zone_id: zone.id,
                ahu_name: name.clone(),
            });
        }

        ZoneGroupCheck {
            zone_id: zone.id,
            ahu_id: zone.ahu_id,
            ahu_name: zone.ahu_name.clone(),
            room_count,
            population_sum,
            area_sum,
            people_outdoor_air_rate_sum,
            people_outdoor_air,
            area_outdoor_air,
            total_outdoor_air: people_outdoor_air + area_outdoor_air,
            unbalanced_room_ids,
            warnings,
        }
    }

    /// 按 AHU 汇总分区检查结果
    ///
    /// 已回填 ahu_id 的分区按外键归组, 否则按名称归组;
    /// 两者都没有的分区归入 (None, None)
    pub fn roll_up_by_ahu(&self, checks: &[ZoneGroupCheck]) -> Vec<AhuAirflowSummary> {
        let mut groups: BTreeMap<(Option<AhuId>, Option<String>), AhuAirflowSummary> =
            BTreeMap::new();

        for check in checks {
            let key = match check.ahu_id {
                Some(id) => (Some(id), None),
                None => (None, check.ahu_name.clone()),
            };
            let entry = groups.entry(key).or_insert_with(|| AhuAirflowSummary {
                ahu_id: check.ahu_id,
                ahu_name: check.ahu_name.clone(),
                zone_ids: Vec::new(),
                population_sum: 0.0,
                area_sum: 0.0,
                total_outdoor_air: 0.0,
                unbalanced_zone_count: 0,
            });
            entry.zone_ids.push(check.zone_id);
            entry.population_sum += check.population_sum;
            entry.area_sum += check.area_sum;
            entry.total_outdoor_air += check.total_outdoor_air;
            if !check.is_balanced() {
                entry.unbalanced_zone_count += 1;
            }
        }

        groups.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::allocator::RoomZoneAllocator;

    fn create_test_room(id: RoomId, area: f64, population: f64, uncertainty: f64) -> Room {
        Room {
            id,
            facility_id: format!("ENG-{}", id),
            floor_id: 1,
            area,
            population,
            uncertainty_amount: uncertainty,
            occupancy_category_id: Some(1),
            reservable: false,
            active: true,
        }
    }

    fn create_test_zone(id: ZoneId, ahu_id: Option<AhuId>, ahu_name: Option<&str>) -> Zone {
        Zone {
            id,
            name: format!("Zone {}", id),
            code: format!("Z{}", id),
            building_id: 1,
            ahu_name: ahu_name.map(|s| s.to_string()),
            ahu_id,
            occupancy_sensor_present: false,
            active: true,
        }
    }

    fn classroom() -> OccupancyCategory {
        OccupancyCategory {
            id: 1,
            category: "Classroom".to_string(),
            people_outdoor_air_rate: 5.0,
            area_outdoor_air_rate: 0.06,
            occupant_density: 35.0,
            standby_allowed: true,
            type_group: None,
        }
    }

    #[test]
    fn test_example_allocation_is_consistent() {
        let room = create_test_room(1, 1000.0, 40.0, 5.0);
        let xrefs = RoomZoneAllocator::new()
            .allocate_equal_shares(&room, &[1, 2])
            .unwrap();

        let check = ConsistencyChecker::default().check_room_group(&room, &xrefs);

        assert!(check.area_ok);
        assert!(check.population_ok);
        assert!(check.proportion_ok);
        assert_eq!(check.area_sum, 1000.0);
        assert_eq!(check.population_sum, 45.0);
        assert_eq!(check.proportion_sum, Some(1.0));
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn test_equal_allocation_round_trip_many_zone_counts() {
        let allocator = RoomZoneAllocator::new();
        let checker = ConsistencyChecker::default();
        let room = create_test_room(1, 987.65, 33.0, 4.0);

        for n in 1..=12 {
            let zone_ids: Vec<ZoneId> = (1..=n).collect();
            let xrefs = allocator.allocate_equal_shares(&room, &zone_ids).unwrap();
            let check = checker.check_room_group(&room, &xrefs);
            assert!(check.is_balanced(), "n={} check={:?}", n, check);
        }
    }

    #[test]
    fn test_manual_edit_breaks_balance() {
        let room = create_test_room(1, 1000.0, 40.0, 5.0);
        let mut xrefs = RoomZoneAllocator::new()
            .allocate_equal_shares(&room, &[1, 2])
            .unwrap();
        xrefs[0].xref_area = Some(600.0);

        let check = ConsistencyChecker::default().check_room_group(&room, &xrefs);

        assert!(!check.area_ok);
        assert!(check.population_ok);
        assert!(check.proportion_ok);
        assert_eq!(check.area_sum, 1100.0);
        assert!(check.warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::ReconciliationMismatch { field, .. } if field == "xref_area"
        )));
    }

    #[test]
    fn test_proportion_band() {
        let checker = ConsistencyChecker::default();
        let room = create_test_room(1, 100.0, 10.0, 0.0);
        let make = |a: f64, b: f64| {
            vec![
                RoomZoneXref {
                    room_id: 1,
                    zone_id: 1,
                    xref_area: Some(50.0),
                    xref_population: Some(5.0),
                    pr_percent: Some(a),
                },
                RoomZoneXref {
                    room_id: 1,
                    zone_id: 2,
                    xref_area: Some(50.0),
                    xref_population: Some(5.0),
                    pr_percent: Some(b),
                },
            ]
        };

        // 0.333 + 0.66 = 0.993 -> 0.99 通过
        assert!(checker.check_room_group(&room, &make(0.333, 0.66)).proportion_ok);
        // 0.98 不通过
        assert!(!checker.check_room_group(&room, &make(0.49, 0.49)).proportion_ok);
        // 1.02 不通过
        assert!(!checker.check_room_group(&room, &make(0.51, 0.51)).proportion_ok);
    }

    #[test]
    fn test_null_proportion_fails() {
        let checker = ConsistencyChecker::default();
        let room = create_test_room(1, 100.0, 10.0, 0.0);
        let xrefs = vec![RoomZoneXref {
            room_id: 1,
            zone_id: 1,
            xref_area: Some(100.0),
            xref_population: Some(10.0),
            pr_percent: None,
        }];

        let check = checker.check_room_group(&room, &xrefs);
        assert!(check.area_ok);
        assert!(check.population_ok);
        assert!(!check.proportion_ok);
        assert_eq!(check.proportion_sum, None);
    }

    #[test]
    fn test_room_without_zones() {
        let checker = ConsistencyChecker::default();
        let room = create_test_room(5, 100.0, 10.0, 0.0);

        let check = checker.check_room_group(&room, &[]);
        assert!(!check.is_balanced());
        assert_eq!(check.zone_count, 0);
        assert!(check
            .warnings
            .contains(&DataQualityWarning::NoZoneAssignment { room_id: 5 }));
    }

    #[test]
    fn test_zone_group_sums_and_unbalanced_rooms() {
        let allocator = RoomZoneAllocator::new();
        let checker = ConsistencyChecker::default();

        // 房间1: 均分到分区10、11; 房间2: 整体归分区10, 但面积少录
        let room1 = create_test_room(1, 1000.0, 40.0, 5.0);
        let room2 = create_test_room(2, 400.0, 20.0, 0.0);
        let mut xrefs = allocator.allocate_equal_shares(&room1, &[10, 11]).unwrap();
        xrefs.push(RoomZoneXref {
            room_id: 2,
            zone_id: 10,
            xref_area: Some(300.0),
            xref_population: Some(20.0),
            pr_percent: Some(1.0),
        });

        let mut categories = HashMap::new();
        categories.insert(1, classroom());
        categories.insert(2, classroom());

        let zone = create_test_zone(10, Some(3), Some("AHU-3"));
        let check = checker.check_zone_group(&zone, &[room1, room2], &xrefs, &categories);

        assert_eq!(check.room_count, 2);
        assert!((check.population_sum - 42.5).abs() < 1e-9);
        assert!((check.area_sum - 800.0).abs() < 1e-9);
        assert!((check.people_outdoor_air_rate_sum - 10.0).abs() < 1e-9);
        assert!((check.people_outdoor_air - 212.5).abs() < 1e-9);
        assert!((check.area_outdoor_air - 48.0).abs() < 1e-9);
        assert!((check.total_outdoor_air - 260.5).abs() < 1e-9);
        assert_eq!(check.unbalanced_room_ids, vec![2]);
        assert!(!check.is_balanced());
    }

    #[test]
    fn test_zone_group_flags_missing_category_and_unresolved_ahu() {
        let checker = ConsistencyChecker::default();
        let room = create_test_room(1, 100.0, 10.0, 0.0);
        let xrefs = vec![RoomZoneXref {
            room_id: 1,
            zone_id: 4,
            xref_area: Some(100.0),
            xref_population: Some(10.0),
            pr_percent: Some(1.0),
        }];
        let zone = create_test_zone(4, None, Some("AHU-LEGACY"));

        let check = checker.check_zone_group(&zone, &[room], &xrefs, &HashMap::new());

        assert_eq!(check.total_outdoor_air, 0.0);
        assert!(check.is_balanced());
        assert!(check
            .warnings
            .contains(&DataQualityWarning::MissingCategory { room_id: Some(1) }));
        assert!(check.warnings.iter().any(|w| matches!(w, DataQualityWarning::UnresolvedAhu { .. })));
    }

    #[test]
    fn test_roll_up_by_ahu() {
        let checker = ConsistencyChecker::default();
        let base = ZoneGroupCheck {
            zone_id: 1,
            ahu_id: Some(9),
            ahu_name: Some("AHU-9".to_string()),
            room_count: 1,
            population_sum: 10.0,
            area_sum: 100.0,
            people_outdoor_air_rate_sum: 5.0,
            people_outdoor_air: 50.0,
            area_outdoor_air: 6.0,
            total_outdoor_air: 56.0,
            unbalanced_room_ids: vec![],
            warnings: vec![],
        };
        let second = ZoneGroupCheck {
            zone_id: 2,
            unbalanced_room_ids: vec![7],
            ..base.clone()
        };
        let orphan = ZoneGroupCheck {
            zone_id: 3,
            ahu_id: None,
            ahu_name: None,
            ..base.clone()
        };

        let summaries = checker.roll_up_by_ahu(&[base, second, orphan]);

        assert_eq!(summaries.len(), 2);
        let ahu9 = summaries.iter().find(|s| s.ahu_id == Some(9)).unwrap();
        assert_eq!(ahu9.zone_ids, vec![1, 2]);
        assert!((ahu9.total_outdoor_air - 112.0).abs() < 1e-9);
        assert_eq!(ahu9.unbalanced_zone_count, 1);
    }
}
