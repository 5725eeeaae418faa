// ==========================================
// 设施新风量引擎 - 新风量计算器
// ==========================================
// 依据: ASHRAE 62.1 Vbz = Rp·Pz + Ra·Az
// ==========================================
// 职责: 由人员类别新风率与人数/面积份额计算新风量分量
// 输入: 人员类别 (可缺失) + 人数份额 + 面积份额
// 输出: 人员新风 + 面积新风 + 合计
// 红线: 纯函数, 无副作用
// ==========================================

use crate::domain::airflow::OutdoorAirComponents;
use crate::domain::occupancy::OccupancyCategory;
use crate::domain::types::RoomId;
use crate::domain::warning::DataQualityWarning;
use crate::engine::error::{ensure_non_negative, EngineResult};

/// 计算结果 (分量 + 数据质量告警)
#[derive(Debug, Clone, PartialEq)]
pub struct OutdoorAirComputation {
    pub components: OutdoorAirComponents,
    pub warnings: Vec<DataQualityWarning>,
}

// ==========================================
// OutdoorAirCalculator - 新风量计算器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct OutdoorAirCalculator {
    // 无状态引擎
}

impl OutdoorAirCalculator {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算新风量
    ///
    /// - people_component = people_outdoor_air_rate × population_share
    /// - area_component = area_outdoor_air_rate × area_share
    /// - total = people_component + area_component
    ///
    /// 人员类别缺失时新风率按 0 计, 并返回 MissingCategory 告警
    ///
    /// # 错误
    /// - InvalidInput: 份额为负数或非数值
    pub fn compute_outdoor_air(
        &self,
        category: Option<&OccupancyCategory>,
        population_share: f64,
        area_share: f64,
    ) -> EngineResult<OutdoorAirComputation> {
        self.compute_for_room(None, category, population_share, area_share)
    }

    /// 同 compute_outdoor_air, 告警中带上房间ID
    pub fn compute_for_room(
        &self,
        room_id: Option<RoomId>,
        category: Option<&OccupancyCategory>,
        population_share: f64,
        area_share: f64,
    ) -> EngineResult<OutdoorAirComputation> {
        let population_share = ensure_non_negative("population_share", population_share)?;
        let area_share = ensure_non_negative("area_share", area_share)?;

        let mut warnings = Vec::new();
        let (people_rate, area_rate) = match category {
            Some(c) => (c.people_outdoor_air_rate, c.area_outdoor_air_rate),
            None => {
                warnings.push(DataQualityWarning::MissingCategory { room_id });
                (0.0, 0.0)
            }
        };

        let people_component = people_rate * population_share;
        let area_component = area_rate * area_share;

        Ok(OutdoorAirComputation {
            components: OutdoorAirComponents {
                people_component,
                area_component,
                total: people_component + area_component,
            },
            warnings,
        })
    }
}
