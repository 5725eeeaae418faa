// Facility outdoor-airflow audit: consistency checks, zone/AHU totals and event roll-ups
// for one building (or every active building).
//
// Usage:
//   cargo run --bin airflow-audit -- [db_path] [building_id] [mode] [csv_out]
//
// mode is one of ROOM / ZONE / ZONE_EVENT / ROOM_EVENT / EVENT (default ZONE_EVENT).
// When csv_out is given, the event detail rows are exported there.

use std::fs::File;

use anyhow::{anyhow, Context};
use facility_airflow::app::{get_default_db_path, AppState};
use facility_airflow::domain::types::{BuildingId, GroupingMode};
use facility_airflow::logging;

/// 命令行参数
#[derive(Debug, PartialEq)]
struct AuditArgs {
    db_path: String,
    building_id: Option<BuildingId>,
    mode: GroupingMode,
    csv_out: Option<String>,
}

impl AuditArgs {
    /// 按位置解析参数; 空字符串视为未提供
    fn parse<I>(args: I, default_db_path: impl FnOnce() -> String) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args
            .into_iter()
            .map(|s| Some(s).filter(|s| !s.trim().is_empty()));
        let mut next = || args.next().flatten();

        let db_path = next().unwrap_or_else(default_db_path);
        let building_id = next()
            .map(|id| {
                id.trim()
                    .parse::<BuildingId>()
                    .with_context(|| format!("building_id 不是整数: {}", id))
            })
            .transpose()?;
        let mode = match next() {
            Some(m) => m.parse().map_err(|e: String| anyhow!(e))?,
            None => GroupingMode::ZoneEvent,
        };
        let csv_out = next();

        Ok(Self {
            db_path,
            building_id,
            mode,
            csv_out,
        })
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let AuditArgs {
        db_path,
        building_id,
        mode,
        csv_out,
    } = AuditArgs::parse(std::env::args().skip(1), get_default_db_path)?;

    let state = AppState::new(db_path.clone()).map_err(|e| anyhow!(e))?;

    let building_ids: Vec<BuildingId> = match building_id {
        Some(id) => vec![id],
        None => state
            .building_repo
            .list_active()?
            .into_iter()
            .map(|b| b.id)
            .collect(),
    };

    if building_ids.is_empty() {
        println!("db={} 中没有启用的建筑", db_path);
        return Ok(());
    }

    let mut csv_rows = Vec::new();

    for building_id in building_ids {
        println!("==== building_id={} ====", building_id);

        let consistency = state.xref_api.check_building(building_id)?;
        println!(
            "rooms={} unbalanced={:?}",
            consistency.room_checks.len(),
            consistency.unbalanced_room_ids
        );

        for zone in state.airflow_api.zone_report(building_id)? {
            println!(
                "zone={} ahu={} rooms={} population={:.2} area={:.2} total_oa={:.2} unbalanced={:?}",
                zone.zone_id,
                zone.ahu_name.as_deref().unwrap_or("-"),
                zone.room_count,
                zone.population_sum,
                zone.area_sum,
                zone.total_outdoor_air,
                zone.unbalanced_room_ids
            );
        }

        for ahu in state.airflow_api.ahu_summary(building_id)? {
            println!(
                "ahu={} zones={} total_oa={:.2} unbalanced_zones={}",
                ahu.ahu_name.as_deref().unwrap_or("(未分配)"),
                ahu.zone_ids.len(),
                ahu.total_outdoor_air,
                ahu.unbalanced_zone_count
            );
        }

        let report = state.airflow_api.event_airflow_report(building_id, mode)?;
        println!("mode={} rows={} groups={}", report.mode, report.rows.len(), report.groups.len());
        for group in &report.groups {
            println!("{}", serde_json::to_string(group)?);
        }
        for warning in &report.unassigned_warnings {
            println!("warning: {}", warning);
        }

        for peak in state.airflow_api.peak_zone_demand(building_id)? {
            println!(
                "peak zone={} oa={:.2} weekday={:?} at={:?} events={:?}",
                peak.zone_id,
                peak.peak_zone_outdoor_air,
                peak.weekday_index,
                peak.at_time,
                peak.concurrent_event_ids
            );
        }

        csv_rows.extend(report.rows);
    }

    if let Some(path) = csv_out {
        let file = File::create(&path).with_context(|| format!("无法创建 {}", path))?;
        let written = state.airflow_api.export_csv(&csv_rows, file)?;
        println!("csv={} rows={}", path, written);
    }

    Ok(())
}
