// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use facility_airflow::domain::event::Event;
use facility_airflow::domain::occupancy::OccupancyCategory;
use facility_airflow::domain::room::Room;
use facility_airflow::domain::xref::RoomZoneXref;
use facility_airflow::domain::zone::Zone;

// ==========================================
// Room 构建器
// ==========================================

pub struct RoomBuilder {
    id: i64,
    facility_id: String,
    area: f64,
    population: f64,
    uncertainty_amount: f64,
    occupancy_category_id: Option<i64>,
}

impl RoomBuilder {
    pub fn new(id: i64, facility_id: &str) -> Self {
        Self {
            id,
            facility_id: facility_id.to_string(),
            area: 100.0,
            population: 0.0,
            uncertainty_amount: 0.0,
            occupancy_category_id: None,
        }
    }

    pub fn area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    pub fn population(mut self, population: f64) -> Self {
        self.population = population;
        self
    }

    pub fn uncertainty(mut self, amount: f64) -> Self {
        self.uncertainty_amount = amount;
        self
    }

    pub fn category(mut self, category_id: i64) -> Self {
        self.occupancy_category_id = Some(category_id);
        self
    }

    pub fn build(self) -> Room {
        Room {
            id: self.id,
            facility_id: self.facility_id,
            floor_id: 1,
            area: self.area,
            population: self.population,
            uncertainty_amount: self.uncertainty_amount,
            occupancy_category_id: self.occupancy_category_id,
            reservable: true,
            active: true,
        }
    }
}

// ==========================================
// OccupancyCategory 构建器
// ==========================================

pub fn category(id: i64, name: &str, people_rate: f64, area_rate: f64) -> OccupancyCategory {
    OccupancyCategory {
        id,
        category: name.to_string(),
        people_outdoor_air_rate: people_rate,
        area_outdoor_air_rate: area_rate,
        occupant_density: 0.0,
        standby_allowed: false,
        type_group: None,
    }
}

// ==========================================
// Zone / Xref 构建
// ==========================================

pub fn zone(id: i64, ahu_name: Option<&str>, ahu_id: Option<i64>) -> Zone {
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

pub fn xref(room_id: i64, zone_id: i64, area: f64, population: f64, pr: f64) -> RoomZoneXref {
    RoomZoneXref {
        room_id,
        zone_id,
        xref_area: Some(area),
        xref_population: Some(population),
        pr_percent: Some(pr),
    }
}

// ==========================================
// Event 构建器
// ==========================================

pub struct EventBuilder {
    id: i64,
    room_facility_id: String,
    enrollment_total: Option<u32>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    days_pattern: String,
}

impl EventBuilder {
    /// 默认: 2026 春季学期, 周一/三/五 09:00-10:15
    pub fn new(id: i64, room_facility_id: &str) -> Self {
        Self {
            id,
            room_facility_id: room_facility_id.to_string(),
            enrollment_total: None,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 8).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 15, 0).unwrap(),
            days_pattern: "M-W-F--".to_string(),
        }
    }

    pub fn enrollment(mut self, enrollment: u32) -> Self {
        self.enrollment_total = Some(enrollment);
        self
    }

    pub fn time(mut self, start: (u32, u32), end: (u32, u32)) -> Self {
        self.start_time = NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap();
        self.end_time = NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap();
        self
    }

    pub fn days(mut self, pattern: &str) -> Self {
        self.days_pattern = pattern.to_string();
        self
    }

    pub fn build(self) -> Event {
        Event {
            id: self.id,
            title: format!("EVENT {}", self.id),
            room_facility_id: self.room_facility_id,
            enrollment_total: self.enrollment_total,
            start_date_time: NaiveDateTime::new(self.start_date, self.start_time),
            end_date_time: NaiveDateTime::new(self.end_date, self.end_time),
            day_of_week_flags: Event::flags_from_pattern(&self.days_pattern),
        }
    }
}
