// ==========================================
// 设施新风量引擎 - 排课/考试活动
// ==========================================
// 来源: 外部教务系统导入, 引擎只读
// 口径: start/end 的日期部分为学期跨度, 时间部分为每次上课时段,
//       day_of_week_flags 决定每周哪几天发生
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::EventId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub room_facility_id: String,
    pub enrollment_total: Option<u32>,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub day_of_week_flags: [bool; 7], // 周一在前
}

impl Event {
    pub fn start_date(&self) -> NaiveDate {
        self.start_date_time.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date_time.date()
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_date_time.time()
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_date_time.time()
    }

    /// 是否在指定星期发生 (0 = 周一)
    pub fn meets_on(&self, weekday_index: usize) -> bool {
        self.day_of_week_flags.get(weekday_index).copied().unwrap_or(false)
    }

    /// 某日是否处于学期跨度内且当天有课
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        date >= self.start_date()
            && date <= self.end_date()
            && self.meets_on(date.weekday().num_days_from_monday() as usize)
    }

    /// 指定日期 + 时刻是否处于上课时段 (左闭右开)
    pub fn active_at(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.occurs_on(date) && time >= self.start_time() && time < self.end_time()
    }

    /// 学期内第一个落在指定星期的日期 (0 = 周一)
    pub fn first_date_on(&self, weekday_index: usize) -> Option<NaiveDate> {
        let start = self.start_date();
        let offset = (weekday_index as i64 + 7
            - start.weekday().num_days_from_monday() as i64)
            % 7;
        let date = start + Duration::days(offset);
        (date <= self.end_date() && self.meets_on(weekday_index)).then_some(date)
    }

    /// 星期标志编码为 "MTWRFSU" 风格字符串, 未上课日为 '-'
    pub fn days_pattern(&self) -> String {
        const LETTERS: [char; 7] = ['M', 'T', 'W', 'R', 'F', 'S', 'U'];
        self.day_of_week_flags
            .iter()
            .zip(LETTERS)
            .map(|(on, c)| if *on { c } else { '-' })
            .collect()
    }

    /// 解析 "MTWRFSU" 风格字符串 (与 days_pattern 对应)
    pub fn flags_from_pattern(pattern: &str) -> [bool; 7] {
        const LETTERS: [char; 7] = ['M', 'T', 'W', 'R', 'F', 'S', 'U'];
        let mut flags = [false; 7];
        for (i, c) in pattern.chars().take(7).enumerate() {
            flags[i] = c.to_ascii_uppercase() == LETTERS[i];
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(pattern: &str) -> Event {
        Event {
            id: 1,
            title: "PHYS 101".to_string(),
            room_facility_id: "ENG-101".to_string(),
            enrollment_total: Some(30),
            start_date_time: NaiveDate::from_ymd_opt(2026, 1, 12)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            end_date_time: NaiveDate::from_ymd_opt(2026, 5, 1)
                .unwrap()
                .and_hms_opt(10, 15, 0)
                .unwrap(),
            day_of_week_flags: Event::flags_from_pattern(pattern),
        }
    }

    #[test]
    fn test_days_pattern() {
        let event = make_event("M-W-F--");
        assert_eq!(event.days_pattern(), "M-W-F--");
        assert!(event.meets_on(0));
        assert!(!event.meets_on(1));
        assert!(!event.meets_on(9));
    }

    #[test]
    fn test_occurs_on() {
        let event = make_event("M-W-F--");
        // 2026-01-12 是周一
        assert!(event.occurs_on(NaiveDate::from_ymd_opt(2026, 1, 12).unwrap()));
        assert!(!event.occurs_on(NaiveDate::from_ymd_opt(2026, 1, 13).unwrap()));
        assert!(!event.occurs_on(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()));
    }

    #[test]
    fn test_active_at_is_half_open() {
        let event = make_event("M------");
        let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        assert!(event.active_at(date, NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        assert!(!event.active_at(date, NaiveTime::from_hms_opt(10, 15, 0).unwrap()));
        // 周二不上课
        let tuesday = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        assert!(!event.active_at(tuesday, NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
    }

    #[test]
    fn test_first_date_on() {
        let event = make_event("M-W-F--");
        // 学期从 2026-01-12 (周一) 开始
        assert_eq!(event.first_date_on(0), NaiveDate::from_ymd_opt(2026, 1, 12));
        assert_eq!(event.first_date_on(2), NaiveDate::from_ymd_opt(2026, 1, 14));
        assert_eq!(event.first_date_on(1), None);
    }
}
