//! Service calendar rules: weekly patterns merged with dated exceptions.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::FeedError;
use crate::feed::{Row, Table};

/// Date range given to services that only appear in `calendar_dates.txt`.
pub const OPEN_START_DATE: &str = "00000000";
pub const OPEN_END_DATE: &str = "99999999";

const WEEKDAY_COLUMNS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// When a service runs. Dates are kept as the feed's `YYYYMMDD` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRule {
    #[serde(skip)]
    pub service_id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(serialize_with = "serialize_days")]
    pub days: [bool; 7],
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ServiceRule {
    /// A rule that never runs on its own, for services defined only by
    /// exceptions.
    pub fn exceptions_only(service_id: &str) -> Self {
        Self {
            service_id: service_id.to_string(),
            start_date: OPEN_START_DATE.to_string(),
            end_date: OPEN_END_DATE.to_string(),
            days: [false; 7],
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    fn from_calendar_row(row: &Row<'_>) -> Result<Self, FeedError> {
        let mut days = [false; 7];
        for (day, column) in days.iter_mut().zip(WEEKDAY_COLUMNS) {
            let value = row.require(column)?;
            let flag: i64 = value.trim().parse().map_err(|_| row.invalid(column, value))?;
            *day = flag != 0;
        }

        Ok(Self {
            service_id: row.require("service_id")?.to_string(),
            start_date: row.require("start_date")?.to_string(),
            end_date: row.require("end_date")?.to_string(),
            days,
            added: Vec::new(),
            removed: Vec::new(),
        })
    }

    /// Resolves whether the service runs on `date`.
    ///
    /// Removed dates always win, then added dates, then the weekly pattern
    /// inside `[start_date, end_date]`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        let key = date.format("%Y%m%d").to_string();

        if self.removed.contains(&key) {
            return false;
        }
        if self.added.contains(&key) {
            return true;
        }

        // Fixed-width YYYYMMDD strings order the same way as the dates.
        let in_range = self.start_date <= key && key <= self.end_date;
        in_range && self.days[date.weekday().num_days_from_monday() as usize]
    }
}

fn serialize_days<S: Serializer>(days: &[bool; 7], serializer: S) -> Result<S::Ok, S::Error> {
    days.map(u8::from).serialize(serializer)
}

/// `exception_type` values of `calendar_dates.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Added,
    Removed,
}

impl ExceptionType {
    /// `None` for codes other than `1` and `2`; those rows are skipped.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::Added),
            "2" => Some(Self::Removed),
            _ => None,
        }
    }
}

/// Builds `service_id → ServiceRule` from `calendar.txt` and
/// `calendar_dates.txt`.
pub fn build_service_calendar(
    calendar: &Table,
    calendar_dates: &Table,
) -> Result<BTreeMap<String, ServiceRule>, FeedError> {
    let mut services = BTreeMap::new();

    for row in calendar.rows() {
        let rule = ServiceRule::from_calendar_row(&row)?;
        services.insert(rule.service_id.clone(), rule);
    }

    let mut exceptions_only = 0usize;
    let mut ignored = 0usize;
    for row in calendar_dates.rows() {
        let service_id = row.require("service_id")?;
        let date = row.require("date")?;
        let exception_type = row.require("exception_type")?;

        let rule = services.entry(service_id.to_string()).or_insert_with(|| {
            exceptions_only += 1;
            ServiceRule::exceptions_only(service_id)
        });

        match ExceptionType::from_code(exception_type) {
            Some(ExceptionType::Added) => rule.added.push(date.to_string()),
            Some(ExceptionType::Removed) => rule.removed.push(date.to_string()),
            None => ignored += 1,
        }
    }

    debug!(
        services = services.len(),
        exceptions_only, ignored, "Service calendar built"
    );

    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALENDAR_HEADER: &str =
        "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n";

    fn table(name: &str, text: &str) -> Table {
        Table::from_reader(name, text.as_bytes()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_row_with_removed_exception() {
        let calendar = table(
            "calendar.txt",
            &format!("{CALENDAR_HEADER}S2,1,0,0,0,0,0,0,20240101,20241231\n"),
        );
        let dates = table(
            "calendar_dates.txt",
            "service_id,date,exception_type\nS2,20240704,2\n",
        );

        let services = build_service_calendar(&calendar, &dates).unwrap();
        let rule = &services["S2"];

        assert!(rule.days[0]);
        assert_eq!(rule.removed, vec!["20240704".to_string()]);
        assert!(rule.added.is_empty());
        // 2024-07-04 is a Thursday, 2024-07-08 a Monday.
        assert!(!rule.is_active_on(date(2024, 7, 4)));
        assert!(rule.is_active_on(date(2024, 7, 8)));
    }

    #[test]
    fn test_exceptions_only_service_gets_synthetic_rule() {
        let calendar = Table::empty("calendar.txt");
        let dates = table(
            "calendar_dates.txt",
            "service_id,date,exception_type\nX,20240101,1\nX,20240102,2\nX,20240103,1\n",
        );

        let services = build_service_calendar(&calendar, &dates).unwrap();
        let rule = &services["X"];

        assert_eq!(rule.days, [false; 7]);
        assert_eq!(rule.start_date, OPEN_START_DATE);
        assert_eq!(rule.end_date, OPEN_END_DATE);
        assert_eq!(rule.added, vec!["20240101".to_string(), "20240103".to_string()]);
        assert_eq!(rule.removed, vec!["20240102".to_string()]);
        assert!(rule.is_active_on(date(2024, 1, 3)));
        assert!(!rule.is_active_on(date(2024, 1, 4)));
    }

    #[test]
    fn test_unknown_exception_type_is_ignored() {
        let calendar = Table::empty("calendar.txt");
        let dates = table(
            "calendar_dates.txt",
            "service_id,date,exception_type\nX,20240101,3\nX,20240102,\n",
        );

        let services = build_service_calendar(&calendar, &dates).unwrap();
        let rule = &services["X"];

        assert!(rule.added.is_empty());
        assert!(rule.removed.is_empty());
    }

    #[test]
    fn test_added_date_outside_range_is_active() {
        let calendar = table(
            "calendar.txt",
            &format!("{CALENDAR_HEADER}WK,1,1,1,1,1,0,0,20240101,20240131\n"),
        );
        let dates = table(
            "calendar_dates.txt",
            "service_id,date,exception_type\nWK,20240302,1\n",
        );

        let rule = &build_service_calendar(&calendar, &dates).unwrap()["WK"];

        // Weekday inside the range, weekday outside it, added Saturday outside it.
        assert!(rule.is_active_on(date(2024, 1, 15)));
        assert!(!rule.is_active_on(date(2024, 2, 15)));
        assert!(rule.is_active_on(date(2024, 3, 2)));
    }

    #[test]
    fn test_non_integer_weekday_flag_is_invalid() {
        let calendar = table(
            "calendar.txt",
            &format!("{CALENDAR_HEADER}S1,yes,0,0,0,0,0,0,20240101,20241231\n"),
        );

        let result = build_service_calendar(&calendar, &Table::empty("calendar_dates.txt"));
        assert!(matches!(
            result,
            Err(FeedError::InvalidField { ref field, .. }) if field == "monday"
        ));
    }

    #[test]
    fn test_rule_serializes_days_as_integers() {
        let mut rule = ServiceRule::exceptions_only("S1");
        rule.days[0] = true;
        rule.days[6] = true;
        rule.added.push("20240101".into());

        let json = serde_json::to_string(&rule).unwrap();

        assert_eq!(
            json,
            r#"{"start_date":"00000000","end_date":"99999999","days":[1,0,0,0,0,0,1],"added":["20240101"],"removed":[]}"#
        );
    }
}
