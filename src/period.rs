use crate::errors::AppError;
use crate::models::{RangeInfo, SalesQuery};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Inclusive calendar range of one reporting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub year: i32,
    /// Zero-based, as sent by the frontend.
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportRange {
    pub fn year(year: i32) -> Option<Self> {
        Some(Self {
            year,
            month: None,
            day: None,
            from: NaiveDate::from_ymd_opt(year, 1, 1)?,
            to: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    pub fn month(year: i32, month: u32) -> Option<Self> {
        let from = NaiveDate::from_ymd_opt(year, month + 1, 1)?;
        Some(Self {
            year,
            month: Some(month),
            day: None,
            from,
            to: last_day_of_month(from),
        })
    }

    pub fn day(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month + 1, day)?;
        Some(Self {
            year,
            month: Some(month),
            day: Some(day),
            from: date,
            to: date,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    pub fn contains_timestamp(&self, timestamp: NaiveDateTime) -> bool {
        self.contains(timestamp.date())
    }

    pub fn start_of_range(&self) -> NaiveDateTime {
        self.from.and_time(NaiveTime::MIN)
    }

    /// Last instant covered by the range.
    pub fn end_of_range(&self) -> NaiveDateTime {
        (self.to + Duration::days(1)).and_time(NaiveTime::MIN) - Duration::milliseconds(1)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from.iter_days().take_while(|date| *date <= self.to)
    }

    pub fn info(&self) -> RangeInfo {
        RangeInfo {
            from: date_key(self.from),
            to: date_key(self.to),
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }
}

pub fn parse_range(query: &SalesQuery) -> Result<ReportRange, AppError> {
    let year = parse_year(query.year.as_deref())?;
    let month = parse_optional(query.month.as_deref(), "month")?;
    let day = parse_optional(query.day.as_deref(), "day")?;

    match (month, day) {
        (None, None) => {
            ReportRange::year(year).ok_or_else(|| AppError::bad_request("year out of range"))
        }
        (Some(month), None) => {
            check_month(month)?;
            ReportRange::month(year, month)
                .ok_or_else(|| AppError::bad_request("month out of range"))
        }
        (Some(month), Some(day)) => {
            check_month(month)?;
            ReportRange::day(year, month, day).ok_or_else(|| {
                AppError::bad_request(format!(
                    "day {day} does not exist in month {month} of {year}"
                ))
            })
        }
        (None, Some(_)) => Err(AppError::bad_request("day requires month")),
    }
}

pub fn parse_year(raw: Option<&str>) -> Result<i32, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request("year is required"))?;
    let year = raw
        .parse::<i32>()
        .map_err(|_| AppError::bad_request(format!("invalid year '{raw}'")))?;
    if !(2000..=2100).contains(&year) {
        return Err(AppError::bad_request(format!("year {year} out of range")));
    }
    Ok(year)
}

fn parse_optional(raw: Option<&str>, field: &str) -> Result<Option<u32>, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("invalid {field} '{value}'"))),
    }
}

fn check_month(month: u32) -> Result<(), AppError> {
    if month > 11 {
        return Err(AppError::bad_request(format!("month {month} out of range 0-11")));
    }
    Ok(())
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first - Duration::days(1))
        .unwrap_or(date)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| last_day_of_month(first).day())
        .unwrap_or(30)
}

/// Accepts `YYYY-MM-DD` or an ISO date-time, with or without offset.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(stamp) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(stamp);
        }
    }
    None
}
