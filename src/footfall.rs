use crate::errors::SourceError;
use crate::period::{days_in_month, parse_timestamp, ReportRange};
use crate::storage::load_json;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FootfallFile {
    #[serde(default)]
    pub visitors: Vec<VisitorCount>,
    #[serde(default)]
    pub targets: Vec<MonthlyTarget>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorCount {
    pub store_id: String,
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTarget {
    pub store_id: String,
    pub year: i32,
    /// 1-12.
    pub month: u32,
    pub amount: f64,
}

/// Visitors and targets per store for one range.
#[derive(Debug, Clone, Default)]
pub struct Footfall {
    visitors: HashMap<String, u64>,
    targets: HashMap<String, f64>,
    daily_visitors: HashMap<(String, NaiveDate), u64>,
    available: bool,
}

impl Footfall {
    pub fn for_range(file: &FootfallFile, range: &ReportRange) -> Self {
        let mut footfall = Footfall {
            available: true,
            ..Footfall::default()
        };

        for entry in &file.visitors {
            let Some(date) = parse_timestamp(&entry.date).map(|stamp| stamp.date()) else {
                continue;
            };
            if !range.contains(date) {
                continue;
            }
            *footfall.visitors.entry(entry.store_id.clone()).or_default() += entry.count;
            *footfall
                .daily_visitors
                .entry((entry.store_id.clone(), date))
                .or_default() += entry.count;
        }

        for target in &file.targets {
            let share = prorated_target(target, range);
            if share != 0.0 {
                *footfall.targets.entry(target.store_id.clone()).or_default() += share;
            }
        }

        footfall
    }

    pub fn visitors(&self, store_id: &str) -> Option<u64> {
        if !self.available {
            return None;
        }
        Some(self.visitors.get(store_id).copied().unwrap_or(0))
    }

    pub fn visitors_on(&self, store_id: &str, date: NaiveDate) -> Option<u64> {
        if !self.available {
            return None;
        }
        Some(
            self.daily_visitors
                .get(&(store_id.to_string(), date))
                .copied()
                .unwrap_or(0),
        )
    }

    pub fn target(&self, store_id: &str) -> Option<f64> {
        if !self.available {
            return None;
        }
        Some(self.targets.get(store_id).copied().unwrap_or(0.0))
    }

    pub fn total_visitors(&self) -> Option<u64> {
        self.available.then(|| self.visitors.values().sum())
    }

    pub fn total_target(&self) -> Option<f64> {
        self.available.then(|| self.targets.values().sum())
    }
}

/// Share of a monthly target that falls inside `range`, by day count.
fn prorated_target(target: &MonthlyTarget, range: &ReportRange) -> f64 {
    let Some(first) = NaiveDate::from_ymd_opt(target.year, target.month, 1) else {
        return 0.0;
    };
    let month_days = days_in_month(target.year, target.month);
    let covered = range
        .days()
        .filter(|date| date.year() == first.year() && date.month() == first.month())
        .count() as f64;
    target.amount * covered / f64::from(month_days)
}

pub async fn load_footfall(path: &Path, range: &ReportRange) -> (Footfall, Option<String>) {
    match load_json::<FootfallFile>(path).await {
        Ok(file) => (Footfall::for_range(&file, range), None),
        Err(SourceError::NotFound(_)) => (
            Footfall::default(),
            Some("no footfall data, visitors and targets omitted".to_string()),
        ),
        Err(err) => {
            warn!("footfall data unavailable: {err}");
            (Footfall::default(), Some(format!("footfall unavailable: {err}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> FootfallFile {
        FootfallFile {
            visitors: vec![
                VisitorCount {
                    store_id: "1001".into(),
                    date: "2025-02-01".into(),
                    count: 40,
                },
                VisitorCount {
                    store_id: "1001".into(),
                    date: "2025-02-02".into(),
                    count: 60,
                },
                VisitorCount {
                    store_id: "1001".into(),
                    date: "2025-03-01".into(),
                    count: 500,
                },
            ],
            targets: vec![MonthlyTarget {
                store_id: "1001".into(),
                year: 2025,
                month: 2,
                amount: 2800.0,
            }],
        }
    }

    #[test]
    fn visitors_are_summed_within_range() {
        let range = ReportRange::month(2025, 1).unwrap();
        let footfall = Footfall::for_range(&file(), &range);
        assert_eq!(footfall.visitors("1001"), Some(100));
        assert_eq!(footfall.visitors("2002"), Some(0));
        assert_eq!(footfall.total_visitors(), Some(100));
        let day = NaiveDate::from_ymd_opt(2025, 2, 2).unwrap();
        assert_eq!(footfall.visitors_on("1001", day), Some(60));
    }

    #[test]
    fn targets_are_prorated_by_days() {
        let month = Footfall::for_range(&file(), &ReportRange::month(2025, 1).unwrap());
        assert_eq!(month.target("1001"), Some(2800.0));

        let day = Footfall::for_range(&file(), &ReportRange::day(2025, 1, 10).unwrap());
        assert_eq!(day.target("1001"), Some(100.0));

        let year = Footfall::for_range(&file(), &ReportRange::year(2025).unwrap());
        assert_eq!(year.target("1001"), Some(2800.0));
    }

    #[test]
    fn unavailable_footfall_omits_fields() {
        let footfall = Footfall::default();
        assert_eq!(footfall.visitors("1001"), None);
        assert_eq!(footfall.total_target(), None);
    }
}
