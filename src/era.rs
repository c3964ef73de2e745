use serde::Serialize;
use std::fmt;

/// Last year served from the legacy export.
pub const LAST_LEGACY_YEAR: i32 = 2025;

/// Which backing system holds the data for a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Legacy,
    D365,
}

pub fn resolve_provider(year: i32) -> Era {
    if year <= LAST_LEGACY_YEAR {
        Era::Legacy
    } else {
        Era::D365
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Era::Legacy => f.write_str("legacy"),
            Era::D365 => f.write_str("d365"),
        }
    }
}
