//! Store directory: raw store id to display name.
//!
//! Three inputs feed the directory: the spreadsheet export (CSV), the
//! management JSON file and the `stores` table. Every loader degrades to an
//! empty directory, in which case ids are shown as names.

use crate::errors::SourceError;
use crate::models::StoreRecord;
use crate::storage::{load_json, read_source};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Header names of the store spreadsheet, schema v1.
pub const SCHEMA_V1_KEY: &str = "store_id";
pub const SCHEMA_V1_NAME: &str = "display_name";
const SCHEMA_V1_AREA_MANAGER: &str = "area_manager";
const SCHEMA_V1_CITY: &str = "city";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorySource {
    Spreadsheet,
    Management,
    Database,
}

impl DirectorySource {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "spreadsheet" | "csv" => Some(Self::Spreadsheet),
            "management" | "json" => Some(Self::Management),
            "database" | "db" | "sql" => Some(Self::Database),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::Management => "management",
            Self::Database => "database",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreDirectory {
    records: HashMap<String, StoreRecord>,
}

impl StoreDirectory {
    pub fn from_records(records: impl IntoIterator<Item = StoreRecord>) -> Self {
        let mut directory = Self::default();
        for record in records {
            let (Some(store_id), Some(display_name)) =
                (clean_value(&record.store_id), clean_value(&record.display_name))
            else {
                continue;
            };
            directory.records.insert(
                store_id.clone(),
                StoreRecord {
                    store_id,
                    display_name,
                    area_manager: record.area_manager.as_deref().and_then(clean_value),
                    city: record.city.as_deref().and_then(clean_value),
                },
            );
        }
        directory
    }

    /// Display name for `store_id`, or the id itself when unknown.
    pub fn resolve(&self, store_id: &str) -> String {
        self.records
            .get(store_id.trim())
            .map(|record| record.display_name.clone())
            .unwrap_or_else(|| store_id.to_string())
    }

    pub fn get(&self, store_id: &str) -> Option<&StoreRecord> {
        self.records.get(store_id.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> Vec<StoreRecord> {
        let mut records: Vec<StoreRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.store_id.cmp(&b.store_id));
        records
    }
}

/// Blank cells and the literal "NaN" count as missing.
fn clean_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(value.to_string())
    }
}

struct ColumnLayout {
    key: usize,
    name: usize,
    area_manager: Option<usize>,
    city: Option<usize>,
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn schema_v1_layout(headers: &[String]) -> Option<ColumnLayout> {
    let position = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    Some(ColumnLayout {
        key: position(SCHEMA_V1_KEY)?,
        name: position(SCHEMA_V1_NAME)?,
        area_manager: position(SCHEMA_V1_AREA_MANAGER),
        city: position(SCHEMA_V1_CITY),
    })
}

/// Column guessing for spreadsheets that predate the v1 header contract.
fn guessed_layout(headers: &[String]) -> Option<ColumnLayout> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let key = normalized
        .iter()
        .position(|h| h.contains("store") && (h.contains("number") || h.contains("id")))
        .or(if normalized.is_empty() { None } else { Some(0) })?;

    let name = normalized
        .iter()
        .enumerate()
        .position(|(i, h)| i != key && h.contains("outlet"))
        .or_else(|| {
            normalized
                .iter()
                .enumerate()
                .position(|(i, h)| i != key && h.contains("name") && !h.contains("store name"))
        })
        .or(if normalized.len() > 1 { Some(if key == 1 { 0 } else { 1 }) } else { None })?;

    Some(ColumnLayout {
        key,
        name,
        area_manager: normalized.iter().position(|h| h.contains("manager")),
        city: normalized.iter().position(|h| h == "city"),
    })
}

pub fn parse_spreadsheet(bytes: &[u8]) -> Result<StoreDirectory, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| SourceError::Unreadable(err.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let layout = match schema_v1_layout(&headers) {
        Some(layout) => layout,
        None => {
            warn!(?headers, "store spreadsheet does not follow schema v1, guessing columns");
            guessed_layout(&headers).ok_or_else(|| {
                SourceError::Unreadable("store spreadsheet has no usable columns".to_string())
            })?
        }
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|err| SourceError::Unreadable(err.to_string()))?;
        let cell = |index: usize| row.get(index).unwrap_or_default().to_string();
        records.push(StoreRecord {
            store_id: cell(layout.key),
            display_name: cell(layout.name),
            area_manager: layout.area_manager.map(cell),
            city: layout.city.map(cell),
        });
    }

    Ok(StoreDirectory::from_records(records))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagementStore {
    #[serde(alias = "store_id", alias = "id")]
    store_id: serde_json::Value,
    #[serde(default, alias = "displayName", alias = "outlet")]
    name: Option<String>,
    #[serde(default)]
    area_manager: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

fn value_to_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub async fn load_spreadsheet(path: &Path) -> Result<StoreDirectory, SourceError> {
    let bytes = read_source(path).await?;
    parse_spreadsheet(&bytes)
}

pub async fn load_management(path: &Path) -> Result<StoreDirectory, SourceError> {
    let stores: Vec<ManagementStore> = load_json(path).await?;
    Ok(StoreDirectory::from_records(stores.into_iter().filter_map(|store| {
        Some(StoreRecord {
            store_id: value_to_id(&store.store_id)?,
            display_name: store.name?,
            area_manager: store.area_manager,
            city: store.city,
        })
    })))
}

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    store_id: String,
    display_name: Option<String>,
    area_manager: Option<String>,
    city: Option<String>,
}

pub async fn load_database(pool: &PgPool) -> Result<StoreDirectory, SourceError> {
    let rows = sqlx::query_as::<_, StoreRow>(
        r#"
        SELECT store_id, display_name, area_manager, city
        FROM stores
        ORDER BY store_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(StoreDirectory::from_records(rows.into_iter().filter_map(|row| {
        Some(StoreRecord {
            store_id: row.store_id,
            display_name: row.display_name?,
            area_manager: row.area_manager,
            city: row.city,
        })
    })))
}

/// Never fails: an unreachable source yields an empty directory.
pub async fn load_or_empty(
    source: DirectorySource,
    spreadsheet_path: &Path,
    management_path: &Path,
    pool: Option<&PgPool>,
) -> (StoreDirectory, Option<String>) {
    let result = match source {
        DirectorySource::Spreadsheet => load_spreadsheet(spreadsheet_path).await,
        DirectorySource::Management => load_management(management_path).await,
        DirectorySource::Database => match pool {
            Some(pool) => load_database(pool).await,
            None => Err(SourceError::NotFound("database not configured".to_string())),
        },
    };

    match result {
        Ok(directory) => (directory, None),
        Err(err) => {
            warn!(source = source.as_str(), "store directory unavailable: {err}");
            (
                StoreDirectory::default(),
                Some(format!("store directory ({}) unavailable: {err}", source.as_str())),
            )
        }
    }
}
