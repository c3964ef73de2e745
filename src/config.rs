use std::{collections::HashMap, env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_D365_TIMEOUT_SECS: u64 = 30;

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub legacy_export_path: PathBuf,
    pub store_spreadsheet_path: PathBuf,
    pub store_management_path: PathBuf,
    pub footfall_path: PathBuf,
    pub d365: Option<D365Config>,
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct D365Config {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(values: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| values.get(key).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let path = |key: &str, default: &str| {
            PathBuf::from(value(key).unwrap_or_else(|| default.to_string()))
        };

        let port = value("PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let d365 = value("D365_BASE_URL").map(|base_url| D365Config {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: value("D365_ACCESS_TOKEN"),
            timeout: Duration::from_secs(
                value("D365_TIMEOUT_SECS")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_D365_TIMEOUT_SECS),
            ),
        });

        Self {
            port,
            legacy_export_path: path("LEGACY_EXPORT_PATH", "data/legacy_sales.json"),
            store_spreadsheet_path: path("STORE_SPREADSHEET_PATH", "data/stores.csv"),
            store_management_path: path("STORE_MANAGEMENT_PATH", "data/stores.json"),
            footfall_path: path("FOOTFALL_PATH", "data/footfall.json"),
            d365,
            database_url: value("DATABASE_URL"),
        }
    }
}
