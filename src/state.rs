use crate::config::AppConfig;
use sqlx::PgPool;
use std::sync::Arc;

/// Handles shared by every request. Holds no report data between requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: Option<PgPool>) -> Result<Self, reqwest::Error> {
        let timeout = config
            .d365
            .as_ref()
            .map(|settings| settings.timeout)
            .unwrap_or(std::time::Duration::from_secs(30));
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
            pool,
        })
    }
}
