use crate::errors::SourceError;
use serde::de::DeserializeOwned;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Reads a source file; a missing file is reported separately from other I/O failures.
pub async fn read_source(path: &Path) -> Result<Vec<u8>, SourceError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(SourceError::NotFound(path.display().to_string()))
        }
        Err(err) => Err(SourceError::Unreadable(format!("{}: {err}", path.display()))),
    }
}

pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let bytes = read_source(path).await?;
    serde_json::from_slice(&bytes)
        .map_err(|err| SourceError::Unreadable(format!("{}: {err}", path.display())))
}

/// Builds the pool without connecting; connections are opened on first query.
pub fn connect_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        info!("DATABASE_URL not set, sql sources disabled");
        return Ok(None);
    };
    let pool = PgPoolOptions::new().max_connections(5).connect_lazy(url)?;
    Ok(Some(pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("sales_dashboard_storage_{}_{name}", std::process::id()));
        path
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = read_source(&temp_path("missing.json")).await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_unreadable() {
        let path = temp_path("bad.json");
        fs::write(&path, b"{not json").await.unwrap();
        let err = load_json::<HashMap<String, String>>(&path).await.unwrap_err();
        assert!(matches!(err, SourceError::Unreadable(_)));
        let _ = fs::remove_file(&path).await;
    }

    #[test]
    fn no_pool_without_url() {
        assert!(connect_pool(None).unwrap().is_none());
    }
}
