use axum::http::StatusCode;

/// Request-level failure, rendered as a plain-text body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Failures that are not covered by the degrade-and-continue policy.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("malformed sales export {path}: {source}")]
    MalformedExport {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Upstream failures that callers log and degrade on.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("source unreadable: {0}")]
    Unreadable(String),

    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
