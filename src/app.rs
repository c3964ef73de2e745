use crate::handlers;
use crate::state::AppState;
use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/sales", get(handlers::get_sales))
        .route("/api/stores", get(handlers::get_stores))
        .route("/api/employees", get(handlers::get_employees))
        .layer(cors)
        .with_state(state)
}
