pub mod aggregate;
pub mod app;
pub mod config;
pub mod employee;
pub mod era;
pub mod errors;
pub mod footfall;
pub mod handlers;
pub mod models;
pub mod period;
pub mod providers;
pub mod report;
pub mod state;
pub mod storage;
pub mod stores;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::connect_pool;
