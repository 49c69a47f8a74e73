pub mod analytics;
pub mod app;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod export;
pub mod geo;
pub mod handlers;
pub mod images;
pub mod models;
pub mod records;
pub mod remote;
pub mod state;
pub mod storage;
pub mod tracking;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::LocalStore;
