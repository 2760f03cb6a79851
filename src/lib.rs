pub mod app;
pub mod cache;
pub mod checklist;
pub mod config;
pub mod errors;
pub mod habits;
pub mod handlers;
pub mod remote;
pub mod session;
pub mod state;
pub mod storage;
pub mod tooltip;
pub mod ui;
pub mod views;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
