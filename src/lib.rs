pub mod app;
pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod intake;
pub mod models;
pub mod notify;
pub mod state;
pub mod storage;
pub mod ui;
pub mod widget;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::Store;
