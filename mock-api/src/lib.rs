pub mod app;
pub mod article_handlers;
pub mod articles;
pub mod config;
pub mod credentials;
pub mod metrics;
pub mod user_handlers;

pub use app::{build_router, AppState};
