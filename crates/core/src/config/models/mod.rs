pub mod app_config;
pub mod database;
pub mod selector;

pub use app_config::AppConfig;
pub use database::DatabaseConfig;
pub use selector::{RetentionConfig, SelectorConfig};
