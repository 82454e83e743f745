pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod traits;

pub use self::config::{AppConfig, DatabaseConfig, RetentionConfig, SelectorConfig};
pub use errors::SelectorError;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{
    AssignmentRecord, AssignmentStrategy, EventType, FairnessWindow, HistoryView, Host,
    NewAssignment,
};
pub use traits::{AssignmentHistoryStore, HostSelectionStrategy};

/// 统一的Result类型
pub type SelectorResult<T> = std::result::Result<T, SelectorError>;
