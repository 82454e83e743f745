//! 配置管理
//!
//! 加载顺序:
//! 1. 默认值（各结构体的serde默认值）
//! 2. TOML配置文件
//! 3. 环境变量覆盖（前缀 `LUCKY_`，层级分隔符 `__`，如 `LUCKY_SELECTOR__LOCK_TIMEOUT_MS`）

pub mod models;

pub use models::{AppConfig, DatabaseConfig, RetentionConfig, SelectorConfig};
