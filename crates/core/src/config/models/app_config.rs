use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::{
    database::DatabaseConfig,
    selector::{RetentionConfig, SelectorConfig},
};
use crate::{logging::LogConfig, models::EventType, SelectorError, SelectorResult};

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/lucky-user.toml",
    "lucky-user.toml",
    "/etc/lucky-user/config.toml",
];

/// System configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub observability: LogConfig,
    #[serde(default)]
    pub event_types: Vec<EventType>,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: LUCKY_)
    ///
    /// An explicit `config_path` must exist; without one the default paths are
    /// tried and a missing file falls back to defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("LUCKY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate().context("数据库配置验证失败")?;
        self.selector.validate().context("选择器配置验证失败")?;
        self.retention.validate().context("保留策略配置验证失败")?;
        self.observability
            .validate()
            .context("可观测性配置验证失败")?;

        let mut ids = HashSet::new();
        for event_type in &self.event_types {
            event_type
                .validate()
                .with_context(|| format!("事件类型配置验证失败: {}", event_type.id))?;
            if !ids.insert(event_type.id.as_str()) {
                return Err(anyhow::anyhow!("事件类型ID重复: {}", event_type.id));
            }
        }

        Ok(())
    }

    pub fn event_type(&self, id: &str) -> SelectorResult<&EventType> {
        self.event_types
            .iter()
            .find(|event_type| event_type.id == id)
            .ok_or_else(|| SelectorError::EventTypeNotFound { id: id.to_string() })
    }
}
