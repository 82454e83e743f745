use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::log_level::LogLevel;
use crate::{SelectorError, SelectorResult};

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = SelectorError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(SelectorError::InvalidConfiguration(format!(
                "不支持的日志格式: {format}"
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    /// 额外的EnvFilter指令，例如 "sqlx=warn"
    #[serde(default)]
    pub directives: Vec<String>,
}

impl LogConfig {
    /// 组合成EnvFilter使用的过滤字符串
    pub fn filter_directive(&self) -> String {
        std::iter::once(self.log_level.as_filter().to_string())
            .chain(self.directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn validate(&self) -> SelectorResult<()> {
        if let Some(directive) = self.directives.iter().find(|d| d.trim().is_empty()) {
            return Err(SelectorError::InvalidConfiguration(format!(
                "日志过滤指令不能为空: {directive:?}"
            )));
        }
        Ok(())
    }
}
