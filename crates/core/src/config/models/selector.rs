use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_lock_timeout_ms() -> u64 {
    500
}

fn default_retention_enabled() -> bool {
    true
}

fn default_interval_seconds() -> u64 {
    3600
}

fn default_retention_multiplier() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// 获取事件类型锁的最长等待时间
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl SelectorConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(anyhow::anyhow!("锁等待超时必须大于0"));
        }
        Ok(())
    }
}

/// 分配记录保留配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_enabled")]
    pub enabled: bool,
    /// 定期清理间隔（秒）
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// 保留公平窗口几倍的历史
    #[serde(default = "default_retention_multiplier")]
    pub retention_multiplier: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: default_retention_enabled(),
            interval_seconds: default_interval_seconds(),
            retention_multiplier: default_retention_multiplier(),
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_seconds == 0 {
            return Err(anyhow::anyhow!("清理间隔必须大于0"));
        }

        if self.retention_multiplier == 0 {
            return Err(anyhow::anyhow!("保留倍数必须大于0"));
        }

        Ok(())
    }
}
