use serde::{Deserialize, Serialize};

use crate::{SelectorError, SelectorResult};

fn default_weight() -> u32 {
    1
}

/// 主持人信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    /// 优先级层级，数值越小越先被调度
    #[serde(default)]
    pub priority: u32,
    /// 同一层级内的相对分配份额
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Host {
    /// 创建默认优先级、权重为1的主持人
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            weight: default_weight(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn validate(&self) -> SelectorResult<()> {
        if self.id.trim().is_empty() {
            return Err(SelectorError::InvalidConfiguration(
                "主持人ID不能为空".to_string(),
            ));
        }

        if self.weight == 0 {
            return Err(SelectorError::InvalidConfiguration(format!(
                "主持人 {} 的权重必须大于0",
                self.id
            )));
        }

        Ok(())
    }
}
