use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::host::Host;
use crate::{SelectorError, SelectorResult};

/// 默认公平窗口: 最近30天
pub const DEFAULT_WINDOW_SECONDS: u64 = 30 * 24 * 60 * 60;

/// 分配策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// 忽略层级和权重，分配次数最少者优先
    RoundRobin,
    /// 忽略层级，按 次数/权重 最小者优先
    Weighted,
    /// 先取最高优先级层级，层级内按 次数/权重 最小者优先
    #[default]
    PriorityOrdered,
}

impl AssignmentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStrategy::RoundRobin => "round_robin",
            AssignmentStrategy::Weighted => "weighted",
            AssignmentStrategy::PriorityOrdered => "priority_ordered",
        }
    }
}

impl fmt::Display for AssignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStrategy {
    type Err = SelectorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "round_robin" | "round-robin" => Ok(AssignmentStrategy::RoundRobin),
            "weighted" => Ok(AssignmentStrategy::Weighted),
            "priority_ordered" | "priority-ordered" => Ok(AssignmentStrategy::PriorityOrdered),
            _ => Err(SelectorError::InvalidConfiguration(format!(
                "无效的分配策略: {value}，支持的策略: round_robin, weighted, priority_ordered"
            ))),
        }
    }
}

/// 公平窗口: 衡量负载均衡的历史范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FairnessWindow {
    /// 该事件类型最近的N条分配记录
    TrailingBookings { count: u32 },
    /// 最近一段时间内的分配记录
    TrailingPeriod { seconds: u64 },
}

impl Default for FairnessWindow {
    fn default() -> Self {
        FairnessWindow::TrailingPeriod {
            seconds: DEFAULT_WINDOW_SECONDS,
        }
    }
}

impl FairnessWindow {
    /// 时间窗口的起点；按条数的窗口或超出时间范围时返回None
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            FairnessWindow::TrailingBookings { .. } => None,
            FairnessWindow::TrailingPeriod { seconds } => Self::subtract(now, *seconds, 1),
        }
    }

    /// 按条数的窗口大小
    pub fn max_records(&self) -> Option<usize> {
        match self {
            FairnessWindow::TrailingBookings { count } => Some(*count as usize),
            FairnessWindow::TrailingPeriod { .. } => None,
        }
    }

    /// 保留策略下的时间起点，窗口之前的记录可以删除
    pub fn retention_cutoff(&self, now: DateTime<Utc>, multiplier: u32) -> Option<DateTime<Utc>> {
        match self {
            FairnessWindow::TrailingBookings { .. } => None,
            FairnessWindow::TrailingPeriod { seconds } => {
                Self::subtract(now, *seconds, multiplier)
            }
        }
    }

    /// 保留策略下每个事件类型保留的记录条数
    pub fn retention_keep(&self, multiplier: u32) -> Option<u64> {
        match self {
            FairnessWindow::TrailingBookings { count } => {
                Some(u64::from(*count) * u64::from(multiplier.max(1)))
            }
            FairnessWindow::TrailingPeriod { .. } => None,
        }
    }

    pub fn validate(&self) -> SelectorResult<()> {
        match self {
            FairnessWindow::TrailingBookings { count: 0 } => Err(
                SelectorError::InvalidConfiguration("公平窗口的记录条数必须大于0".to_string()),
            ),
            FairnessWindow::TrailingPeriod { seconds: 0 } => Err(
                SelectorError::InvalidConfiguration("公平窗口的时长必须大于0".to_string()),
            ),
            _ => Ok(()),
        }
    }

    fn subtract(now: DateTime<Utc>, seconds: u64, multiplier: u32) -> Option<DateTime<Utc>> {
        let total = seconds.checked_mul(u64::from(multiplier.max(1)))?;
        let delta = TimeDelta::try_seconds(i64::try_from(total).ok()?)?;
        now.checked_sub_signed(delta)
    }
}

/// 事件类型（可预订的服务）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: String,
    #[serde(default)]
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub fairness_window: FairnessWindow,
    #[serde(default)]
    pub strategy: AssignmentStrategy,
}

impl EventType {
    pub fn new(id: impl Into<String>, hosts: Vec<Host>) -> Self {
        Self {
            id: id.into(),
            hosts,
            fairness_window: FairnessWindow::default(),
            strategy: AssignmentStrategy::default(),
        }
    }

    pub fn with_window(mut self, window: FairnessWindow) -> Self {
        self.fairness_window = window;
        self
    }

    pub fn with_strategy(mut self, strategy: AssignmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn host(&self, host_id: &str) -> Option<&Host> {
        self.hosts.iter().find(|host| host.id == host_id)
    }

    /// 按给定ID顺序解析候选主持人，未知ID视为配置错误
    pub fn candidates_from_ids(&self, host_ids: &[String]) -> SelectorResult<Vec<Host>> {
        host_ids
            .iter()
            .map(|id| {
                self.host(id).cloned().ok_or_else(|| {
                    SelectorError::InvalidConfiguration(format!(
                        "主持人 {id} 不属于事件类型 {}",
                        self.id
                    ))
                })
            })
            .collect()
    }

    pub fn validate(&self) -> SelectorResult<()> {
        if self.id.trim().is_empty() {
            return Err(SelectorError::InvalidConfiguration(
                "事件类型ID不能为空".to_string(),
            ));
        }

        self.fairness_window.validate()?;
        validate_hosts(&self.hosts)
    }
}

/// 校验主持人列表: 每个主持人有效且ID不重复
pub fn validate_hosts(hosts: &[Host]) -> SelectorResult<()> {
    let mut seen = HashSet::with_capacity(hosts.len());
    for host in hosts {
        host.validate()?;
        if !seen.insert(host.id.as_str()) {
            return Err(SelectorError::InvalidConfiguration(format!(
                "主持人ID重复: {}",
                host.id
            )));
        }
    }
    Ok(())
}
