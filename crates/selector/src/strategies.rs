use std::sync::Arc;

use tracing::debug;

use lucky_core::{
    models::{AssignmentStrategy, EventType, HistoryView, Host},
    traits::HostSelectionStrategy,
    SelectorResult,
};

/// 分配次数最少者优先，不考虑层级和权重
pub struct RoundRobinStrategy;

/// 次数/权重 最小者优先，不考虑层级
pub struct WeightedStrategy;

/// 只在最高优先级层级内按 次数/权重 选择
pub struct PriorityOrderedStrategy;

/// 在候选中找出 次数/权重 最小的主持人
///
/// 比值用整数交叉相乘比较；相同比值保留列表中靠前的主持人。
fn least_loaded<'a, I, W>(candidates: I, history: &HistoryView, weight_of: W) -> Option<&'a Host>
where
    I: IntoIterator<Item = &'a Host>,
    W: Fn(&Host) -> u64,
{
    let mut best: Option<(&'a Host, u128, u128)> = None;

    for host in candidates {
        let count = u128::from(history.count_for(&host.id));
        let weight = u128::from(weight_of(host).max(1));

        let replace = match best {
            None => true,
            Some((_, best_count, best_weight)) => count * best_weight < best_count * weight,
        };
        if replace {
            best = Some((host, count, weight));
        }
    }

    best.map(|(host, _, _)| host)
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RoundRobinStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSelectionStrategy for RoundRobinStrategy {
    fn select_host<'a>(
        &self,
        event_type: &EventType,
        candidates: &'a [Host],
        history: &HistoryView,
    ) -> SelectorResult<Option<&'a Host>> {
        if candidates.is_empty() {
            debug!("事件类型 {} 没有候选主持人", event_type.id);
            return Ok(None);
        }

        let selected = least_loaded(candidates, history, |_| 1);
        if let Some(host) = selected {
            debug!(
                "轮询策略选择主持人: {} (窗口内分配: {}/{})",
                host.id,
                history.count_for(&host.id),
                history.total()
            );
        }

        Ok(selected)
    }

    fn name(&self) -> &str {
        "RoundRobin"
    }
}

impl WeightedStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeightedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSelectionStrategy for WeightedStrategy {
    fn select_host<'a>(
        &self,
        event_type: &EventType,
        candidates: &'a [Host],
        history: &HistoryView,
    ) -> SelectorResult<Option<&'a Host>> {
        if candidates.is_empty() {
            debug!("事件类型 {} 没有候选主持人", event_type.id);
            return Ok(None);
        }

        let selected = least_loaded(candidates, history, |host| u64::from(host.weight));
        if let Some(host) = selected {
            debug!(
                "加权策略选择主持人: {} (分配: {}, 权重: {})",
                host.id,
                history.count_for(&host.id),
                host.weight
            );
        }

        Ok(selected)
    }

    fn name(&self) -> &str {
        "Weighted"
    }
}

impl PriorityOrderedStrategy {
    pub fn new() -> Self {
        Self
    }

    /// 最高优先级（数值最小）层级的主持人，保持原顺序
    pub fn top_tier(candidates: &[Host]) -> Vec<&Host> {
        match candidates.iter().map(|host| host.priority).min() {
            Some(top) => candidates
                .iter()
                .filter(|host| host.priority == top)
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Default for PriorityOrderedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSelectionStrategy for PriorityOrderedStrategy {
    fn select_host<'a>(
        &self,
        event_type: &EventType,
        candidates: &'a [Host],
        history: &HistoryView,
    ) -> SelectorResult<Option<&'a Host>> {
        let tier = Self::top_tier(candidates);
        if tier.is_empty() {
            debug!("事件类型 {} 没有候选主持人", event_type.id);
            return Ok(None);
        }

        let selected = least_loaded(tier.iter().copied(), history, |host| u64::from(host.weight));
        if let Some(host) = selected {
            debug!(
                "优先级策略选择主持人: {} (层级: {}, 层级人数: {}, 分配: {}, 权重: {})",
                host.id,
                host.priority,
                tier.len(),
                history.count_for(&host.id),
                host.weight
            );
        }

        Ok(selected)
    }

    fn name(&self) -> &str {
        "PriorityOrdered"
    }
}

/// 根据事件类型配置的策略返回对应实现
pub fn strategy_for(strategy: AssignmentStrategy) -> Arc<dyn HostSelectionStrategy> {
    match strategy {
        AssignmentStrategy::RoundRobin => Arc::new(RoundRobinStrategy::new()),
        AssignmentStrategy::Weighted => Arc::new(WeightedStrategy::new()),
        AssignmentStrategy::PriorityOrdered => Arc::new(PriorityOrderedStrategy::new()),
    }
}
