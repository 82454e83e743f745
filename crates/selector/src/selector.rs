use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use lucky_core::{
    models::{validate_hosts, AssignmentRecord, EventType, HistoryView, Host, NewAssignment},
    traits::AssignmentHistoryStore,
    SelectorConfig, SelectorError, SelectorResult,
};

use crate::{keyed_lock::KeyedLock, strategies::strategy_for};

/// 一次成功的分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub host: Host,
    pub record: AssignmentRecord,
}

/// 主持人在当前公平窗口内的负载
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostLoad {
    pub host_id: String,
    pub priority: u32,
    pub weight: u32,
    pub count: u64,
}

/// 纯决策: 按事件类型的策略从候选中选出主持人，不读写历史
pub fn decide<'a>(
    event_type: &EventType,
    candidates: &'a [Host],
    history: &HistoryView,
) -> SelectorResult<&'a Host> {
    let strategy = strategy_for(event_type.strategy);
    strategy
        .select_host(event_type, candidates, history)?
        .ok_or_else(|| SelectorError::NoEligibleHost {
            event_type_id: event_type.id.clone(),
        })
}

/// 幸运用户选择服务
///
/// 同一事件类型的选择通过键锁串行执行: 从读取窗口内历史到追加分配记录期间持有锁，
/// 因此并发请求不会基于同一份快照选中同一位主持人。
pub struct HostSelector {
    history: Arc<dyn AssignmentHistoryStore>,
    locks: KeyedLock,
    lock_timeout: Duration,
}

impl HostSelector {
    pub fn new(history: Arc<dyn AssignmentHistoryStore>, config: &SelectorConfig) -> Self {
        Self {
            history,
            locks: KeyedLock::new(),
            lock_timeout: config.lock_timeout(),
        }
    }

    /// 与其他组件（如保留服务）共享的键锁
    pub fn locks(&self) -> KeyedLock {
        self.locks.clone()
    }

    pub fn history(&self) -> Arc<dyn AssignmentHistoryStore> {
        Arc::clone(&self.history)
    }

    /// 以获得锁之后的当前时间作为窗口终点和记录时间
    pub async fn select_host(
        &self,
        event_type: &EventType,
        candidates: &[Host],
    ) -> SelectorResult<Selection> {
        self.select_with_metrics(event_type, candidates, None).await
    }

    /// 以指定时间作为窗口终点和记录时间执行一次选择
    pub async fn select_host_at(
        &self,
        event_type: &EventType,
        candidates: &[Host],
        now: DateTime<Utc>,
    ) -> SelectorResult<Selection> {
        self.select_with_metrics(event_type, candidates, Some(now)).await
    }

    #[instrument(skip(self, event_type, candidates, now), fields(
        event_type_id = %event_type.id,
        strategy = %event_type.strategy,
        candidates = candidates.len(),
    ))]
    async fn select_with_metrics(
        &self,
        event_type: &EventType,
        candidates: &[Host],
        now: Option<DateTime<Utc>>,
    ) -> SelectorResult<Selection> {
        let result = self.try_select(event_type, candidates, now).await;

        match &result {
            Ok(selection) => {
                counter!(
                    "lucky_user_selections_total",
                    "event_type" => event_type.id.clone(),
                    "host" => selection.host.id.clone()
                )
                .increment(1);
            }
            Err(e) => {
                counter!(
                    "lucky_user_selection_failures_total",
                    "event_type" => event_type.id.clone(),
                    "reason" => e.kind()
                )
                .increment(1);
            }
        }

        result
    }

    async fn try_select(
        &self,
        event_type: &EventType,
        candidates: &[Host],
        now: Option<DateTime<Utc>>,
    ) -> SelectorResult<Selection> {
        event_type.validate()?;
        validate_hosts(candidates)?;

        if candidates.is_empty() {
            warn!("事件类型 {} 没有可用的候选主持人", event_type.id);
            return Err(SelectorError::NoEligibleHost {
                event_type_id: event_type.id.clone(),
            });
        }

        let started = Instant::now();
        let _guard = self.locks.acquire(&event_type.id, self.lock_timeout).await?;
        histogram!("lucky_user_lock_wait_seconds").record(started.elapsed().as_secs_f64());

        // 持锁后取时间，保证同一事件类型的记录时间单调
        let now = now.unwrap_or_else(Utc::now);

        let records = self
            .history
            .records_in_window(&event_type.id, &event_type.fairness_window, now)
            .await?;
        let view = HistoryView::from_records(&records);
        debug!(
            "事件类型 {} 窗口内共有 {} 条分配记录",
            event_type.id,
            view.total()
        );

        let host = decide(event_type, candidates, &view)?.clone();

        let record = self
            .history
            .append(&NewAssignment::new(event_type.id.as_str(), host.id.as_str(), now))
            .await?;

        info!(
            "为事件类型 {} 分配主持人: {} (记录ID: {}, 此前窗口内分配: {})",
            event_type.id,
            host.id,
            record.id,
            view.count_for(&host.id)
        );

        Ok(Selection { host, record })
    }

    /// 事件类型所有主持人在当前窗口内的分配次数，按主持人列表顺序
    pub async fn distribution(&self, event_type: &EventType) -> SelectorResult<Vec<HostLoad>> {
        self.distribution_at(event_type, Utc::now()).await
    }

    pub async fn distribution_at(
        &self,
        event_type: &EventType,
        now: DateTime<Utc>,
    ) -> SelectorResult<Vec<HostLoad>> {
        event_type.validate()?;

        let records = self
            .history
            .records_in_window(&event_type.id, &event_type.fairness_window, now)
            .await?;
        let view = HistoryView::from_records(&records);

        Ok(event_type
            .hosts
            .iter()
            .map(|host| HostLoad {
                host_id: host.id.clone(),
                priority: host.priority,
                weight: host.weight,
                count: view.count_for(&host.id),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucky_core::FairnessWindow;

    #[test]
    fn test_decide_is_deterministic() {
        let hosts = vec![
            Host::new("alice").with_weight(2),
            Host::new("bob"),
            Host::new("carol").with_priority(1),
        ];
        let event_type = EventType::new("demo", hosts.clone());
        let mut view = HistoryView::new();
        view.record("alice");
        view.record("bob");

        let first = decide(&event_type, &hosts, &view).unwrap().id.clone();
        for _ in 0..10 {
            assert_eq!(decide(&event_type, &hosts, &view).unwrap().id, first);
        }
        assert_eq!(first, "alice");
    }

    #[test]
    fn test_decide_without_candidates() {
        let event_type = EventType::new("demo", vec![])
            .with_window(FairnessWindow::TrailingBookings { count: 5 });
        let err = decide(&event_type, &[], &HistoryView::new()).unwrap_err();
        assert!(matches!(
            err,
            SelectorError::NoEligibleHost { event_type_id } if event_type_id == "demo"
        ));
    }
}
