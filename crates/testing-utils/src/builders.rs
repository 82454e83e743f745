//! Test data builders for creating test entities

use chrono::{DateTime, Utc};
use lucky_core::{AssignmentStrategy, EventType, FairnessWindow, Host, NewAssignment};

/// Builder for creating test EventType entities
pub struct EventTypeBuilder {
    event_type: EventType,
}

impl EventTypeBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            event_type: EventType::new(id, vec![])
                .with_window(FairnessWindow::TrailingBookings { count: 1000 }),
        }
    }

    /// 追加一位默认优先级、权重为1的主持人
    pub fn with_host(mut self, id: &str) -> Self {
        self.event_type.hosts.push(Host::new(id));
        self
    }

    pub fn with_weighted_host(mut self, id: &str, weight: u32) -> Self {
        self.event_type.hosts.push(Host::new(id).with_weight(weight));
        self
    }

    pub fn with_tiered_host(mut self, id: &str, priority: u32) -> Self {
        self.event_type
            .hosts
            .push(Host::new(id).with_priority(priority));
        self
    }

    pub fn with_window(mut self, window: FairnessWindow) -> Self {
        self.event_type.fairness_window = window;
        self
    }

    pub fn with_strategy(mut self, strategy: AssignmentStrategy) -> Self {
        self.event_type.strategy = strategy;
        self
    }

    pub fn build(self) -> EventType {
        self.event_type
    }
}

/// 以固定时间间隔生成一串历史分配
pub fn assignments_at(
    event_type_id: &str,
    host_ids: &[&str],
    start: DateTime<Utc>,
    step: chrono::TimeDelta,
) -> Vec<NewAssignment> {
    host_ids
        .iter()
        .enumerate()
        .map(|(i, host_id)| {
            NewAssignment::new(event_type_id, *host_id, start + step * i as i32)
        })
        .collect()
}
