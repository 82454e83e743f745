use std::collections::HashMap;

use super::assignment::AssignmentRecord;

/// 公平窗口内每个主持人的分配次数，只读快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryView {
    counts: HashMap<String, u64>,
    total: u64,
}

impl HistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[AssignmentRecord]) -> Self {
        let mut view = Self::new();
        for record in records {
            view.record(&record.host_id);
        }
        view
    }

    /// 没有记录的主持人计为0
    pub fn count_for(&self, host_id: &str) -> u64 {
        self.counts.get(host_id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// 计入一次分配
    pub fn record(&mut self, host_id: &str) {
        *self.counts.entry(host_id.to_string()).or_insert(0) += 1;
        self.total += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: i64, host_id: &str) -> AssignmentRecord {
        AssignmentRecord {
            id,
            event_type_id: "demo".to_string(),
            host_id: host_id.to_string(),
            assigned_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_from_records() {
        let view = HistoryView::from_records(&[
            record(1, "alice"),
            record(2, "bob"),
            record(3, "alice"),
        ]);

        assert_eq!(view.count_for("alice"), 2);
        assert_eq!(view.count_for("bob"), 1);
        assert_eq!(view.count_for("carol"), 0);
        assert_eq!(view.total(), 3);
        assert!(!view.is_empty());
        assert!(HistoryView::new().is_empty());
    }
}
