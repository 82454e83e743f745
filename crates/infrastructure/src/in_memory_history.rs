//! 内存分配历史
//!
//! 进程内的只追加日志，按事件类型分组。用于嵌入式运行和测试，进程退出后数据丢失。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use lucky_core::{
    AssignmentHistoryStore, AssignmentRecord, FairnessWindow, NewAssignment, SelectorResult,
};

#[derive(Debug, Default)]
struct HistoryState {
    next_id: i64,
    by_event_type: HashMap<String, Vec<AssignmentRecord>>,
}

#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    state: RwLock<HistoryState>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前所有事件类型的记录总数
    pub async fn len(&self) -> usize {
        self.state
            .read()
            .await
            .by_event_type
            .values()
            .map(Vec::len)
            .sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 所有记录，按ID升序
    pub async fn snapshot(&self) -> Vec<AssignmentRecord> {
        let state = self.state.read().await;
        let mut records: Vec<AssignmentRecord> =
            state.by_event_type.values().flatten().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }
}

#[async_trait]
impl AssignmentHistoryStore for InMemoryHistoryStore {
    async fn records_in_window(
        &self,
        event_type_id: &str,
        window: &FairnessWindow,
        now: DateTime<Utc>,
    ) -> SelectorResult<Vec<AssignmentRecord>> {
        let state = self.state.read().await;
        let Some(records) = state.by_event_type.get(event_type_id) else {
            return Ok(Vec::new());
        };

        let cutoff = window.cutoff(now);
        let mut matching: Vec<AssignmentRecord> = records
            .iter()
            .filter(|r| cutoff.map_or(true, |cutoff| r.assigned_at >= cutoff))
            .cloned()
            .collect();

        if let Some(max) = window.max_records() {
            let skip = matching.len().saturating_sub(max);
            matching.drain(..skip);
        }

        Ok(matching)
    }

    async fn append(&self, assignment: &NewAssignment) -> SelectorResult<AssignmentRecord> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let record = assignment.clone().into_record(state.next_id);

        state
            .by_event_type
            .entry(record.event_type_id.clone())
            .or_default()
            .push(record.clone());

        debug!(
            "追加分配记录: {} -> {} (ID: {})",
            record.event_type_id, record.host_id, record.id
        );
        Ok(record)
    }

    async fn prune_before(
        &self,
        event_type_id: &str,
        cutoff: DateTime<Utc>,
    ) -> SelectorResult<u64> {
        let mut state = self.state.write().await;
        let Some(records) = state.by_event_type.get_mut(event_type_id) else {
            return Ok(0);
        };

        let before = records.len();
        records.retain(|r| r.assigned_at >= cutoff);
        Ok((before - records.len()) as u64)
    }

    async fn prune_keep_latest(&self, event_type_id: &str, keep: u64) -> SelectorResult<u64> {
        let mut state = self.state.write().await;
        let Some(records) = state.by_event_type.get_mut(event_type_id) else {
            return Ok(0);
        };

        let excess = records
            .len()
            .saturating_sub(usize::try_from(keep).unwrap_or(usize::MAX));
        records.drain(..excess);
        Ok(excess as u64)
    }

    async fn event_type_ids(&self) -> SelectorResult<Vec<String>> {
        let state = self.state.read().await;
        let mut ids: Vec<String> = state
            .by_event_type
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
