//! Mock implementation of the assignment history store
//!
//! Wraps the in-memory store and lets tests inject read delays (to widen the
//! window between reading history and appending) and storage failures.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lucky_core::{
    AssignmentHistoryStore, AssignmentRecord, FairnessWindow, NewAssignment, SelectorError,
    SelectorResult,
};
use lucky_infrastructure::InMemoryHistoryStore;

#[derive(Debug, Default)]
pub struct MockAssignmentHistoryStore {
    inner: InMemoryHistoryStore,
    read_delay_ms: AtomicU64,
    fail_reads: AtomicBool,
    fail_appends: AtomicBool,
    read_calls: AtomicUsize,
    append_calls: AtomicUsize,
}

impl MockAssignmentHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置历史，不计入append调用次数
    pub async fn with_records(assignments: Vec<NewAssignment>) -> Self {
        let store = Self::new();
        for assignment in &assignments {
            store
                .inner
                .append(assignment)
                .await
                .expect("in-memory append cannot fail");
        }
        store
    }

    /// 每次读取历史前等待，模拟慢存储
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<AssignmentRecord> {
        self.inner.snapshot().await
    }

    pub async fn count(&self) -> usize {
        self.inner.len().await
    }

    pub async fn count_for(&self, host_id: &str) -> usize {
        self.records()
            .await
            .iter()
            .filter(|r| r.host_id == host_id)
            .count()
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssignmentHistoryStore for MockAssignmentHistoryStore {
    async fn records_in_window(
        &self,
        event_type_id: &str,
        window: &FairnessWindow,
        now: DateTime<Utc>,
    ) -> SelectorResult<Vec<AssignmentRecord>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        let delay_ms = self.read_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SelectorError::history_unavailable(
                "读取分配历史",
                "mock read failure",
            ));
        }

        self.inner.records_in_window(event_type_id, window, now).await
    }

    async fn append(&self, assignment: &NewAssignment) -> SelectorResult<AssignmentRecord> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(SelectorError::history_unavailable(
                "追加分配记录",
                "mock append failure",
            ));
        }

        self.inner.append(assignment).await
    }

    async fn prune_before(
        &self,
        event_type_id: &str,
        cutoff: DateTime<Utc>,
    ) -> SelectorResult<u64> {
        self.inner.prune_before(event_type_id, cutoff).await
    }

    async fn prune_keep_latest(&self, event_type_id: &str, keep: u64) -> SelectorResult<u64> {
        self.inner.prune_keep_latest(event_type_id, keep).await
    }

    async fn event_type_ids(&self) -> SelectorResult<Vec<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SelectorError::history_unavailable(
                "查询事件类型",
                "mock read failure",
            ));
        }

        self.inner.event_type_ids().await
    }
}
