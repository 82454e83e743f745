use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    models::{AssignmentRecord, FairnessWindow, NewAssignment},
    SelectorResult,
};

/// 分配历史存储接口
///
/// 只追加的分配日志，可按事件类型和公平窗口查询。任何读写失败都必须以
/// `SelectorError::HistoryUnavailable` 返回，不能当作空历史处理。
#[async_trait]
pub trait AssignmentHistoryStore: Send + Sync {
    /// 查询事件类型在公平窗口内的分配记录，按写入顺序从旧到新
    async fn records_in_window(
        &self,
        event_type_id: &str,
        window: &FairnessWindow,
        now: DateTime<Utc>,
    ) -> SelectorResult<Vec<AssignmentRecord>>;

    /// 追加一条分配记录，返回带存储ID的记录
    async fn append(&self, assignment: &NewAssignment) -> SelectorResult<AssignmentRecord>;

    /// 删除早于cutoff的记录，返回删除条数（仅用于保留策略）
    async fn prune_before(&self, event_type_id: &str, cutoff: DateTime<Utc>)
        -> SelectorResult<u64>;

    /// 只保留最新的keep条记录，返回删除条数（仅用于保留策略）
    async fn prune_keep_latest(&self, event_type_id: &str, keep: u64) -> SelectorResult<u64>;

    /// 存在记录的事件类型ID
    async fn event_type_ids(&self) -> SelectorResult<Vec<String>>;
}
