use crate::{
    models::{EventType, HistoryView, Host},
    SelectorResult,
};

/// 主持人选择策略接口
///
/// 策略是纯函数: 相同的事件类型、候选列表和历史视图必须返回相同的主持人。
pub trait HostSelectionStrategy: Send + Sync {
    /// 从候选主持人中选择一个，没有合适的返回None
    fn select_host<'a>(
        &self,
        event_type: &EventType,
        candidates: &'a [Host],
        history: &HistoryView,
    ) -> SelectorResult<Option<&'a Host>>;

    /// 获取策略名称
    fn name(&self) -> &str;
}
