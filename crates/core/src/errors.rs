use thiserror::Error;

/// 主持人选择错误类型定义
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("没有可分配的主持人: 事件类型 {event_type_id}")]
    NoEligibleHost { event_type_id: String },

    #[error("获取事件类型锁超时: {event_type_id} (等待 {waited_ms}ms)")]
    LockTimeout { event_type_id: String, waited_ms: u64 },

    #[error("分配历史不可用: {0}")]
    HistoryUnavailable(String),

    #[error("事件类型未找到: {id}")]
    EventTypeNotFound { id: String },

    #[error("配置错误: {0}")]
    InvalidConfiguration(String),

    #[error("序列化错误: {0}")]
    Serialization(String),
}

impl SelectorError {
    /// 存储层失败统一转换为HistoryUnavailable，保留操作描述
    pub fn history_unavailable(operation: &str, err: impl std::fmt::Display) -> Self {
        SelectorError::HistoryUnavailable(format!("{operation}: {err}"))
    }

    /// 调用方可以重试整个预订流程的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SelectorError::LockTimeout { .. } | SelectorError::HistoryUnavailable(_)
        )
    }

    /// 用于指标标签的简短错误名
    pub fn kind(&self) -> &'static str {
        match self {
            SelectorError::NoEligibleHost { .. } => "no_eligible_host",
            SelectorError::LockTimeout { .. } => "lock_timeout",
            SelectorError::HistoryUnavailable(_) => "history_unavailable",
            SelectorError::EventTypeNotFound { .. } => "event_type_not_found",
            SelectorError::InvalidConfiguration(_) => "invalid_configuration",
            SelectorError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for SelectorError {
    fn from(err: serde_json::Error) -> Self {
        SelectorError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SelectorError::LockTimeout {
            event_type_id: "intro-call".to_string(),
            waited_ms: 500,
        }
        .is_retryable());
        assert!(SelectorError::history_unavailable("读取分配历史", "connection reset").is_retryable());
        assert!(!SelectorError::NoEligibleHost {
            event_type_id: "intro-call".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_history_unavailable_keeps_operation() {
        let err = SelectorError::history_unavailable("追加分配记录", "disk full");
        assert_eq!(err.to_string(), "分配历史不可用: 追加分配记录: disk full");
        assert_eq!(err.kind(), "history_unavailable");
    }
}
