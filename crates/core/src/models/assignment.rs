use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 分配记录，创建后不可修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// 由存储分配，单调递增
    pub id: i64,
    pub event_type_id: String,
    pub host_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// 尚未写入存储的分配记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub event_type_id: String,
    pub host_id: String,
    pub assigned_at: DateTime<Utc>,
}

impl NewAssignment {
    pub fn new(
        event_type_id: impl Into<String>,
        host_id: impl Into<String>,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type_id: event_type_id.into(),
            host_id: host_id.into(),
            assigned_at,
        }
    }

    pub fn into_record(self, id: i64) -> AssignmentRecord {
        AssignmentRecord {
            id,
            event_type_id: self.event_type_id,
            host_id: self.host_id,
            assigned_at: self.assigned_at,
        }
    }
}
