//! 主持人选择服务
//!
//! 按事件类型串行化的"幸运用户"分配: 读取公平窗口内的分配历史，
//! 由策略选出一位主持人，并在返回前追加分配记录。

pub mod keyed_lock;
pub mod retention;
pub mod selector;
pub mod strategies;


pub use keyed_lock::{KeyedLock, KeyedLockGuard};
pub use retention::{RetentionService, RetentionStats};
pub use selector::{decide, HostLoad, HostSelector, Selection};
pub use strategies::*;
