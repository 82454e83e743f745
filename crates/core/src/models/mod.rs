//! # 数据模型
//!
//! 定义主持人分配的核心数据结构。
//!
//! ### Host - 主持人
//! 可以接受预订的人，带有优先级层级和权重。当前分配数量不存储在主持人上，
//! 而是从分配历史中按公平窗口统计得出。
//!
//! ### EventType - 事件类型
//! 可预订的服务，包含有序的主持人列表、公平窗口和分配策略。
//!
//! ### AssignmentRecord - 分配记录
//! 每次成功选择产生一条，创建后不可修改，构成只追加的公平历史。
//!
//! ### HistoryView - 历史视图
//! 单次选择时从窗口内记录统计出的各主持人分配次数。

pub mod assignment;
pub mod event_type;
pub mod history;
pub mod host;

pub use assignment::{AssignmentRecord, NewAssignment};
pub use event_type::{validate_hosts, AssignmentStrategy, EventType, FairnessWindow};
pub use history::HistoryView;
pub use host::Host;
