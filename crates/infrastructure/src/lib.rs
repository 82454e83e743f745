pub mod database;
pub mod in_memory_history;

pub use database::*;
pub use in_memory_history::InMemoryHistoryStore;
