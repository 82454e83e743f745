pub mod history_store;
pub mod strategy;

pub use history_store::*;
pub use strategy::*;
