//! # Lucky User Testing Utils
//!
//! Shared testing utilities for the host selector workspace: an in-memory
//! history store with delay and failure injection, and builders for test data.
//!
//! ```toml
//! [dev-dependencies]
//! lucky-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
