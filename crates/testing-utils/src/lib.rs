//! # Scheduler Testing Utils
//!
//! Shared test doubles for the content scheduler workspace: an instrumented
//! task store, an idea generator and a scriptable content pipeline, plus
//! builders for tasks and scheduling configs.
//!
//! ```toml
//! [dev-dependencies]
//! scheduler-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
