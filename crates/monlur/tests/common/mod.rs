//! Shared test utilities for monlur integration tests.
//!
//! - `TestHarness` owns an isolated workspace root and builds pipelines over it
//! - `ConfigBuilder` creates configurations programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
