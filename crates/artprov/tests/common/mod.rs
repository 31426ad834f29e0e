//! Shared test utilities for artprov integration tests.
//!
//! This module provides:
//! - `TestHarness`, a service over an isolated in-memory store
//! - Builders for catalog rows

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
