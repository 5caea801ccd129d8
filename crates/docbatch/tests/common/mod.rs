//! Shared test utilities for docbatch integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a controller over an in-memory database
//! - Builders for batch requests and scripted collaborators

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
