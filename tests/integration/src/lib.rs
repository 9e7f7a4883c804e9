//! Integration test utilities for the lease pool
//!
//! This crate provides an in-memory connector for exercising the lease
//! manager under concurrency, and helpers for tests against a live Redis.

pub mod fixtures;

pub use fixtures::*;
pub use helpers::*;
