//! Shared test utilities for dbsnap
//!
//! This crate provides common test helpers that can be used across
//! multiple test modules without circular dependencies.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and test identifier generation
//! - [`fake_rds`]: In-memory [`RdsOperations`](dbsnap_rds::RdsOperations) implementation
//! - [`fixtures`]: Snapshot and database builders

pub mod aws;
pub mod fake_rds;
pub mod fixtures;

// Re-export commonly used items
pub use aws::{get_test_region, test_run_id};
pub use fake_rds::{Call, FakeRds};
