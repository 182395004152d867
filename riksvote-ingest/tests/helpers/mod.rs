//! Test Helper Utilities
//!
//! Shared utilities for testing riksvote-ingest

#![allow(dead_code)]

pub mod db_utils;
pub mod fake_upstream;
pub mod fixtures;

// Re-export commonly used items
pub use db_utils::{
    count_rows, create_test_db, create_test_orchestrator, session, test_endpoints, test_settings, TEST_BASE_URL,
};
pub use fake_upstream::FakeUpstream;
