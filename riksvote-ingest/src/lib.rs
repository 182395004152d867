//! riksvote-ingest library interface
//!
//! Exposes the pipeline stages, store operations and fetch client for the
//! binary and for integration testing.

pub mod config;
pub mod db;
pub mod services;
pub mod utils;

pub use config::{resolve_settings, CliOverrides, IngestSettings};
pub use services::{IngestOrchestrator, Stage};
