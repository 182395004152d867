//! # riksvote common library
//!
//! Shared code for the riksvote ingest pipeline and its read-side consumers:
//! - Error type
//! - Configuration model and resolution
//! - Legislative session labels
//! - Committee lookup table
//! - Vote choices, counts and outcome derivation
//! - Database initialization (schema and indexes)

pub mod committees;
pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod votes;

pub use committees::Committees;
pub use error::{Error, Result};
pub use session::Session;
pub use votes::{Outcome, VoteChoice, VoteCounts};
