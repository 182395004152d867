//! Database schema shared by the ingest pipeline and the read side

pub mod init;

pub use init::*;
