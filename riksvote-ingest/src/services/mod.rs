//! Service modules for the ingest pipeline

pub mod fetch_client;
pub mod ingest_orchestrator;
pub mod riksdag_client;
pub mod vote_aggregator;

pub use fetch_client::{FetchClient, FetchError, FetchPolicy, HttpTransport, Transport};
pub use ingest_orchestrator::{IngestOrchestrator, ItemOutcome, RunReport, Stage, StageReport};
pub use riksdag_client::RiksdagClient;
pub use vote_aggregator::VoteAggregator;
