//! Database and orchestrator test utilities

use super::FakeUpstream;
use riksvote_common::{Committees, Session};
use riksvote_ingest::db::BulkWrite;
use riksvote_ingest::services::fetch_client::{FetchPolicy, Transport};
use riksvote_ingest::services::riksdag_client::{DocumentKind, Endpoints};
use riksvote_ingest::{IngestOrchestrator, IngestSettings};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_BASE_URL: &str = "http://riksdag.test";

/// Create temporary test database with the schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_url = format!("sqlite://{}?mode=rwc", temp_dir.path().join("test_riksvote.db").display());
    let pool = riksvote_common::db::init_database(&db_url)
        .await
        .expect("init database");
    (temp_dir, pool)
}

/// Settings for one session (2023/24) with no request delay and fast retries
pub fn test_settings() -> IngestSettings {
    IngestSettings {
        database_url: "sqlite::memory:".to_string(),
        api_base_url: TEST_BASE_URL.to_string(),
        sessions: vec![session()],
        document_kinds: vec![DocumentKind::Report, DocumentKind::Motion],
        page_size: 2,
        ballot_page_cap: 10_000,
        fetch: FetchPolicy {
            request_delay: Duration::ZERO,
            max_retries: 1,
            retry_backoff: Duration::ZERO,
            max_pages: 50,
        },
        request_timeout: Duration::from_secs(5),
        bulk: BulkWrite {
            batch_size: 2,
            concurrency: 3,
            max_lock_wait_ms: 2000,
        },
        committees: Committees::builtin(),
        missing_only: false,
        log_level: "debug".to_string(),
    }
}

pub fn session() -> Session {
    "2023/24".parse().expect("valid session")
}

/// Endpoints matching [`test_settings`], for scripting upstream URLs
pub fn test_endpoints() -> Endpoints {
    let settings = test_settings();
    Endpoints::new(TEST_BASE_URL, settings.page_size, settings.ballot_page_cap).expect("valid endpoints")
}

pub fn create_test_orchestrator(
    pool: &SqlitePool,
    settings: IngestSettings,
    upstream: &Arc<FakeUpstream>,
) -> IngestOrchestrator {
    let transport: Arc<dyn Transport> = upstream.clone();
    IngestOrchestrator::with_transport(pool.clone(), settings, transport).expect("orchestrator")
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count rows")
}
