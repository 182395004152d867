//! Settings resolution for riksvote-ingest
//!
//! Combines command-line overrides, the environment and the TOML file into
//! one [`IngestSettings`] value built once at startup and passed explicitly
//! to the orchestrator.

use crate::db::BulkWrite;
use crate::services::fetch_client::FetchPolicy;
use crate::services::riksdag_client::DocumentKind;
use chrono::{Datelike, NaiveDate, Utc};
use riksvote_common::config::{resolve_database_url, CompiledDefaults, TomlConfig};
use riksvote_common::{Committees, Error, Result, Session};
use std::time::Duration;
use tracing::info;

/// Values given on the command line, highest priority
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_url: Option<String>,
    pub sessions: Vec<Session>,
    pub request_delay_ms: Option<u64>,
    /// Decision-text pass: skip documents that already have decision points
    pub missing_only: bool,
}

/// Fully resolved pipeline settings
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub database_url: String,
    pub api_base_url: String,
    pub sessions: Vec<Session>,
    pub document_kinds: Vec<DocumentKind>,
    pub page_size: u32,
    pub ballot_page_cap: u32,
    pub fetch: FetchPolicy,
    pub request_timeout: Duration,
    pub bulk: BulkWrite,
    pub committees: Committees,
    pub missing_only: bool,
    pub log_level: String,
}

/// Session in progress on `today`; a new session opens in September
pub fn session_on(today: NaiveDate) -> Result<Session> {
    let year = today.year();
    let start = if today.month() >= 9 { year } else { year - 1 };
    let start = u16::try_from(start).map_err(|_| Error::InvalidInput(format!("Year out of range: {}", start)))?;
    Session::starting(start)
}

fn resolve_sessions(cli: &[Session], toml_config: Option<&TomlConfig>) -> Result<Vec<Session>> {
    if !cli.is_empty() {
        return Ok(normalized(cli.to_vec()));
    }

    if let Some(labels) = toml_config.and_then(|c| c.sessions.as_ref()) {
        let sessions = labels
            .iter()
            .map(|label| label.parse())
            .collect::<Result<Vec<Session>>>()?;
        if !sessions.is_empty() {
            return Ok(normalized(sessions));
        }
    }

    let current = session_on(Utc::now().date_naive())?;
    let first = toml_config.and_then(|c| c.first_session_year);
    let last = toml_config.and_then(|c| c.last_session_year);

    match (first, last) {
        (None, None) => Ok(vec![current]),
        (first, last) => {
            let last = last.unwrap_or(current.start_year());
            Session::range(first.unwrap_or(last), last)
        }
    }
}

fn normalized(mut sessions: Vec<Session>) -> Vec<Session> {
    sessions.sort();
    sessions.dedup();
    sessions
}

/// Resolve every setting: CLI → environment → TOML → compiled default
pub fn resolve_settings(cli: &CliOverrides, toml_config: Option<&TomlConfig>) -> Result<IngestSettings> {
    let defaults = CompiledDefaults::for_current_platform();
    let toml = toml_config.cloned().unwrap_or_default();

    let database_url = resolve_database_url(cli.database_url.as_deref(), toml_config);
    let sessions = resolve_sessions(&cli.sessions, toml_config)?;

    let document_kinds: Vec<DocumentKind> = toml
        .document_kinds
        .unwrap_or(defaults.document_kinds)
        .iter()
        .map(|code| DocumentKind::from_code(code))
        .collect();
    if document_kinds.is_empty() {
        return Err(Error::Config("document_kinds must not be empty".to_string()));
    }

    let request_delay_ms = cli
        .request_delay_ms
        .or(toml.request_delay_ms)
        .unwrap_or(defaults.request_delay_ms);

    let settings = IngestSettings {
        database_url,
        api_base_url: toml.api_base_url.unwrap_or(defaults.api_base_url),
        sessions,
        document_kinds,
        page_size: toml.page_size.unwrap_or(defaults.page_size),
        ballot_page_cap: toml.ballot_page_cap.unwrap_or(defaults.ballot_page_cap),
        fetch: FetchPolicy {
            request_delay: Duration::from_millis(request_delay_ms),
            max_retries: toml.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff: Duration::from_millis(toml.retry_backoff_ms.unwrap_or(defaults.retry_backoff_ms)),
            max_pages: toml.max_pages.unwrap_or(defaults.max_pages),
        },
        request_timeout: Duration::from_secs(toml.request_timeout_secs.unwrap_or(defaults.request_timeout_secs)),
        bulk: BulkWrite {
            batch_size: toml.flush_batch_size.unwrap_or(defaults.flush_batch_size),
            concurrency: toml.flush_concurrency.unwrap_or(defaults.flush_concurrency),
            max_lock_wait_ms: toml.db_max_lock_wait_ms.unwrap_or(defaults.db_max_lock_wait_ms),
        },
        committees: Committees::with_overrides(toml.committees),
        missing_only: cli.missing_only,
        log_level: toml.logging.level.unwrap_or(defaults.log_level),
    };

    info!(
        sessions = settings.sessions.len(),
        kinds = settings.document_kinds.len(),
        request_delay_ms,
        "Resolved ingest settings"
    );

    Ok(settings)
}
