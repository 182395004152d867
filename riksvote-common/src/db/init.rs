//! Database initialization
//!
//! Opens (creating if needed) the SQLite store and creates the seven pipeline
//! tables plus the indexes the presentation layer filters and sorts on.
//! Every statement is `IF NOT EXISTS`, so initialization is safe to repeat
//! on every run.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Tables created by [`create_schema`], parents before children
pub const TABLES: &[&str] = &[
    "members",
    "documents",
    "motions",
    "voting_events",
    "proposals",
    "vote_records",
    "party_vote_summaries",
];

/// Open the store at `database_url` and ensure the schema exists
///
/// Foreign keys, WAL journaling and the busy timeout are applied per
/// connection through the connect options, so every pooled connection
/// carries them.
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    ensure_parent_dir(database_url)?;

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(250));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    info!("Opened database: {}", database_url);

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_members_table(pool).await?;
    create_documents_table(pool).await?;
    create_motions_table(pool).await?;
    create_voting_events_table(pool).await?;
    create_proposals_table(pool).await?;
    create_vote_records_table(pool).await?;
    create_party_vote_summaries_table(pool).await?;
    create_indexes(pool).await?;

    info!("Database schema initialized ({} tables)", TABLES.len());
    Ok(())
}

fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            debug!("Ensuring database directory exists: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

async fn create_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            member_id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL DEFAULT '',
            party TEXT NOT NULL DEFAULT '',
            constituency TEXT NOT NULL DEFAULT '',
            birth_year INTEGER,
            gender TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT '',
            image_url TEXT NOT NULL DEFAULT '',
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            document_id TEXT PRIMARY KEY,
            designation TEXT NOT NULL DEFAULT '',
            session TEXT NOT NULL,
            committee_code TEXT,
            title TEXT NOT NULL DEFAULT '',
            subtitle TEXT NOT NULL DEFAULT '',
            decision_date TEXT,
            published_date TEXT,
            doc_type TEXT NOT NULL,
            subtype TEXT NOT NULL DEFAULT '',
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Motions and government propositions
///
/// `resolved_by_document_id` is filled once by the cross-document linker and
/// never overwritten afterwards.
async fn create_motions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS motions (
            document_id TEXT PRIMARY KEY,
            designation TEXT NOT NULL DEFAULT '',
            session TEXT NOT NULL,
            doc_type TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            authors TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            published_date TEXT,
            resolved_by_document_id TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_voting_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voting_events (
            voting_event_id TEXT PRIMARY KEY,
            designation TEXT NOT NULL,
            session TEXT NOT NULL,
            point INTEGER,
            committee_code TEXT,
            decision_label TEXT,
            yes_count INTEGER NOT NULL DEFAULT 0,
            no_count INTEGER NOT NULL DEFAULT 0,
            abstain_count INTEGER NOT NULL DEFAULT 0,
            absent_count INTEGER NOT NULL DEFAULT 0,
            vote_date TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Decision points inside a report
///
/// `voting_event_id` has no foreign key: decision points are stored even when
/// the referenced voting event was never aggregated.
async fn create_proposals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS proposals (
            document_id TEXT NOT NULL,
            point INTEGER NOT NULL,
            label TEXT NOT NULL DEFAULT '',
            decision_text TEXT NOT NULL DEFAULT '',
            decision_kind TEXT NOT NULL DEFAULT '',
            voting_event_id TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (document_id, point)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Individual ballots
///
/// No foreign key to voting_events: ballots are persisted while a report is
/// processed, the parent voting events only when the aggregator flushes.
async fn create_vote_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vote_records (
            voting_event_id TEXT NOT NULL,
            member_id TEXT NOT NULL,
            choice TEXT NOT NULL CHECK (choice IN ('yes', 'no', 'abstain', 'absent')),
            party TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (voting_event_id, member_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_party_vote_summaries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS party_vote_summaries (
            party TEXT NOT NULL,
            voting_event_id TEXT NOT NULL REFERENCES voting_events(voting_event_id) ON DELETE CASCADE,
            yes_count INTEGER NOT NULL DEFAULT 0,
            no_count INTEGER NOT NULL DEFAULT 0,
            abstain_count INTEGER NOT NULL DEFAULT 0,
            absent_count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (party, voting_event_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    const INDEXES: &[&str] = &[
        "CREATE INDEX IF NOT EXISTS idx_members_party ON members(party)",
        "CREATE INDEX IF NOT EXISTS idx_documents_session ON documents(session)",
        "CREATE INDEX IF NOT EXISTS idx_documents_committee ON documents(committee_code)",
        "CREATE INDEX IF NOT EXISTS idx_documents_decision_date ON documents(decision_date)",
        "CREATE INDEX IF NOT EXISTS idx_documents_type_session ON documents(doc_type, session)",
        "CREATE INDEX IF NOT EXISTS idx_motions_session ON motions(session)",
        "CREATE INDEX IF NOT EXISTS idx_motions_resolved_by ON motions(resolved_by_document_id)",
        "CREATE INDEX IF NOT EXISTS idx_voting_events_session ON voting_events(session)",
        "CREATE INDEX IF NOT EXISTS idx_voting_events_committee ON voting_events(committee_code)",
        "CREATE INDEX IF NOT EXISTS idx_voting_events_date ON voting_events(vote_date)",
        "CREATE INDEX IF NOT EXISTS idx_voting_events_lower_id ON voting_events(lower(voting_event_id))",
        "CREATE INDEX IF NOT EXISTS idx_proposals_voting_event ON proposals(voting_event_id)",
        "CREATE INDEX IF NOT EXISTS idx_vote_records_member ON vote_records(member_id)",
        "CREATE INDEX IF NOT EXISTS idx_party_summaries_party ON party_vote_summaries(party)",
        "CREATE INDEX IF NOT EXISTS idx_party_summaries_event ON party_vote_summaries(voting_event_id)",
    ];

    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
