//! Store operations for riksvote-ingest
//!
//! Every entity writes through the same [`Upsert`] contract, keyed by its
//! natural identifier, so any stage can be re-run against existing state
//! without duplicating rows.

pub mod consistency;
pub mod documents;
pub mod members;
pub mod motions;
pub mod party_summaries;
pub mod proposals;
pub mod vote_records;
pub mod voting_events;

use crate::utils::retry_on_lock;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use riksvote_common::Result;
use sqlx::{SqliteConnection, SqlitePool};

/// Idempotent insert-or-update keyed by the entity's natural key
#[async_trait]
pub trait Upsert: Send + Sync {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()>;
}

/// Upsert a single row
pub async fn upsert_one<T: Upsert>(pool: &SqlitePool, row: &T) -> Result<()> {
    let mut conn = pool.acquire().await?;
    row.upsert(&mut *conn).await
}

/// Upsert rows in one transaction
pub async fn upsert_batch<T: Upsert>(pool: &SqlitePool, rows: &[T]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for row in rows {
        row.upsert(&mut *tx).await?;
    }
    tx.commit().await?;

    Ok(rows.len())
}

/// Write settings for bulk upserts
#[derive(Debug, Clone, Copy)]
pub struct BulkWrite {
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_lock_wait_ms: u64,
}

impl Default for BulkWrite {
    fn default() -> Self {
        Self {
            batch_size: 500,
            concurrency: 5,
            max_lock_wait_ms: 5000,
        }
    }
}

/// Upsert rows in chunked transactions, up to `concurrency` in flight
///
/// Returns once every chunk has committed, so callers can sequence dependent
/// tables by awaiting the parent table first.
pub async fn upsert_concurrent<T: Upsert>(
    pool: &SqlitePool,
    rows: &[T],
    settings: BulkWrite,
    operation_name: &str,
) -> Result<usize> {
    let results: Vec<Result<usize>> = stream::iter(rows.chunks(settings.batch_size.max(1)))
        .map(|chunk| retry_on_lock(operation_name, settings.max_lock_wait_ms, move || upsert_batch(pool, chunk)))
        .buffer_unordered(settings.concurrency.max(1))
        .collect()
        .await;

    let mut written = 0;
    for result in results {
        written += result?;
    }

    tracing::debug!(operation = operation_name, rows = written, "Bulk upsert complete");
    Ok(written)
}
