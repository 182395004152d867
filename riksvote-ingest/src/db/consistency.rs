//! Store consistency checks
//!
//! Verifies that every voting event's totals agree with its stored ballots
//! and with the sum of its party rows.

use riksvote_common::db::TABLES;
use riksvote_common::{Result, VoteCounts};
use sqlx::{Row, SqlitePool};
use std::fmt;

/// One voting event whose aggregates disagree with the underlying rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// Event total differs from its number of stored ballots
    RecordCount {
        voting_event_id: String,
        event_total: i64,
        records: i64,
    },
    /// Event counts differ from its party rows summed per choice
    PartySum {
        voting_event_id: String,
        event: VoteCounts,
        parties: VoteCounts,
    },
}

impl Discrepancy {
    pub fn voting_event_id(&self) -> &str {
        match self {
            Self::RecordCount { voting_event_id, .. } | Self::PartySum { voting_event_id, .. } => voting_event_id,
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordCount {
                voting_event_id,
                event_total,
                records,
            } => write!(
                f,
                "{}: event total {} but {} ballots stored",
                voting_event_id, event_total, records
            ),
            Self::PartySum {
                voting_event_id,
                event,
                parties,
            } => write!(
                f,
                "{}: event counts {}/{}/{}/{} but party sums {}/{}/{}/{}",
                voting_event_id,
                event.yes,
                event.no,
                event.abstain,
                event.absent,
                parties.yes,
                parties.no,
                parties.abstain,
                parties.absent
            ),
        }
    }
}

fn counts_at(row: &sqlx::sqlite::SqliteRow, prefix: &str) -> VoteCounts {
    VoteCounts::new(
        row.get(format!("{}_yes", prefix).as_str()),
        row.get(format!("{}_no", prefix).as_str()),
        row.get(format!("{}_abstain", prefix).as_str()),
        row.get(format!("{}_absent", prefix).as_str()),
    )
}

/// Check both aggregate invariants for every stored voting event
pub async fn verify_consistency(pool: &SqlitePool) -> Result<Vec<Discrepancy>> {
    let mut discrepancies = Vec::new();

    let record_rows = sqlx::query(
        r#"
        SELECT voting_event_id, event_total, records
        FROM (
            SELECT e.voting_event_id AS voting_event_id,
                   e.yes_count + e.no_count + e.abstain_count + e.absent_count AS event_total,
                   (SELECT COUNT(*) FROM vote_records r
                    WHERE r.voting_event_id = e.voting_event_id) AS records
            FROM voting_events e
        )
        WHERE event_total <> records
        ORDER BY voting_event_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    for row in record_rows {
        discrepancies.push(Discrepancy::RecordCount {
            voting_event_id: row.get("voting_event_id"),
            event_total: row.get("event_total"),
            records: row.get("records"),
        });
    }

    let party_rows = sqlx::query(
        r#"
        SELECT e.voting_event_id AS voting_event_id,
               e.yes_count AS event_yes,
               e.no_count AS event_no,
               e.abstain_count AS event_abstain,
               e.absent_count AS event_absent,
               COALESCE(SUM(p.yes_count), 0) AS party_yes,
               COALESCE(SUM(p.no_count), 0) AS party_no,
               COALESCE(SUM(p.abstain_count), 0) AS party_abstain,
               COALESCE(SUM(p.absent_count), 0) AS party_absent
        FROM voting_events e
        LEFT JOIN party_vote_summaries p ON p.voting_event_id = e.voting_event_id
        GROUP BY e.voting_event_id
        HAVING event_yes <> party_yes
            OR event_no <> party_no
            OR event_abstain <> party_abstain
            OR event_absent <> party_absent
        ORDER BY e.voting_event_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    for row in party_rows {
        discrepancies.push(Discrepancy::PartySum {
            voting_event_id: row.get("voting_event_id"),
            event: counts_at(&row, "event"),
            parties: counts_at(&row, "party"),
        });
    }

    Ok(discrepancies)
}

/// Row count of every pipeline table, in schema order
pub async fn table_counts(pool: &SqlitePool) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await?;
        counts.push((*table, count));
    }
    Ok(counts)
}
