//! Per-party aggregate database operations
//!
//! Rows reference their voting event, so the parent event must be written
//! first. [`EventBreakdown`] writes everything derived below one event row
//! and removes rows the fresh aggregation no longer produces.

use super::Upsert;
use async_trait::async_trait;
use riksvote_common::{Result, VoteCounts};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

/// Ballots of one party on one voting event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyVoteSummary {
    pub party: String,
    pub voting_event_id: String,
    pub counts: VoteCounts,
}

#[async_trait]
impl Upsert for PartyVoteSummary {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO party_vote_summaries (
                party, voting_event_id, yes_count, no_count, abstain_count, absent_count
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(party, voting_event_id) DO UPDATE SET
                yes_count = excluded.yes_count,
                no_count = excluded.no_count,
                abstain_count = excluded.abstain_count,
                absent_count = excluded.absent_count
            WHERE party_vote_summaries.yes_count IS NOT excluded.yes_count
               OR party_vote_summaries.no_count IS NOT excluded.no_count
               OR party_vote_summaries.abstain_count IS NOT excluded.abstain_count
               OR party_vote_summaries.absent_count IS NOT excluded.absent_count
            "#,
        )
        .bind(&self.party)
        .bind(&self.voting_event_id)
        .bind(self.counts.yes)
        .bind(self.counts.no)
        .bind(self.counts.abstain)
        .bind(self.counts.absent)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Party rows and counted members of one voting event, as aggregated this run
///
/// Writing it upserts the party rows, then deletes party rows and ballots of
/// the event that are not in the fresh sets. Run inside one transaction
/// (as [`super::upsert_batch`] does), the event's stored rows always match
/// its counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBreakdown {
    pub voting_event_id: String,
    pub parties: Vec<PartyVoteSummary>,
    pub member_ids: Vec<String>,
}

#[async_trait]
impl Upsert for EventBreakdown {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()> {
        for party in &self.parties {
            party.upsert(&mut *conn).await?;
        }

        let stale_parties = prune_except(
            &mut *conn,
            "party_vote_summaries",
            "party",
            &self.voting_event_id,
            self.parties.iter().map(|p| p.party.as_str()),
        )
        .await?;
        let stale_ballots = prune_except(
            &mut *conn,
            "vote_records",
            "member_id",
            &self.voting_event_id,
            self.member_ids.iter().map(String::as_str),
        )
        .await?;

        if stale_parties > 0 || stale_ballots > 0 {
            tracing::debug!(
                voting_event_id = %self.voting_event_id,
                stale_parties,
                stale_ballots,
                "Removed rows no longer in the ballot feed"
            );
        }
        Ok(())
    }
}

/// Delete the event's rows in `table` whose `column` is not one of `keep`
async fn prune_except<'a>(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    voting_event_id: &'a str,
    keep: impl Iterator<Item = &'a str>,
) -> Result<u64> {
    let mut query = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE voting_event_id = ", table));
    query.push_bind(voting_event_id);
    query.push(format!(" AND {} NOT IN (", column));
    let mut values = query.separated(", ");
    for value in keep {
        values.push_bind(value);
    }
    values.push_unseparated(")");

    Ok(query.build().execute(&mut *conn).await?.rows_affected())
}

/// Party rows of one voting event, by party code
pub async fn load_for_event(pool: &SqlitePool, voting_event_id: &str) -> Result<Vec<PartyVoteSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT party, voting_event_id, yes_count, no_count, abstain_count, absent_count
        FROM party_vote_summaries
        WHERE voting_event_id = ?
        ORDER BY party
        "#,
    )
    .bind(voting_event_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| PartyVoteSummary {
            party: row.get("party"),
            voting_event_id: row.get("voting_event_id"),
            counts: VoteCounts::new(
                row.get("yes_count"),
                row.get("no_count"),
                row.get("abstain_count"),
                row.get("absent_count"),
            ),
        })
        .collect())
}
