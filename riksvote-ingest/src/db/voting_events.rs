//! Voting event database operations
//!
//! Counts come from the ballot aggregator; the decision label is backfilled
//! later by the decision-text linker, so an aggregate upsert must never
//! clear a label that is already stored.

use super::Upsert;
use async_trait::async_trait;
use riksvote_common::{Outcome, Result, VoteCounts};
use sqlx::{Row, SqliteConnection, SqlitePool};

/// One aggregated roll-call decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingEvent {
    pub voting_event_id: String,
    pub designation: String,
    pub session: String,
    pub point: Option<i64>,
    pub committee_code: Option<String>,
    pub decision_label: Option<String>,
    pub counts: VoteCounts,
    pub vote_date: Option<String>,
}

impl VotingEvent {
    /// Derived from the counts, never stored
    pub fn outcome(&self) -> Outcome {
        self.counts.outcome()
    }
}

#[async_trait]
impl Upsert for VotingEvent {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO voting_events (
                voting_event_id, designation, session, point, committee_code,
                decision_label, yes_count, no_count, abstain_count, absent_count,
                vote_date, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(voting_event_id) DO UPDATE SET
                designation = excluded.designation,
                session = excluded.session,
                point = excluded.point,
                committee_code = excluded.committee_code,
                decision_label = COALESCE(excluded.decision_label, voting_events.decision_label),
                yes_count = excluded.yes_count,
                no_count = excluded.no_count,
                abstain_count = excluded.abstain_count,
                absent_count = excluded.absent_count,
                vote_date = excluded.vote_date,
                updated_at = CURRENT_TIMESTAMP
            WHERE voting_events.designation IS NOT excluded.designation
               OR voting_events.session IS NOT excluded.session
               OR voting_events.point IS NOT excluded.point
               OR voting_events.committee_code IS NOT excluded.committee_code
               OR (excluded.decision_label IS NOT NULL
                   AND voting_events.decision_label IS NOT excluded.decision_label)
               OR voting_events.yes_count IS NOT excluded.yes_count
               OR voting_events.no_count IS NOT excluded.no_count
               OR voting_events.abstain_count IS NOT excluded.abstain_count
               OR voting_events.absent_count IS NOT excluded.absent_count
               OR voting_events.vote_date IS NOT excluded.vote_date
            "#,
        )
        .bind(&self.voting_event_id)
        .bind(&self.designation)
        .bind(&self.session)
        .bind(self.point)
        .bind(&self.committee_code)
        .bind(&self.decision_label)
        .bind(self.counts.yes)
        .bind(self.counts.no)
        .bind(self.counts.abstain)
        .bind(self.counts.absent)
        .bind(&self.vote_date)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Backfill the decision label, matching the id case-insensitively
///
/// Returns the number of voting events updated (zero when the event has not
/// been aggregated yet or already carries this label).
pub async fn set_decision_label(pool: &SqlitePool, voting_event_id: &str, label: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE voting_events
        SET decision_label = ?, updated_at = CURRENT_TIMESTAMP
        WHERE lower(voting_event_id) = lower(?)
          AND decision_label IS NOT ?
        "#,
    )
    .bind(label)
    .bind(voting_event_id)
    .bind(label)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Load voting event by exact id
pub async fn load_voting_event(pool: &SqlitePool, voting_event_id: &str) -> Result<Option<VotingEvent>> {
    let row = sqlx::query(
        r#"
        SELECT voting_event_id, designation, session, point, committee_code, decision_label,
               yes_count, no_count, abstain_count, absent_count, vote_date
        FROM voting_events
        WHERE voting_event_id = ?
        "#,
    )
    .bind(voting_event_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| VotingEvent {
        voting_event_id: row.get("voting_event_id"),
        designation: row.get("designation"),
        session: row.get("session"),
        point: row.get("point"),
        committee_code: row.get("committee_code"),
        decision_label: row.get("decision_label"),
        counts: VoteCounts::new(
            row.get("yes_count"),
            row.get("no_count"),
            row.get("abstain_count"),
            row.get("absent_count"),
        ),
        vote_date: row.get("vote_date"),
    }))
}
