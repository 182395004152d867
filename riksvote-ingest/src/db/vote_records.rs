//! Individual ballot database operations

use super::Upsert;
use async_trait::async_trait;
use riksvote_common::{Result, VoteChoice};
use sqlx::{SqliteConnection, SqlitePool};

/// One member's ballot on one voting event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub voting_event_id: String,
    pub member_id: String,
    pub choice: VoteChoice,
    pub party: String,
}

#[async_trait]
impl Upsert for VoteRecord {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vote_records (voting_event_id, member_id, choice, party)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(voting_event_id, member_id) DO UPDATE SET
                choice = excluded.choice,
                party = excluded.party
            WHERE vote_records.choice IS NOT excluded.choice
               OR vote_records.party IS NOT excluded.party
            "#,
        )
        .bind(&self.voting_event_id)
        .bind(&self.member_id)
        .bind(self.choice.as_str())
        .bind(&self.party)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Number of stored ballots for one voting event
pub async fn count_for_event(pool: &SqlitePool, voting_event_id: &str) -> Result<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM vote_records WHERE voting_event_id = ?")
            .bind(voting_event_id)
            .fetch_one(pool)
            .await?,
    )
}
