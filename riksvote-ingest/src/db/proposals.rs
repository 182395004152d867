//! Decision point database operations

use super::Upsert;
use async_trait::async_trait;
use riksvote_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// One numbered decision inside a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub document_id: String,
    pub point: i64,
    pub label: String,
    pub decision_text: String,
    pub decision_kind: String,
    pub voting_event_id: Option<String>,
}

#[async_trait]
impl Upsert for Proposal {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO proposals (
                document_id, point, label, decision_text, decision_kind,
                voting_event_id, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(document_id, point) DO UPDATE SET
                label = excluded.label,
                decision_text = excluded.decision_text,
                decision_kind = excluded.decision_kind,
                voting_event_id = excluded.voting_event_id,
                updated_at = CURRENT_TIMESTAMP
            WHERE proposals.label IS NOT excluded.label
               OR proposals.decision_text IS NOT excluded.decision_text
               OR proposals.decision_kind IS NOT excluded.decision_kind
               OR proposals.voting_event_id IS NOT excluded.voting_event_id
            "#,
        )
        .bind(&self.document_id)
        .bind(self.point)
        .bind(&self.label)
        .bind(&self.decision_text)
        .bind(&self.decision_kind)
        .bind(&self.voting_event_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Decision points of one document, by point number
pub async fn load_for_document(pool: &SqlitePool, document_id: &str) -> Result<Vec<Proposal>> {
    let rows = sqlx::query(
        r#"
        SELECT document_id, point, label, decision_text, decision_kind, voting_event_id
        FROM proposals
        WHERE document_id = ?
        ORDER BY point
        "#,
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Proposal {
            document_id: row.get("document_id"),
            point: row.get("point"),
            label: row.get("label"),
            decision_text: row.get("decision_text"),
            decision_kind: row.get("decision_kind"),
            voting_event_id: row.get("voting_event_id"),
        })
        .collect())
}
