//! Document database operations
//!
//! Committee reports and every other non-motion document kind.

use super::Upsert;
use async_trait::async_trait;
use riksvote_common::{Result, Session};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

/// Document type code of committee reports
pub const REPORT_DOC_TYPE: &str = "bet";

/// Document record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub document_id: String,
    pub designation: String,
    pub session: String,
    pub committee_code: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub decision_date: Option<String>,
    pub published_date: Option<String>,
    pub doc_type: String,
    pub subtype: String,
}

/// Identifying fields of a stored committee report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRef {
    pub document_id: String,
    pub designation: String,
    pub session: String,
}

#[async_trait]
impl Upsert for Document {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (
                document_id, designation, session, committee_code, title, subtitle,
                decision_date, published_date, doc_type, subtype, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(document_id) DO UPDATE SET
                designation = excluded.designation,
                session = excluded.session,
                committee_code = excluded.committee_code,
                title = excluded.title,
                subtitle = excluded.subtitle,
                decision_date = excluded.decision_date,
                published_date = excluded.published_date,
                doc_type = excluded.doc_type,
                subtype = excluded.subtype,
                updated_at = CURRENT_TIMESTAMP
            WHERE documents.designation IS NOT excluded.designation
               OR documents.session IS NOT excluded.session
               OR documents.committee_code IS NOT excluded.committee_code
               OR documents.title IS NOT excluded.title
               OR documents.subtitle IS NOT excluded.subtitle
               OR documents.decision_date IS NOT excluded.decision_date
               OR documents.published_date IS NOT excluded.published_date
               OR documents.doc_type IS NOT excluded.doc_type
               OR documents.subtype IS NOT excluded.subtype
            "#,
        )
        .bind(&self.document_id)
        .bind(&self.designation)
        .bind(&self.session)
        .bind(&self.committee_code)
        .bind(&self.title)
        .bind(&self.subtitle)
        .bind(&self.decision_date)
        .bind(&self.published_date)
        .bind(&self.doc_type)
        .bind(&self.subtype)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Committee reports of one session, ordered by designation
pub async fn list_reports(pool: &SqlitePool, session: &Session) -> Result<Vec<ReportRef>> {
    let rows = sqlx::query(
        r#"
        SELECT document_id, designation, session
        FROM documents
        WHERE doc_type = ? AND session = ? AND designation <> ''
        ORDER BY designation, document_id
        "#,
    )
    .bind(REPORT_DOC_TYPE)
    .bind(session.label())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ReportRef {
            document_id: row.get("document_id"),
            designation: row.get("designation"),
            session: row.get("session"),
        })
        .collect())
}

/// Every stored committee report id, keyed by its upper-cased form
pub async fn report_id_index(pool: &SqlitePool) -> Result<HashMap<String, String>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT document_id FROM documents WHERE doc_type = ?")
        .bind(REPORT_DOC_TYPE)
        .fetch_all(pool)
        .await?;

    Ok(ids.into_iter().map(|id| (id.to_uppercase(), id)).collect())
}

/// Document ids for the decision-text pass
///
/// With `missing_only`, documents that already have decision points stored
/// are left out.
pub async fn list_document_ids(pool: &SqlitePool, missing_only: bool) -> Result<Vec<String>> {
    let sql = if missing_only {
        r#"
        SELECT d.document_id FROM documents d
        WHERE NOT EXISTS (SELECT 1 FROM proposals p WHERE p.document_id = d.document_id)
        ORDER BY d.session, d.document_id
        "#
    } else {
        "SELECT document_id FROM documents ORDER BY session, document_id"
    };

    Ok(sqlx::query_scalar(sql).fetch_all(pool).await?)
}

/// Load document by id
pub async fn load_document(pool: &SqlitePool, document_id: &str) -> Result<Option<Document>> {
    let row = sqlx::query(
        r#"
        SELECT document_id, designation, session, committee_code, title, subtitle,
               decision_date, published_date, doc_type, subtype
        FROM documents
        WHERE document_id = ?
        "#,
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Document {
        document_id: row.get("document_id"),
        designation: row.get("designation"),
        session: row.get("session"),
        committee_code: row.get("committee_code"),
        title: row.get("title"),
        subtitle: row.get("subtitle"),
        decision_date: row.get("decision_date"),
        published_date: row.get("published_date"),
        doc_type: row.get("doc_type"),
        subtype: row.get("subtype"),
    }))
}
