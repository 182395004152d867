//! Motion and proposition database operations
//!
//! The resolving report reference is owned by the cross-document linker:
//! upserts from document ingest never touch it, and the linker only fills
//! it while it is still null.

use super::Upsert;
use async_trait::async_trait;
use riksvote_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Member motion or government proposition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motion {
    pub document_id: String,
    pub designation: String,
    pub session: String,
    pub doc_type: String,
    pub title: String,
    pub authors: String,
    pub department: String,
    pub published_date: Option<String>,
    pub resolved_by_document_id: Option<String>,
}

#[async_trait]
impl Upsert for Motion {
    async fn upsert(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO motions (
                document_id, designation, session, doc_type, title, authors,
                department, published_date, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(document_id) DO UPDATE SET
                designation = excluded.designation,
                session = excluded.session,
                doc_type = excluded.doc_type,
                title = excluded.title,
                authors = excluded.authors,
                department = excluded.department,
                published_date = excluded.published_date,
                updated_at = CURRENT_TIMESTAMP
            WHERE motions.designation IS NOT excluded.designation
               OR motions.session IS NOT excluded.session
               OR motions.doc_type IS NOT excluded.doc_type
               OR motions.title IS NOT excluded.title
               OR motions.authors IS NOT excluded.authors
               OR motions.department IS NOT excluded.department
               OR motions.published_date IS NOT excluded.published_date
            "#,
        )
        .bind(&self.document_id)
        .bind(&self.designation)
        .bind(&self.session)
        .bind(&self.doc_type)
        .bind(&self.title)
        .bind(&self.authors)
        .bind(&self.department)
        .bind(&self.published_date)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Ids of motions and propositions still lacking a resolving report
pub async fn list_unresolved(pool: &SqlitePool) -> Result<Vec<String>> {
    Ok(sqlx::query_scalar(
        r#"
        SELECT document_id FROM motions
        WHERE resolved_by_document_id IS NULL
        ORDER BY session, document_id
        "#,
    )
    .fetch_all(pool)
    .await?)
}

/// Number of motions and propositions already resolved
pub async fn count_resolved(pool: &SqlitePool) -> Result<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM motions WHERE resolved_by_document_id IS NOT NULL")
            .fetch_one(pool)
            .await?,
    )
}

/// Record the resolving report, only if none is set yet
///
/// Returns whether the row changed.
pub async fn set_resolved_by(pool: &SqlitePool, document_id: &str, report_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE motions
        SET resolved_by_document_id = ?, updated_at = CURRENT_TIMESTAMP
        WHERE document_id = ? AND resolved_by_document_id IS NULL
        "#,
    )
    .bind(report_id)
    .bind(document_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load motion by id
pub async fn load_motion(pool: &SqlitePool, document_id: &str) -> Result<Option<Motion>> {
    let row = sqlx::query(
        r#"
        SELECT document_id, designation, session, doc_type, title, authors,
               department, published_date, resolved_by_document_id
        FROM motions
        WHERE document_id = ?
        "#,
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Motion {
        document_id: row.get("document_id"),
        designation: row.get("designation"),
        session: row.get("session"),
        doc_type: row.get("doc_type"),
        title: row.get("title"),
        authors: row.get("authors"),
        department: row.get("department"),
        published_date: row.get("published_date"),
        resolved_by_document_id: row.get("resolved_by_document_id"),
    }))
}
