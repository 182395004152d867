//! Stage 2: DOCUMENTS
//!
//! Pages through every (document kind × session) list and upserts each
//! page as it arrives. Motions and propositions go to the motions table,
//! every other kind to documents.

use super::{IngestOrchestrator, ItemOutcome, StageReport};
use crate::db::{upsert_batch, Upsert};
use crate::services::fetch_client::decode_items;
use crate::services::riksdag_client::{DocumentKind, DocumentRecord};
use crate::utils::retry_on_lock;
use anyhow::{Context, Result};
use futures::StreamExt;
use riksvote_common::Session;

impl IngestOrchestrator {
    pub(super) async fn phase_documents(&self, report: &mut StageReport) -> Result<()> {
        for kind in &self.settings.document_kinds {
            for session in &self.settings.sessions {
                let stored = self.ingest_document_list(kind, session, report).await?;
                report.add(format!("{} {}", kind, session), stored);
                tracing::info!(kind = %kind, session = %session, stored, "Document list complete");
            }
        }
        Ok(())
    }

    /// Ingest one (kind, session) list; returns the number of rows stored
    async fn ingest_document_list(
        &self,
        kind: &DocumentKind,
        session: &Session,
        report: &mut StageReport,
    ) -> Result<usize> {
        let pages = self.api.document_pages(kind, session, 1);
        futures::pin_mut!(pages);

        let mut stored = 0;
        while let Some(page) = pages.next().await {
            let page = page.with_context(|| format!("Fetch {} documents for {}", kind, session))?;
            let (records, malformed) = decode_items::<DocumentRecord>(page.items, "document");
            report.record_n(ItemOutcome::SkippedMalformed, malformed);

            let (records, without_id): (Vec<DocumentRecord>, Vec<DocumentRecord>) =
                records.into_iter().partition(|r| !r.dok_id.trim().is_empty());
            if !without_id.is_empty() {
                tracing::warn!(
                    kind = %kind,
                    session = %session,
                    count = without_id.len(),
                    "Documents without id, skipping"
                );
                report.record_n(ItemOutcome::SkippedMalformed, without_id.len());
            }

            let written = if kind.is_motion_like() {
                let rows: Vec<_> = records.into_iter().map(|r| r.into_motion(kind, session)).collect();
                self.store_page(&rows).await?
            } else {
                let rows: Vec<_> = records
                    .into_iter()
                    .map(|r| r.into_document(kind, session, &self.settings.committees))
                    .collect();
                self.store_page(&rows).await?
            };

            tracing::debug!(kind = %kind, session = %session, page = page.number, written, "Stored page");
            report.record_n(ItemOutcome::Persisted, written);
            stored += written;
        }

        Ok(stored)
    }

    async fn store_page<T: Upsert>(&self, rows: &[T]) -> Result<usize> {
        retry_on_lock("documents", self.settings.bulk.max_lock_wait_ms, || upsert_batch(&self.db, rows))
            .await
            .context("Store document page")
    }
}
