//! Stage 4: DECISIONS
//!
//! Fetches each document's detail record, stores its numbered decision
//! points and backfills the decision label onto the voting events they
//! reference. Best-effort: a detail that cannot be fetched or read is
//! logged and skipped.

use super::{IngestOrchestrator, ItemOutcome, StageReport};
use crate::db::{documents, upsert_batch, voting_events};
use crate::services::riksdag_client::{DocumentStatus, StatusLookup};
use crate::utils::retry_on_lock;
use anyhow::{Context, Result};

impl IngestOrchestrator {
    pub(super) async fn phase_decisions(&self, report: &mut StageReport) -> Result<()> {
        let document_ids = documents::list_document_ids(&self.db, self.settings.missing_only)
            .await
            .context("List documents")?;
        tracing::info!(
            documents = document_ids.len(),
            missing_only = self.settings.missing_only,
            "Fetching decision points"
        );

        for document_id in &document_ids {
            let Some(status) = self.lookup_status(document_id, report).await else {
                continue;
            };
            self.store_decision_points(document_id, &status, report).await?;
        }

        Ok(())
    }

    /// Fetch one detail record, tallying the outcome when there is none
    pub(super) async fn lookup_status(&self, document_id: &str, report: &mut StageReport) -> Option<Box<DocumentStatus>> {
        match self.api.fetch_document_status(document_id).await {
            Ok(StatusLookup::Found(status)) => Some(status),
            Ok(StatusLookup::NotFound) => {
                tracing::debug!(document_id, "No detail record upstream");
                report.record(ItemOutcome::SkippedNotFound);
                None
            }
            Ok(StatusLookup::Malformed(reason)) => {
                tracing::warn!(document_id, reason = %reason, "Malformed detail record, skipping");
                report.record(ItemOutcome::SkippedMalformed);
                None
            }
            Err(e) => {
                tracing::warn!(document_id, error = %e, "Detail fetch failed, skipping");
                report.record(ItemOutcome::Failed);
                None
            }
        }
    }

    async fn store_decision_points(
        &self,
        document_id: &str,
        status: &DocumentStatus,
        report: &mut StageReport,
    ) -> Result<()> {
        let (points, unnumbered) = status.decision_points(document_id);
        if unnumbered > 0 {
            tracing::warn!(document_id, unnumbered, "Decision points without number, skipping them");
            report.add("unnumbered_points", unnumbered);
        }

        if points.is_empty() {
            report.record(ItemOutcome::SkippedEmpty);
            return Ok(());
        }

        retry_on_lock("proposals", self.settings.bulk.max_lock_wait_ms, || {
            upsert_batch(&self.db, &points)
        })
        .await
        .with_context(|| format!("Store decision points for {}", document_id))?;
        report.add("decision_points", points.len());

        for point in &points {
            let Some(voting_event_id) = point.voting_event_id.as_deref() else {
                continue;
            };
            if point.label.is_empty() {
                continue;
            }

            let labelled = voting_events::set_decision_label(&self.db, voting_event_id, &point.label)
                .await
                .with_context(|| format!("Backfill label for voting event {}", voting_event_id))?;
            report.add("labels_backfilled", labelled as usize);
        }

        report.record(ItemOutcome::Persisted);
        Ok(())
    }
}
