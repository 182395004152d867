//! Stage 5: LINKS
//!
//! Resolves each motion and proposition to the committee report that
//! handled it: the first referenced document that is a stored report.
//! Resolved rows are never fetched again and never cleared, so the stage
//! can be interrupted and resumed freely.

use super::{IngestOrchestrator, ItemOutcome, StageReport};
use crate::db::{documents, motions};
use anyhow::{Context, Result};

impl IngestOrchestrator {
    pub(super) async fn phase_links(&self, report: &mut StageReport) -> Result<()> {
        let reports = documents::report_id_index(&self.db)
            .await
            .context("Load committee report ids")?;
        let already = motions::count_resolved(&self.db)
            .await
            .context("Count resolved motions")?;
        report.record_n(ItemOutcome::AlreadyDone, usize::try_from(already).unwrap_or(0));

        let pending = motions::list_unresolved(&self.db)
            .await
            .context("List unresolved motions")?;
        tracing::info!(
            pending = pending.len(),
            already_resolved = already,
            known_reports = reports.len(),
            "Linking motions to reports"
        );

        for document_id in &pending {
            let Some(status) = self.lookup_status(document_id, report).await else {
                continue;
            };

            let resolved_by = status
                .referenced_ids()
                .into_iter()
                .find_map(|id| reports.get(&id.trim().to_uppercase()));

            let Some(report_id) = resolved_by else {
                tracing::debug!(document_id, "No committee report referenced yet");
                report.record(ItemOutcome::SkippedEmpty);
                continue;
            };

            let changed = motions::set_resolved_by(&self.db, document_id, report_id)
                .await
                .with_context(|| format!("Record resolving report for {}", document_id))?;
            if changed {
                tracing::debug!(document_id, report_id = %report_id, "Linked to report");
                report.record(ItemOutcome::Persisted);
            } else {
                report.record(ItemOutcome::AlreadyDone);
            }
        }

        Ok(())
    }
}
