//! Stage 1: MEMBERS
//!
//! Full refresh of the member roster. Every fetched member is upserted;
//! members missing from the roster are kept because stored ballots refer to
//! them.

use super::{IngestOrchestrator, ItemOutcome, StageReport};
use crate::db::members::Member;
use crate::db::upsert_concurrent;
use crate::services::riksdag_client::PersonRecord;
use anyhow::{Context, Result};

impl IngestOrchestrator {
    pub(super) async fn phase_members(&self, report: &mut StageReport) -> Result<()> {
        let fetched = self.api.fetch_members().await.context("Fetch member roster")?;
        report.record_n(ItemOutcome::SkippedMalformed, fetched.malformed);

        let mut members: Vec<Member> = Vec::with_capacity(fetched.records.len());
        for member in fetched.records.into_iter().map(PersonRecord::into_member) {
            if member.member_id.is_empty() {
                tracing::warn!(name = %member.name, "Member without id, skipping");
                report.record(ItemOutcome::SkippedMalformed);
                continue;
            }
            members.push(member);
        }

        // Later duplicates win, matching what a row-by-row upsert would leave
        members.reverse();
        let mut seen = std::collections::HashSet::new();
        members.retain(|m| seen.insert(m.member_id.clone()));
        members.reverse();

        tracing::info!(fetched = members.len(), "Fetched member roster");

        let written = upsert_concurrent(&self.db, &members, self.settings.bulk, "members")
            .await
            .context("Store members")?;
        report.record_n(ItemOutcome::Persisted, written);

        Ok(())
    }
}
