//! Stage 3: BALLOTS
//!
//! For every stored committee report, fetches its ballots, keeps the
//! substantive main decision, stores the individual ballots and feeds them
//! to the run's [`VoteAggregator`]. Aggregates are flushed after each
//! session (parents first) and once more when the stage ends; a flush also
//! drops stored ballots and party rows of the flushed events that the
//! fresh feed no longer contains.

use super::{IngestOrchestrator, ItemOutcome, StageReport};
use crate::db::documents::{self, ReportRef};
use crate::db::vote_records::VoteRecord;
use crate::db::{upsert_batch, upsert_concurrent};
use crate::services::riksdag_client::BallotRejection;
use crate::services::vote_aggregator::{Accumulated, VoteAggregator};
use crate::utils::retry_on_lock;
use anyhow::{Context, Result};
use riksvote_common::Session;

impl IngestOrchestrator {
    pub(super) async fn phase_ballots(&self, report: &mut StageReport) -> Result<()> {
        let mut aggregator = VoteAggregator::new();

        for session in &self.settings.sessions {
            let reports = documents::list_reports(&self.db, session)
                .await
                .with_context(|| format!("List committee reports for {}", session))?;
            tracing::info!(session = %session, reports = reports.len(), "Fetching ballots");

            for committee_report in &reports {
                self.ingest_report_ballots(session, committee_report, &mut aggregator, report)
                    .await?;
            }

            self.flush_aggregates(&mut aggregator, report).await?;
        }

        self.flush_aggregates(&mut aggregator, report).await?;

        tracing::info!(
            voting_events = aggregator.event_count(),
            ballots = aggregator.ballot_count(),
            "Ballot aggregation complete"
        );
        Ok(())
    }

    async fn ingest_report_ballots(
        &self,
        session: &Session,
        committee_report: &ReportRef,
        aggregator: &mut VoteAggregator,
        report: &mut StageReport,
    ) -> Result<()> {
        let designation = committee_report.designation.as_str();
        let fetched = self
            .api
            .fetch_ballots(session, designation)
            .await
            .with_context(|| format!("Fetch ballots for {} {}", session, designation))?;

        if fetched.records.is_empty() {
            tracing::debug!(session = %session, designation, "No ballots for report");
            report.record(ItemOutcome::SkippedEmpty);
            report.add("malformed_ballots", fetched.malformed);
            return Ok(());
        }

        let mut records: Vec<VoteRecord> = Vec::with_capacity(fetched.records.len());
        let mut filtered = 0;
        let mut duplicates = 0;
        let mut malformed = fetched.malformed;

        for record in fetched.records {
            match record.into_ballot(designation, session, &self.settings.committees) {
                Ok(ballot) => match aggregator.accumulate(&ballot) {
                    Accumulated::Counted => records.push(ballot.to_vote_record()),
                    Accumulated::Duplicate => duplicates += 1,
                },
                Err(BallotRejection::NotSubstantiveMain) => filtered += 1,
                Err(BallotRejection::Malformed(reason)) => {
                    tracing::warn!(session = %session, designation, reason = %reason, "Malformed ballot, skipping");
                    malformed += 1;
                }
            }
        }

        report.add("ballots", records.len());
        report.add("filtered_ballots", filtered);
        report.add("duplicate_ballots", duplicates);
        report.add("malformed_ballots", malformed);

        if records.is_empty() {
            tracing::debug!(
                session = %session,
                designation,
                filtered,
                "No substantive main ballots for report"
            );
            report.record(ItemOutcome::SkippedEmpty);
            return Ok(());
        }

        let written = retry_on_lock("vote_records", self.settings.bulk.max_lock_wait_ms, || {
            upsert_batch(&self.db, &records)
        })
        .await
        .with_context(|| format!("Store ballots for {} {}", session, designation))?;

        tracing::debug!(session = %session, designation, written, filtered, duplicates, "Stored ballots");
        report.record(ItemOutcome::Persisted);
        Ok(())
    }

    /// Write aggregates touched since the last flush
    ///
    /// Voting events are fully committed before any party row is written.
    /// Each event's breakdown commits in one transaction with the removal of
    /// party rows and ballots the fresh feed no longer produces.
    async fn flush_aggregates(&self, aggregator: &mut VoteAggregator, report: &mut StageReport) -> Result<()> {
        let batch = aggregator.flush();
        if batch.is_empty() {
            return Ok(());
        }

        let events = upsert_concurrent(&self.db, &batch.voting_events, self.settings.bulk, "voting_events")
            .await
            .context("Store voting events")?;
        upsert_concurrent(&self.db, &batch.breakdowns, self.settings.bulk, "party_vote_summaries")
            .await
            .context("Store party vote summaries")?;
        let parties = batch.party_rows();

        tracing::info!(voting_events = events, party_summaries = parties, "Flushed aggregates");
        report.add("voting_events_written", events);
        report.add("party_summaries_written", parties);
        Ok(())
    }
}
