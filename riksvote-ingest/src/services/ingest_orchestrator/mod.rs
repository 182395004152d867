//! Ingest pipeline orchestrator
//!
//! # Stage Progression
//! MEMBERS → DOCUMENTS → BALLOTS → DECISIONS → LINKS
//!
//! Ballots need the committee reports stored by DOCUMENTS; DECISIONS
//! backfills labels onto the voting events written by BALLOTS. LINKS only
//! depends on stored motions and reports and can be resumed at any time.
//!
//! Each stage is handled by a `phase_*` module and can be run on its own.
//! Fetch and store failures abort the stage; per-item failures in the two
//! linker stages are logged and skipped.

use crate::config::IngestSettings;
use crate::services::fetch_client::{FetchClient, HttpTransport, Transport};
use crate::services::riksdag_client::{Endpoints, RiksdagClient};
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

mod phase_ballots;
mod phase_decisions;
mod phase_documents;
mod phase_links;
mod phase_members;
mod statistics;

pub use statistics::{ItemOutcome, RunReport, StageReport};

/// Pipeline stages, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Members,
    Documents,
    Ballots,
    Decisions,
    Links,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Members,
        Stage::Documents,
        Stage::Ballots,
        Stage::Decisions,
        Stage::Links,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Documents => "documents",
            Self::Ballots => "ballots",
            Self::Decisions => "decisions",
            Self::Links => "links",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs pipeline stages against one store and one upstream client
pub struct IngestOrchestrator {
    db: SqlitePool,
    api: RiksdagClient,
    settings: IngestSettings,
    run_id: Uuid,
}

impl IngestOrchestrator {
    /// Create orchestrator talking to the real upstream over HTTP
    pub fn new(db: SqlitePool, settings: IngestSettings) -> Result<Self> {
        let transport = HttpTransport::new(settings.request_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Self::with_transport(db, settings, Arc::new(transport))
    }

    /// Create orchestrator with an explicit transport
    pub fn with_transport(db: SqlitePool, settings: IngestSettings, transport: Arc<dyn Transport>) -> Result<Self> {
        let endpoints = Endpoints::new(&settings.api_base_url, settings.page_size, settings.ballot_page_cap)
            .context("Invalid upstream API configuration")?;
        let fetch = FetchClient::new(transport, settings.fetch.clone());

        Ok(Self {
            db,
            api: RiksdagClient::new(fetch, endpoints),
            settings,
            run_id: Uuid::new_v4(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run one stage and report its tallies
    pub async fn run_stage(&self, stage: Stage) -> Result<StageReport> {
        let span = tracing::info_span!("stage", stage = %stage, run_id = %self.run_id);

        async {
            let started = Instant::now();
            let mut report = StageReport::new(stage);
            tracing::info!("Stage started");

            let result = match stage {
                Stage::Members => self.phase_members(&mut report).await,
                Stage::Documents => self.phase_documents(&mut report).await,
                Stage::Ballots => self.phase_ballots(&mut report).await,
                Stage::Decisions => self.phase_decisions(&mut report).await,
                Stage::Links => self.phase_links(&mut report).await,
            };
            report.elapsed = started.elapsed();

            match result {
                Ok(()) => {
                    tracing::info!(elapsed_ms = report.elapsed.as_millis() as u64, "{}", report.display_string());
                    for (counter, n) in report.counters() {
                        tracing::debug!(counter, n, "Stage counter");
                    }
                    Ok(report)
                }
                Err(e) => {
                    tracing::error!(
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        error = %format!("{:#}", e),
                        "Stage failed"
                    );
                    Err(e.context(format!("Stage '{}' failed", stage)))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run every stage in dependency order, stopping at the first failure
    pub async fn execute_run(&self) -> Result<RunReport> {
        let started = Instant::now();
        tracing::info!(
            run_id = %self.run_id,
            sessions = self.settings.sessions.len(),
            "Starting full ingest run"
        );

        let mut stages = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            stages.push(self.run_stage(stage).await?);
        }

        let report = RunReport {
            run_id: self.run_id,
            stages,
            elapsed: started.elapsed(),
        };

        for stage in &report.stages {
            tracing::info!(
                stage = %stage.stage,
                elapsed_ms = stage.elapsed.as_millis() as u64,
                "Stage elapsed"
            );
        }
        tracing::info!(
            run_id = %self.run_id,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Ingest run complete"
        );

        Ok(report)
    }
}
