//! Per-stage statistics
//!
//! Each stage tallies what happened to every item it touched. Tallies are
//! reported at the end of the stage and never drive control flow.

use super::Stage;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Terminal state of one item (report, document, motion, member page)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemOutcome {
    Persisted,
    /// Upstream answered 404
    SkippedNotFound,
    /// Record missing required fields or not decodable
    SkippedMalformed,
    /// Fetched fine but nothing usable inside
    SkippedEmpty,
    /// Per-item fetch failure in a best-effort stage
    Failed,
    /// Completed by an earlier run
    AlreadyDone,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persisted => "persisted",
            Self::SkippedNotFound => "skipped_not_found",
            Self::SkippedMalformed => "skipped_malformed",
            Self::SkippedEmpty => "skipped_empty",
            Self::Failed => "failed",
            Self::AlreadyDone => "already_done",
        }
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one stage run
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    outcomes: BTreeMap<ItemOutcome, usize>,
    /// Free-form counters (per kind/session fetch counts, filtered ballots, ...)
    counters: BTreeMap<String, usize>,
    pub elapsed: Duration,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            outcomes: BTreeMap::new(),
            counters: BTreeMap::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        self.record_n(outcome, 1);
    }

    pub fn record_n(&mut self, outcome: ItemOutcome, n: usize) {
        if n > 0 {
            *self.outcomes.entry(outcome).or_default() += n;
        }
    }

    /// Number of items that ended in `outcome`
    pub fn tally(&self, outcome: ItemOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Items touched across all outcomes
    pub fn total(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn add(&mut self, counter: impl Into<String>, n: usize) {
        *self.counters.entry(counter.into()).or_default() += n;
    }

    pub fn counter(&self, counter: &str) -> usize {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// One-line summary, e.g. "ballots: persisted=12 skipped_empty=3 in 4.2s"
    pub fn display_string(&self) -> String {
        let outcomes = if self.outcomes.is_empty() {
            "no items".to_string()
        } else {
            self.outcomes
                .iter()
                .map(|(outcome, n)| format!("{}={}", outcome, n))
                .collect::<Vec<_>>()
                .join(" ")
        };
        format!("{}: {} in {:.1}s", self.stage, outcomes, self.elapsed.as_secs_f64())
    }
}

/// Result of a full pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub stages: Vec<StageReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }
}
