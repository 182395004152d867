//! Ballot aggregation
//!
//! Accumulates accepted ballots into per-voting-event and
//! per-(party, voting-event) counters for the lifetime of one ballot stage.
//! Counters are recomputed from the raw ballots on every run, never
//! incrementally applied to stored rows, so re-runs derive identical totals.
//!
//! # Invariants
//! - Each (voting event, member) pair is counted at most once, matching the
//!   VoteRecord primary key.
//! - Every counted ballot lands in exactly one party bucket, so party
//!   counters summed per event equal the event counters.
//!
//! [`VoteAggregator::flush`] returns rows for the events touched since the
//! previous flush, carrying run-cumulative totals, so flushing after every
//! session and again at the end writes each row with its final value. Each
//! event's breakdown lists every party bucket and member counted for it, so
//! the store can drop rows a corrected upstream feed no longer produces.

use crate::db::party_summaries::{EventBreakdown, PartyVoteSummary};
use crate::db::vote_records::VoteRecord;
use crate::db::voting_events::VotingEvent;
use riksvote_common::{VoteChoice, VoteCounts};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Party code for ballots cast without a party affiliation
pub const UNAFFILIATED_PARTY: &str = "-";

/// Party bucket for a raw party field
///
/// Codes are trimmed and upper-cased; empty values and the upstream "-"
/// sentinel map to [`UNAFFILIATED_PARTY`].
pub fn party_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == UNAFFILIATED_PARTY {
        UNAFFILIATED_PARTY.to_string()
    } else {
        trimmed.to_uppercase()
    }
}

/// One substantive-main ballot, validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub voting_event_id: String,
    pub member_id: String,
    pub party: String,
    pub choice: VoteChoice,
    pub designation: String,
    pub session: String,
    pub point: Option<i64>,
    pub committee_code: Option<String>,
    pub vote_date: Option<String>,
}

impl Ballot {
    pub fn to_vote_record(&self) -> VoteRecord {
        VoteRecord {
            voting_event_id: self.voting_event_id.clone(),
            member_id: self.member_id.clone(),
            choice: self.choice,
            party: party_key(&self.party),
        }
    }
}

/// Result of offering one ballot to the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulated {
    Counted,
    /// Same (voting event, member) pair already counted this run
    Duplicate,
}

/// Rows produced by one flush
///
/// `voting_events` must be committed before `breakdowns`, whose party rows
/// reference them.
#[derive(Debug, Default)]
pub struct AggregateBatch {
    pub voting_events: Vec<VotingEvent>,
    pub breakdowns: Vec<EventBreakdown>,
}

impl AggregateBatch {
    pub fn is_empty(&self) -> bool {
        self.voting_events.is_empty() && self.breakdowns.is_empty()
    }

    /// Party rows across all breakdowns
    pub fn party_rows(&self) -> usize {
        self.breakdowns.iter().map(|b| b.parties.len()).sum()
    }
}

#[derive(Debug)]
struct EventTally {
    template: VotingEvent,
    counts: VoteCounts,
    parties: BTreeMap<String, VoteCounts>,
    members: BTreeSet<String>,
}

/// In-memory aggregation state owned by one ballot stage run
#[derive(Debug, Default)]
pub struct VoteAggregator {
    events: HashMap<String, EventTally>,
    dirty: BTreeSet<String>,
}

impl VoteAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one ballot toward its event and its party bucket
    pub fn accumulate(&mut self, ballot: &Ballot) -> Accumulated {
        let tally = self
            .events
            .entry(ballot.voting_event_id.clone())
            .or_insert_with(|| EventTally {
                template: VotingEvent {
                    voting_event_id: ballot.voting_event_id.clone(),
                    designation: ballot.designation.clone(),
                    session: ballot.session.clone(),
                    point: ballot.point,
                    committee_code: ballot.committee_code.clone(),
                    decision_label: None,
                    counts: VoteCounts::default(),
                    vote_date: ballot.vote_date.clone(),
                },
                counts: VoteCounts::default(),
                parties: BTreeMap::new(),
                members: BTreeSet::new(),
            });

        if !tally.members.insert(ballot.member_id.clone()) {
            return Accumulated::Duplicate;
        }

        tally.counts.record(ballot.choice);
        tally
            .parties
            .entry(party_key(&ballot.party))
            .or_default()
            .record(ballot.choice);
        if tally.template.vote_date.is_none() {
            tally.template.vote_date = ballot.vote_date.clone();
        }
        if tally.template.point.is_none() {
            tally.template.point = ballot.point;
        }

        self.dirty.insert(ballot.voting_event_id.clone());
        Accumulated::Counted
    }

    /// Number of distinct voting events seen this run
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of ballots counted this run
    pub fn ballot_count(&self) -> usize {
        self.events.values().map(|t| t.members.len()).sum()
    }

    /// Current totals for one voting event
    pub fn counts(&self, voting_event_id: &str) -> Option<VoteCounts> {
        self.events.get(voting_event_id).map(|t| t.counts)
    }

    /// Rows for every event touched since the last flush
    pub fn flush(&mut self) -> AggregateBatch {
        let dirty = std::mem::take(&mut self.dirty);
        let mut batch = AggregateBatch::default();

        for tally in dirty.iter().filter_map(|id| self.events.get(id)) {
            let voting_event_id = tally.template.voting_event_id.clone();
            batch.voting_events.push(VotingEvent {
                counts: tally.counts,
                ..tally.template.clone()
            });
            batch.breakdowns.push(EventBreakdown {
                parties: tally
                    .parties
                    .iter()
                    .map(|(party, counts)| PartyVoteSummary {
                        party: party.clone(),
                        voting_event_id: voting_event_id.clone(),
                        counts: *counts,
                    })
                    .collect(),
                member_ids: tally.members.iter().cloned().collect(),
                voting_event_id,
            });
        }

        batch
    }
}
