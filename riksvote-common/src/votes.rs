//! Vote choices, counters and outcome derivation
//!
//! The outcome of a voting event is never stored; it is always derived from
//! the yes/no counters with [`VoteCounts::outcome`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

/// One member's ballot choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
    Absent,
}

impl VoteChoice {
    /// Parse an upstream ballot value (`Ja`, `Nej`, `Avstår`, `Frånvarande`)
    ///
    /// Matching is case-insensitive and also accepts the stored English
    /// names, so values read back from the store parse too.
    pub fn from_upstream(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "ja" | "yes" => Some(Self::Yes),
            "nej" | "no" => Some(Self::No),
            "avstår" | "avstar" | "abstain" => Some(Self::Abstain),
            "frånvarande" | "franvarande" | "absent" => Some(Self::Absent),
            _ => None,
        }
    }

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Abstain => "abstain",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_upstream(s).ok_or_else(|| Error::InvalidInput(format!("Unknown vote choice: {}", s)))
    }
}

/// Derived result of a voting event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Rejected,
    Tied,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::Tied => "tied",
        })
    }
}

/// Four choice counters for one voting event (or one party within it)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub yes: i64,
    pub no: i64,
    pub abstain: i64,
    pub absent: i64,
}

impl VoteCounts {
    pub fn new(yes: i64, no: i64, abstain: i64, absent: i64) -> Self {
        Self { yes, no, abstain, absent }
    }

    /// Count one ballot
    pub fn record(&mut self, choice: VoteChoice) {
        match choice {
            VoteChoice::Yes => self.yes += 1,
            VoteChoice::No => self.no += 1,
            VoteChoice::Abstain => self.abstain += 1,
            VoteChoice::Absent => self.absent += 1,
        }
    }

    /// Total ballots counted
    pub fn total(&self) -> i64 {
        self.yes + self.no + self.abstain + self.absent
    }

    /// Passed when yes exceeds no, rejected when no exceeds yes, tied otherwise
    pub fn outcome(&self) -> Outcome {
        match self.yes.cmp(&self.no) {
            std::cmp::Ordering::Greater => Outcome::Passed,
            std::cmp::Ordering::Less => Outcome::Rejected,
            std::cmp::Ordering::Equal => Outcome::Tied,
        }
    }
}

impl AddAssign for VoteCounts {
    fn add_assign(&mut self, other: Self) {
        self.yes += other.yes;
        self.no += other.no;
        self.abstain += other.abstain;
        self.absent += other.absent;
    }
}
