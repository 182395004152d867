//! Legislative session labels
//!
//! A session (riksmöte) spans two calendar years and is labelled `YYYY/YY`,
//! e.g. `2023/24`. The upstream API accepts and returns this exact form.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated `YYYY/YY` session label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Session {
    start_year: u16,
}

impl Session {
    /// Session starting in the given calendar year
    pub fn starting(start_year: u16) -> Result<Self> {
        if !(1000..=9998).contains(&start_year) {
            return Err(Error::InvalidInput(format!(
                "Session start year out of range: {}",
                start_year
            )));
        }
        Ok(Self { start_year })
    }

    /// First calendar year of the session
    pub fn start_year(&self) -> u16 {
        self.start_year
    }

    /// Every session from `first` through `last` (start years, inclusive)
    pub fn range(first: u16, last: u16) -> Result<Vec<Self>> {
        if first > last {
            return Err(Error::InvalidInput(format!(
                "Empty session range: {} > {}",
                first, last
            )));
        }
        (first..=last).map(Self::starting).collect()
    }

    /// Label in upstream form (`2023/24`)
    pub fn label(&self) -> String {
        format!("{}/{:02}", self.start_year, (self.start_year + 1) % 100)
    }
}

impl FromStr for Session {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("Invalid session label '{}', expected YYYY/YY", s));

        let (year, suffix) = s.trim().split_once('/').ok_or_else(invalid)?;
        if year.len() != 4 || suffix.len() != 2 {
            return Err(invalid());
        }

        let start_year: u16 = year.parse().map_err(|_| invalid())?;
        let end_suffix: u16 = suffix.parse().map_err(|_| invalid())?;

        if (start_year + 1) % 100 != end_suffix {
            return Err(invalid());
        }

        Self::starting(start_year)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Session {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for Session {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_label() {
        let session: Session = "2023/24".parse().unwrap();
        assert_eq!(session.start_year(), 2023);
        assert_eq!(session.label(), "2023/24");
        assert_eq!(session.to_string(), "2023/24");
    }

    #[test]
    fn test_century_rollover() {
        let session: Session = "1999/00".parse().unwrap();
        assert_eq!(session.label(), "1999/00");
    }

    #[test]
    fn test_rejects_malformed_labels() {
        for bad in ["2023", "2023/25", "23/24", "2023-24", "abcd/ef", ""] {
            assert!(bad.parse::<Session>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_range() {
        let sessions = Session::range(2021, 2023).unwrap();
        let labels: Vec<String> = sessions.iter().map(Session::label).collect();
        assert_eq!(labels, vec!["2021/22", "2022/23", "2023/24"]);

        assert!(Session::range(2024, 2023).is_err());
    }
}
