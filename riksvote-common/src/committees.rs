//! Committee lookup table
//!
//! Maps committee codes (the alphabetic prefix of a report designation, e.g.
//! `AU` in `AU10`) to committee names. Built once at startup from the
//! compiled-in table plus any TOML overrides, then passed explicitly to the
//! components that need it.

use std::collections::BTreeMap;

/// Built-in Riksdag committees, current and historical
const BUILTIN_COMMITTEES: &[(&str, &str)] = &[
    ("AU", "Arbetsmarknadsutskottet"),
    ("BoU", "Bostadsutskottet"),
    ("CU", "Civilutskottet"),
    ("FiU", "Finansutskottet"),
    ("FöU", "Försvarsutskottet"),
    ("JoU", "Jordbruksutskottet"),
    ("JuU", "Justitieutskottet"),
    ("KrU", "Kulturutskottet"),
    ("KU", "Konstitutionsutskottet"),
    ("LU", "Lagutskottet"),
    ("MJU", "Miljö- och jordbruksutskottet"),
    ("NU", "Näringsutskottet"),
    ("SfU", "Socialförsäkringsutskottet"),
    ("SkU", "Skatteutskottet"),
    ("SoU", "Socialutskottet"),
    ("TU", "Trafikutskottet"),
    ("UbU", "Utbildningsutskottet"),
    ("UFöU", "Sammansatta utrikes- och försvarsutskottet"),
    ("UU", "Utrikesutskottet"),
];

/// Immutable committee code → name table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committees {
    by_code: BTreeMap<String, String>,
}

impl Committees {
    /// Table containing only the built-in committees
    pub fn builtin() -> Self {
        Self {
            by_code: BUILTIN_COMMITTEES
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        }
    }

    /// Built-in table extended (or overridden) by configured entries
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut committees = Self::builtin();
        for (code, name) in overrides {
            committees.by_code.insert(code.into(), name.into());
        }
        committees
    }

    /// Committee name for a code (case-insensitive)
    pub fn name(&self, code: &str) -> Option<&str> {
        self.canonical(code)
            .and_then(|canonical| self.by_code.get(canonical))
            .map(String::as_str)
    }

    /// Number of known committees
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Committee code for a report designation
    ///
    /// Uses the longest known code that prefixes the designation's alphabetic
    /// part; unknown prefixes are returned verbatim. Returns `None` when the
    /// designation has no alphabetic prefix at all.
    pub fn committee_for_designation(&self, designation: &str) -> Option<String> {
        let prefix: String = designation
            .trim()
            .chars()
            .take_while(|c| c.is_alphabetic())
            .collect();

        if prefix.is_empty() {
            return None;
        }

        let prefix_lower = prefix.to_lowercase();
        let known = self
            .by_code
            .keys()
            .filter(|code| prefix_lower.starts_with(&code.to_lowercase()))
            .max_by_key(|code| code.chars().count());

        Some(known.cloned().unwrap_or(prefix))
    }

    fn canonical(&self, code: &str) -> Option<&str> {
        let wanted = code.to_lowercase();
        self.by_code
            .keys()
            .find(|known| known.to_lowercase() == wanted)
            .map(String::as_str)
    }
}

impl Default for Committees {
    fn default() -> Self {
        Self::builtin()
    }
}
