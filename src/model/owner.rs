//! Owners of entries and the views that select which owners' entries are reported on.

use crate::model::Entry;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The label of the aggregate view over every owner. It is never stored as an owner.
pub const COUPLE: &str = "Couple";

/// Accepted spellings of the aggregate view, compared case-insensitively.
const COUPLE_ALIASES: &[&str] = &["couple", "casal"];

/// One of the individuals who records entries.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Owner(String);

impl Owner {
    pub fn name(&self) -> &str {
        &self.0
    }

    /// True when the name is one of the spellings of the aggregate view.
    fn is_group_label(name: &str) -> bool {
        COUPLE_ALIASES
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

impl FromStr for Owner {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            anyhow::bail!("An owner name must not be empty");
        }
        if Owner::is_group_label(name) {
            anyhow::bail!("'{name}' is the label of the combined view and cannot own an entry");
        }
        Ok(Self(name.to_string()))
    }
}

impl TryFrom<String> for Owner {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Owner::from_str(&value)
    }
}

impl From<Owner> for String {
    fn from(owner: Owner) -> Self {
        owner.0
    }
}

impl Display for Owner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Owner {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which slice of the ledger to report on.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Only the entries of one owner.
    Individual(Owner),
    /// Every entry, regardless of owner.
    #[default]
    Couple,
}

impl View {
    /// Applies the view to `entries`. This is the only place where the individual and couple
    /// views differ; everything downstream runs the same aggregations on the result.
    pub fn filter(&self, entries: &[Entry]) -> Vec<Entry> {
        match self {
            View::Individual(owner) => entries
                .iter()
                .filter(|e| e.owner() == owner)
                .cloned()
                .collect(),
            View::Couple => entries.to_vec(),
        }
    }

    pub fn is_couple(&self) -> bool {
        matches!(self, View::Couple)
    }
}

impl FromStr for View {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Owner::is_group_label(s.trim()) {
            Ok(View::Couple)
        } else {
            Ok(View::Individual(Owner::from_str(s)?))
        }
    }
}

impl Display for View {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            View::Individual(owner) => Display::fmt(owner, f),
            View::Couple => f.write_str(COUPLE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Kind};
    use chrono::NaiveDate;

    fn entry(owner: &str) -> Entry {
        Entry::new(
            owner.parse().unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            Kind::Expense,
            "Food",
            Amount::from_str("10").unwrap(),
        )
    }

    #[test]
    fn test_owner_is_trimmed() {
        let owner = Owner::from_str("  Carol ").unwrap();
        assert_eq!(owner.name(), "Carol");
    }

    #[test]
    fn test_owner_rejects_empty_and_group_label() {
        assert!(Owner::from_str("  ").is_err());
        assert!(Owner::from_str("Couple").is_err());
        assert!(Owner::from_str("casal").is_err());
    }

    #[test]
    fn test_owner_deserialize_validates() {
        let owner: Owner = serde_json::from_str("\" Carol \"").unwrap();
        assert_eq!(owner.name(), "Carol");
        assert!(serde_json::from_str::<Owner>("\"Couple\"").is_err());
        assert!(serde_json::from_str::<Owner>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&owner).unwrap(), "\"Carol\"");
    }

    #[test]
    fn test_view_from_str() {
        assert_eq!(View::from_str("COUPLE").unwrap(), View::Couple);
        assert_eq!(View::from_str("Casal").unwrap(), View::Couple);
        assert_eq!(
            View::from_str("Marcio").unwrap(),
            View::Individual(Owner::from_str("Marcio").unwrap())
        );
    }

    #[test]
    fn test_view_filter() {
        let entries = vec![entry("Carol"), entry("Marcio"), entry("Carol")];

        let carol = View::from_str("Carol").unwrap().filter(&entries);
        assert_eq!(carol.len(), 2);
        assert!(carol.iter().all(|e| e.owner().name() == "Carol"));

        let both = View::Couple.filter(&entries);
        assert_eq!(both, entries);

        let nobody = View::from_str("Alex").unwrap().filter(&entries);
        assert!(nobody.is_empty());
    }
}
