use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Whether money came in or went out. The sign of an entry's amount is derived from this.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum Kind {
    Income,
    Expense,
}

/// Labels written by the first, Portuguese-language version of the sheet.
const LEGACY_INCOME: &str = "receita";
const LEGACY_EXPENSE: &str = "despesa";

impl Kind {
    /// The label stored in the sheet.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Income => "Income",
            Kind::Expense => "Expense",
        }
    }

    pub fn is_expense(&self) -> bool {
        matches!(self, Kind::Expense)
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Kind {
    type Err = anyhow::Error;

    /// Case-insensitive, and also accepts the legacy `Receita`/`Despesa` labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | LEGACY_INCOME => Ok(Kind::Income),
            "expense" | LEGACY_EXPENSE => Ok(Kind::Expense),
            bad => anyhow::bail!("Unknown entry kind '{bad}', expected Income or Expense"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!(Kind::from_str("Income").unwrap(), Kind::Income);
        assert_eq!(Kind::from_str(" expense ").unwrap(), Kind::Expense);
        assert_eq!(Kind::from_str("EXPENSE").unwrap(), Kind::Expense);
    }

    #[test]
    fn test_kind_from_legacy_label() {
        assert_eq!(Kind::from_str("Receita").unwrap(), Kind::Income);
        assert_eq!(Kind::from_str("Despesa").unwrap(), Kind::Expense);
    }

    #[test]
    fn test_kind_rejects_other_values() {
        assert!(Kind::from_str("Transfer").is_err());
        assert!(Kind::from_str("").is_err());
    }

    #[test]
    fn test_kind_label_roundtrip() {
        for kind in [Kind::Income, Kind::Expense] {
            assert_eq!(Kind::from_str(kind.label()).unwrap(), kind);
        }
    }
}
