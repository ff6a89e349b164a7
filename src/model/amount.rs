//! Amount type for handling non-negative monetary values.
//!
//! Amounts are stored in the sheet as plain two-decimal strings like `1234.50`, but rows written by
//! hand (or by older versions of the app) may carry a currency prefix and thousands separators, so
//! parsing is lenient about those.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Currency prefixes that are stripped before parsing.
const CURRENCY_PREFIXES: &[&str] = &["R$", "$"];

/// Represents the magnitude of an entry. The direction of the money (in or out) comes from the
/// entry's `Kind`, never from the sign, so an `Amount` is always `>= 0`.
///
/// # Examples
///
/// ```
/// # use couple_ledger::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("R$ 1,250.5").unwrap();
/// assert_eq!(amount.to_string(), "1,250.50");
/// assert_eq!(amount.to_sheet_string(), "1250.50");
/// ```
///
/// Negative values are rejected:
/// ```
/// # use couple_ledger::model::Amount;
/// # use std::str::FromStr;
/// assert!(Amount::from_str("-5.00").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Creates a new `Amount`, returning an error if `value` is negative.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The representation written to the sheet: two decimals, no separators, e.g. `1234.50`.
    pub fn to_sheet_string(&self) -> String {
        let mut value = self.0.round_dp(2);
        value.rescale(2);
        value.to_string()
    }
}

/// Formats a monetary value for display with thousands separators and two decimals, e.g.
/// `-1,234.50`.
pub fn format_money(value: Decimal) -> String {
    format_num::format_num!(",.2", value.round_dp(2).to_f64().unwrap_or_default())
}

/// An error that can occur when parsing strings into `Amount` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The string was empty after trimming.
    Empty,
    /// The string was not a number. Holds the parser's message.
    Invalid(String),
    /// The number was negative.
    Negative(Decimal),
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Empty => f.write_str("the amount is empty"),
            AmountError::Invalid(e) => write!(f, "the amount is not a number ({e})"),
            AmountError::Negative(d) => write!(f, "the amount {d} is negative"),
        }
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        // Keep the sign aside so that "-$5.00" is recognized as negative rather than invalid
        let (minus, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => ("-", rest.trim_start()),
            None => ("", trimmed),
        };

        let without_currency = CURRENCY_PREFIXES
            .iter()
            .find_map(|prefix| unsigned.strip_prefix(prefix))
            .unwrap_or(unsigned)
            .trim_start();

        let without_commas = strip_thousands_separators(without_currency)?;

        let value = Decimal::from_str(&format!("{minus}{without_commas}"))
            .map_err(|e| AmountError::Invalid(e.to_string()))?;
        Amount::new(value)
    }
}

/// Removes `,` thousands separators. A comma is only accepted between groups of three digits in
/// the integer part, so `1.234,56` and `50,00` (decimal-comma formats) are rejected instead of
/// being read as a different number.
fn strip_thousands_separators(s: &str) -> Result<String, AmountError> {
    if !s.contains(',') {
        return Ok(s.to_string());
    }
    let (integer, fraction) = match s.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (s, None),
    };
    let misplaced = || AmountError::Invalid(format!("misplaced thousands separator in '{s}'"));

    let mut groups = integer.split(',');
    let first = groups.next().unwrap_or_default();
    let is_digits = |g: &str| g.chars().all(|c| c.is_ascii_digit());
    if first.is_empty() || first.len() > 3 || !is_digits(first) {
        return Err(misplaced());
    }
    if !groups.all(|g| g.len() == 3 && is_digits(g)) {
        return Err(misplaced());
    }
    if fraction.is_some_and(|f| f.contains(',')) {
        return Err(misplaced());
    }
    Ok(s.replace(',', ""))
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&format_money(self.0))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_sheet_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
