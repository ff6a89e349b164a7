//! The aggregation pipeline: pure functions that turn a set of cleaned entries into the derived
//! views shown by reports.
//!
//! Every function here takes a slice of entries and returns a fresh value. Order of the input
//! does not matter except where noted for same-day entries in the running balance. Empty input
//! gives empty collections (and zero totals with `entries == 0`) so that callers can tell "no
//! data" apart from "data that sums to zero".

use crate::model::{Entry, Kind, Owner, View};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Income and expense sums over a set of entries.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// How many entries were aggregated.
    pub entries: usize,
    pub income: Decimal,
    pub expense: Decimal,
    /// Always `income - expense`.
    pub balance: Decimal,
}

impl Totals {
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// A calendar month, used as the grouping key for monthly views.
///
/// Ordering is chronological by `(year, month)` and does not depend on the string form, which is
/// the zero-padded `YYYY-MM`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// The period that `date` falls in.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let first_of_month = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid period '{s}', expected YYYY-MM: {e}"))?;
        Ok(Period::of(first_of_month))
    }
}

impl Serialize for Period {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Period::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Income and expense sums for one month.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFlow {
    pub period: Period,
    pub income: Decimal,
    pub expense: Decimal,
}

impl MonthlyFlow {
    pub fn net(&self) -> Decimal {
        self.income - self.expense
    }
}

/// The running balance after one entry.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: Decimal,
}

/// The balance accumulated up to and including a month.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub period: Period,
    pub cumulative_balance: Decimal,
}

/// Expense total for one category within one month.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCategory {
    pub period: Period,
    pub category: String,
    pub amount: Decimal,
}

/// The signed effect of an entry on the balance.
fn impact(entry: &Entry) -> Decimal {
    match entry.kind() {
        Kind::Income => entry.amount().value(),
        Kind::Expense => -entry.amount().value(),
    }
}

fn expenses(entries: &[Entry]) -> impl Iterator<Item = &Entry> {
    entries.iter().filter(|e| e.kind().is_expense())
}

/// Sums income and expense. `balance` is exactly `income - expense`.
pub fn compute_totals(entries: &[Entry]) -> Totals {
    let mut totals = Totals {
        entries: entries.len(),
        ..Totals::default()
    };
    for entry in entries {
        match entry.kind() {
            Kind::Income => totals.income += entry.amount().value(),
            Kind::Expense => totals.expense += entry.amount().value(),
        }
    }
    totals.balance = totals.income - totals.expense;
    totals
}

/// Expense totals per category. Categories are compared exactly as written.
pub fn compute_category_breakdown(entries: &[Entry]) -> BTreeMap<String, Decimal> {
    let mut breakdown = BTreeMap::new();
    for entry in expenses(entries) {
        *breakdown
            .entry(entry.category().to_string())
            .or_insert(Decimal::ZERO) += entry.amount().value();
    }
    breakdown
}

/// Income and expense per month, oldest first. A month with only one kind of entry reports zero
/// for the other.
pub fn compute_monthly_rollup(entries: &[Entry]) -> Vec<MonthlyFlow> {
    let mut months: BTreeMap<Period, MonthlyFlow> = BTreeMap::new();
    for entry in entries {
        let period = Period::of(entry.date());
        let flow = months.entry(period).or_insert(MonthlyFlow {
            period,
            income: Decimal::ZERO,
            expense: Decimal::ZERO,
        });
        match entry.kind() {
            Kind::Income => flow.income += entry.amount().value(),
            Kind::Expense => flow.expense += entry.amount().value(),
        }
    }
    // BTreeMap iterates in `Period` order, which is chronological
    months.into_values().collect()
}

/// One point per entry, ordered by date, holding the balance after that entry.
///
/// Entries sharing a date keep their input order. Only the value after the last entry of a day is
/// meaningful on its own.
pub fn compute_daily_running_balance(entries: &[Entry]) -> Vec<BalancePoint> {
    let mut sorted: Vec<&Entry> = entries.iter().collect();
    // `sort_by_key` is stable
    sorted.sort_by_key(|e| e.date());

    let mut balance = Decimal::ZERO;
    sorted
        .into_iter()
        .map(|entry| {
            balance += impact(entry);
            BalancePoint {
                date: entry.date(),
                balance,
            }
        })
        .collect()
}

/// The net of each month accumulated across months, oldest first.
pub fn compute_monthly_cumulative_balance(entries: &[Entry]) -> Vec<CumulativePoint> {
    let mut cumulative = Decimal::ZERO;
    compute_monthly_rollup(entries)
        .into_iter()
        .map(|flow| {
            cumulative += flow.net();
            CumulativePoint {
                period: flow.period,
                cumulative_balance: cumulative,
            }
        })
        .collect()
}

/// Expense totals per owner.
pub fn compute_owner_comparison(entries: &[Entry]) -> BTreeMap<Owner, Decimal> {
    let mut comparison = BTreeMap::new();
    for entry in expenses(entries) {
        *comparison
            .entry(entry.owner().clone())
            .or_insert(Decimal::ZERO) += entry.amount().value();
    }
    comparison
}

/// Expense totals per `(month, category)`, ordered by month and then category.
pub fn compute_monthly_category_breakdown(entries: &[Entry]) -> Vec<MonthlyCategory> {
    let mut groups: BTreeMap<(Period, String), Decimal> = BTreeMap::new();
    for entry in expenses(entries) {
        let key = (Period::of(entry.date()), entry.category().to_string());
        *groups.entry(key).or_insert(Decimal::ZERO) += entry.amount().value();
    }
    groups
        .into_iter()
        .map(|((period, category), amount)| MonthlyCategory {
            period,
            category,
            amount,
        })
        .collect()
}

/// Every derived view for one `View` of the ledger.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub view: View,
    pub totals: Totals,
    pub category_breakdown: BTreeMap<String, Decimal>,
    pub monthly_rollup: Vec<MonthlyFlow>,
    pub monthly_category_breakdown: Vec<MonthlyCategory>,
    pub daily_running_balance: Vec<BalancePoint>,
    pub monthly_cumulative_balance: Vec<CumulativePoint>,
    /// Only present for the couple view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_comparison: Option<BTreeMap<Owner, Decimal>>,
}

impl Report {
    /// Filters `entries` by `view` and runs every aggregation on the result.
    pub fn build(view: View, entries: &[Entry]) -> Self {
        let selected = view.filter(entries);
        let owner_comparison = view
            .is_couple()
            .then(|| compute_owner_comparison(&selected));
        Self {
            totals: compute_totals(&selected),
            category_breakdown: compute_category_breakdown(&selected),
            monthly_rollup: compute_monthly_rollup(&selected),
            monthly_category_breakdown: compute_monthly_category_breakdown(&selected),
            daily_running_balance: compute_daily_running_balance(&selected),
            monthly_cumulative_balance: compute_monthly_cumulative_balance(&selected),
            owner_comparison,
            view,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}
