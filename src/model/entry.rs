use crate::model::{Amount, Kind, Owner};
use anyhow::bail;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Represents a single income or expense row from the ledger sheet.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Entry {
    /// When the row was recorded. Kept for auditing only and never parsed.
    timestamp: String,
    owner: Owner,
    date: NaiveDate,
    kind: Kind,
    category: String,
    description: String,
    amount: Amount,
    payment_method: String,
}

impl Entry {
    /// Creates an entry stamped with the current local time. `description` and `payment_method`
    /// start out empty.
    pub fn new(
        owner: Owner,
        date: NaiveDate,
        kind: Kind,
        category: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            owner,
            date,
            kind,
            category: category.into(),
            description: String::new(),
            amount,
            payment_method: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = payment_method.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    /// The row written to the sheet, in the order of `EntryColumn::LAYOUT`.
    pub fn to_row(&self) -> Vec<String> {
        EntryColumn::LAYOUT
            .iter()
            .map(|column| match column {
                EntryColumn::Timestamp => self.timestamp.clone(),
                EntryColumn::Owner => self.owner.to_string(),
                EntryColumn::Date => self.date.format(DATE_FORMAT).to_string(),
                EntryColumn::Kind => self.kind.label().to_string(),
                EntryColumn::Category => self.category.clone(),
                EntryColumn::Description => self.description.clone(),
                EntryColumn::Amount => self.amount.to_sheet_string(),
                EntryColumn::PaymentMethod => self.payment_method.clone(),
            })
            .collect()
    }
}

/// The columns of the ledger sheet.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryColumn {
    Timestamp,
    Owner,
    Date,
    Kind,
    Category,
    Description,
    Amount,
    PaymentMethod,
}

serde_plain::derive_display_from_serialize!(EntryColumn);
serde_plain::derive_fromstr_from_deserialize!(EntryColumn);

impl EntryColumn {
    /// The order in which columns are written to the sheet.
    pub const LAYOUT: [EntryColumn; COLUMN_COUNT] = [
        EntryColumn::Timestamp,
        EntryColumn::Owner,
        EntryColumn::Date,
        EntryColumn::Kind,
        EntryColumn::Category,
        EntryColumn::Description,
        EntryColumn::Amount,
        EntryColumn::PaymentMethod,
    ];

    /// Recognizes both the current headers and the ones written by the original sheet. Matching
    /// ignores case and surrounding whitespace.
    pub fn from_header(header: impl AsRef<str>) -> crate::error::Res<EntryColumn> {
        let header = header.as_ref().trim();
        let column = EntryColumn::LAYOUT.iter().find(|column| {
            column.header().eq_ignore_ascii_case(header)
                || column.legacy_header().eq_ignore_ascii_case(header)
        });
        match column {
            Some(column) => Ok(*column),
            None => bail!("Invalid ledger column name '{header}'"),
        }
    }

    /// The header written to an empty sheet.
    pub fn header(&self) -> &'static str {
        match self {
            EntryColumn::Timestamp => TIMESTAMP_STR,
            EntryColumn::Owner => OWNER_STR,
            EntryColumn::Date => DATE_STR,
            EntryColumn::Kind => KIND_STR,
            EntryColumn::Category => CATEGORY_STR,
            EntryColumn::Description => DESCRIPTION_STR,
            EntryColumn::Amount => AMOUNT_STR,
            EntryColumn::PaymentMethod => PAYMENT_METHOD_STR,
        }
    }

    fn legacy_header(&self) -> &'static str {
        match self {
            EntryColumn::Timestamp => TIMESTAMP_STR,
            EntryColumn::Owner => LEGACY_OWNER_STR,
            EntryColumn::Date => LEGACY_DATE_STR,
            EntryColumn::Kind => LEGACY_KIND_STR,
            EntryColumn::Category => LEGACY_CATEGORY_STR,
            EntryColumn::Description => LEGACY_DESCRIPTION_STR,
            EntryColumn::Amount => LEGACY_AMOUNT_STR,
            EntryColumn::PaymentMethod => LEGACY_PAYMENT_METHOD_STR,
        }
    }

    /// The header row written to an empty sheet.
    pub fn header_row() -> Vec<String> {
        EntryColumn::LAYOUT
            .iter()
            .map(|c| c.header().to_string())
            .collect()
    }
}

pub(super) const COLUMN_COUNT: usize = 8;

pub(super) const TIMESTAMP_STR: &str = "Timestamp";
pub(super) const OWNER_STR: &str = "Owner";
pub(super) const DATE_STR: &str = "Date";
pub(super) const KIND_STR: &str = "Kind";
pub(super) const CATEGORY_STR: &str = "Category";
pub(super) const DESCRIPTION_STR: &str = "Description";
pub(super) const AMOUNT_STR: &str = "Amount";
pub(super) const PAYMENT_METHOD_STR: &str = "Payment Method";

pub(super) const LEGACY_OWNER_STR: &str = "Usuario";
pub(super) const LEGACY_DATE_STR: &str = "Data";
pub(super) const LEGACY_KIND_STR: &str = "Tipo";
pub(super) const LEGACY_CATEGORY_STR: &str = "Categoria";
pub(super) const LEGACY_DESCRIPTION_STR: &str = "Descricao";
pub(super) const LEGACY_AMOUNT_STR: &str = "Valor";
pub(super) const LEGACY_PAYMENT_METHOD_STR: &str = "Forma_pgto";

/// The date format written to the sheet.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The format of the `Timestamp` column, in local time.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a date cell. `YYYY-MM-DD` is what we write, the other forms show up when a row was typed
/// into the sheet by hand or a timestamp ended up in the date column.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
}

/// The raw cell values of one sheet row, before validation.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct RawRow {
    pub(crate) timestamp: String,
    pub(crate) owner: String,
    pub(crate) date: String,
    pub(crate) kind: String,
    pub(crate) category: String,
    pub(crate) description: String,
    pub(crate) amount: String,
    pub(crate) payment_method: String,
}

impl RawRow {
    pub(crate) fn set(&mut self, column: EntryColumn, value: impl Into<String>) {
        let value = value.into();
        match column {
            EntryColumn::Timestamp => self.timestamp = value,
            EntryColumn::Owner => self.owner = value,
            EntryColumn::Date => self.date = value,
            EntryColumn::Kind => self.kind = value,
            EntryColumn::Category => self.category = value,
            EntryColumn::Description => self.description = value,
            EntryColumn::Amount => self.amount = value,
            EntryColumn::PaymentMethod => self.payment_method = value,
        }
    }

    /// True when every cell is blank.
    pub(crate) fn is_blank(&self) -> bool {
        [
            &self.timestamp,
            &self.owner,
            &self.date,
            &self.kind,
            &self.category,
            &self.description,
            &self.amount,
            &self.payment_method,
        ]
        .iter()
        .all(|s| s.trim().is_empty())
    }
}

/// Why a row was left out of the analytics set.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum DropReason {
    MissingField(EntryColumn),
    InvalidOwner(String),
    InvalidDate(String),
    InvalidKind(String),
    InvalidAmount(String),
}

impl Display for DropReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::MissingField(column) => write!(f, "the {column} cell is empty"),
            DropReason::InvalidOwner(s) => write!(f, "'{s}' is not a valid owner"),
            DropReason::InvalidDate(s) => write!(f, "'{s}' is not a valid date"),
            DropReason::InvalidKind(s) => write!(f, "'{s}' is neither Income nor Expense"),
            DropReason::InvalidAmount(s) => write!(f, "invalid amount: {s}"),
        }
    }
}

impl TryFrom<RawRow> for Entry {
    type Error = DropReason;

    fn try_from(row: RawRow) -> Result<Self, Self::Error> {
        let required = [
            (EntryColumn::Owner, &row.owner),
            (EntryColumn::Date, &row.date),
            (EntryColumn::Kind, &row.kind),
            (EntryColumn::Amount, &row.amount),
        ];
        if let Some((column, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(DropReason::MissingField(*column));
        }

        let owner =
            Owner::from_str(&row.owner).map_err(|_| DropReason::InvalidOwner(row.owner.clone()))?;
        let date = parse_date(&row.date).ok_or_else(|| DropReason::InvalidDate(row.date.clone()))?;
        let kind =
            Kind::from_str(&row.kind).map_err(|_| DropReason::InvalidKind(row.kind.clone()))?;
        let amount = Amount::from_str(&row.amount)
            .map_err(|e| DropReason::InvalidAmount(format!("'{}': {e}", row.amount)))?;

        Ok(Entry {
            timestamp: row.timestamp.trim().to_string(),
            owner,
            date,
            kind,
            category: row.category.trim().to_string(),
            description: row.description.trim().to_string(),
            amount,
            payment_method: row.payment_method.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: [&str; COLUMN_COUNT]) -> RawRow {
        let mut row = RawRow::default();
        for (column, value) in EntryColumn::LAYOUT.iter().zip(values) {
            row.set(*column, value);
        }
        row
    }

    #[test]
    fn test_from_header() {
        assert_eq!(
            EntryColumn::from_header("Payment Method").unwrap(),
            EntryColumn::PaymentMethod
        );
        assert_eq!(
            EntryColumn::from_header("valor").unwrap(),
            EntryColumn::Amount
        );
        assert_eq!(
            EntryColumn::from_header(" Usuario ").unwrap(),
            EntryColumn::Owner
        );
        assert!(EntryColumn::from_header("Notes").is_err());
    }

    #[test]
    fn test_column_display() {
        assert_eq!(EntryColumn::PaymentMethod.to_string(), "payment_method");
    }

    #[test]
    fn test_parse_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09"), Some(expected));
        assert_eq!(parse_date("2024-03-09 13:45:00"), Some(expected));
        assert_eq!(parse_date("3/9/2024"), Some(expected));
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_entry_from_raw_row() {
        let row = raw([
            "2024-01-05 10:00:00",
            "Carol",
            "2024-01-05",
            "Receita",
            "Salary",
            "January pay",
            "1,000.00",
            "Transfer",
        ]);
        let entry = Entry::try_from(row).unwrap();
        assert_eq!(entry.owner().name(), "Carol");
        assert_eq!(entry.kind(), Kind::Income);
        assert_eq!(entry.amount().to_sheet_string(), "1000.00");
        assert_eq!(entry.payment_method(), "Transfer");
    }

    #[test]
    fn test_entry_from_raw_row_drops() {
        let missing = raw(["", "Carol", "2024-01-05", "Income", "", "", "", ""]);
        assert_eq!(
            Entry::try_from(missing),
            Err(DropReason::MissingField(EntryColumn::Amount))
        );

        let bad_date = raw(["", "Carol", "someday", "Income", "", "", "5", ""]);
        assert_eq!(
            Entry::try_from(bad_date),
            Err(DropReason::InvalidDate("someday".to_string()))
        );

        let bad_kind = raw(["", "Carol", "2024-01-05", "Refund", "", "", "5", ""]);
        assert!(matches!(
            Entry::try_from(bad_kind),
            Err(DropReason::InvalidKind(_))
        ));

        let bad_amount = raw(["", "Carol", "2024-01-05", "Expense", "", "", "abc", ""]);
        assert!(matches!(
            Entry::try_from(bad_amount),
            Err(DropReason::InvalidAmount(_))
        ));

        let negative = raw(["", "Carol", "2024-01-05", "Expense", "", "", "-5", ""]);
        assert!(matches!(
            Entry::try_from(negative),
            Err(DropReason::InvalidAmount(_))
        ));

        let group = raw(["", "Casal", "2024-01-05", "Expense", "", "", "5", ""]);
        assert!(matches!(
            Entry::try_from(group),
            Err(DropReason::InvalidOwner(_))
        ));
    }

    #[test]
    fn test_to_row_layout() {
        let entry = Entry::new(
            Owner::from_str("Marcio").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            Kind::Expense,
            "Food",
            Amount::from_str("50").unwrap(),
        )
        .with_description("Groceries")
        .with_payment_method("Pix")
        .with_timestamp("2024-02-01 18:00:00");

        assert_eq!(
            entry.to_row(),
            vec![
                "2024-02-01 18:00:00",
                "Marcio",
                "2024-02-01",
                "Expense",
                "Food",
                "Groceries",
                "50.00",
                "Pix"
            ]
        );
    }

    #[test]
    fn test_header_row() {
        assert_eq!(
            EntryColumn::header_row(),
            vec![
                "Timestamp",
                "Owner",
                "Date",
                "Kind",
                "Category",
                "Description",
                "Amount",
                "Payment Method"
            ]
        );
    }
}
