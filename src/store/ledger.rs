//! Implements the `Ledger` trait on top of a `Sheet`.

use crate::error::Res;
use crate::model::{Entries, Entry, EntryColumn};
use crate::store::{Ledger, Sheet};
use tracing::{debug, info};

/// Reads and appends entries in one worksheet of a `Sheet`.
pub(super) struct LedgerImpl {
    sheet: Box<dyn Sheet + Send>,
    worksheet: String,
}

impl LedgerImpl {
    /// Create a new `LedgerImpl` that uses a dynamically-dispatched `sheet` to get and send its
    /// data.
    pub(super) fn new(sheet: Box<dyn Sheet + Send>, worksheet: impl Into<String>) -> Self {
        Self {
            sheet,
            worksheet: worksheet.into(),
        }
    }
}

#[async_trait::async_trait]
impl Ledger for LedgerImpl {
    async fn load_entries(&mut self) -> Res<Entries> {
        let rows = self.sheet.get(&self.worksheet).await?;
        let entries = Entries::parse(rows);
        debug!(
            "Loaded {} entries from {}, dropped {} rows",
            entries.data().len(),
            self.worksheet,
            entries.dropped().len()
        );
        Ok(entries)
    }

    async fn append_entry(&mut self, entry: &Entry) -> Res<()> {
        let existing = self.sheet.get(&self.worksheet).await?;

        let mut rows = Vec::with_capacity(2);
        if last_used_row(&existing) == 0 {
            info!("The {} worksheet is empty, writing the header row", self.worksheet);
            rows.push(EntryColumn::header_row());
        }
        rows.push(entry.to_row());

        self.sheet.append_rows(&self.worksheet, &rows).await?;
        debug!("Appended entry for {} to {}", entry.owner(), self.worksheet);
        Ok(())
    }
}

/// The 1-based number of the last row with any non-blank cell, or 0 for an empty sheet.
fn last_used_row(rows: &[Vec<String>]) -> usize {
    rows.iter()
        .rposition(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|ix| ix + 1)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Kind, Owner};
    use crate::store::TestSheet;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;

    const WORKSHEET: &str = "Sheet1";

    fn entry(owner: &str, kind: Kind, amount: &str) -> Entry {
        Entry::new(
            Owner::from_str(owner).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            kind,
            "Food",
            Amount::from_str(amount).unwrap(),
        )
        .with_payment_method("Pix")
    }

    #[test]
    fn test_last_used_row() {
        let s = |v: &str| v.to_string();
        assert_eq!(last_used_row(&[]), 0);
        assert_eq!(last_used_row(&[vec![s("a")], vec![], vec![s(" ")]]), 1);
        assert_eq!(last_used_row(&[vec![], vec![s("b")]]), 2);
    }

    #[tokio::test]
    async fn test_load_seeded() {
        let mut ledger = LedgerImpl::new(Box::new(TestSheet::seeded(WORKSHEET)), WORKSHEET);
        let entries = ledger.load_entries().await.unwrap();
        assert_eq!(entries.data().len(), 19);
        assert_eq!(entries.dropped().len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_worksheet_is_an_error() {
        let mut ledger = LedgerImpl::new(Box::new(TestSheet::seeded(WORKSHEET)), "Missing");
        assert!(ledger.load_entries().await.is_err());
    }

    #[tokio::test]
    async fn test_load_empty_worksheet() {
        let mut ledger = LedgerImpl::new(Box::new(TestSheet::empty(WORKSHEET)), WORKSHEET);
        let entries = ledger.load_entries().await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_append_to_empty_writes_header() {
        let mut ledger = LedgerImpl::new(Box::new(TestSheet::empty(WORKSHEET)), WORKSHEET);
        ledger
            .append_entry(&entry("Carol", Kind::Income, "1000"))
            .await
            .unwrap();
        ledger
            .append_entry(&entry("Marcio", Kind::Expense, "200.5"))
            .await
            .unwrap();

        let entries = ledger.load_entries().await.unwrap();
        assert_eq!(entries.data().len(), 2);
        assert_eq!(entries.data()[1].amount().value(), Decimal::from_str("200.5").unwrap());
        assert_eq!(entries.data()[1].payment_method(), "Pix");
    }

    #[tokio::test]
    async fn test_append_after_last_row() {
        let mut data = HashMap::new();
        data.insert(
            WORKSHEET.to_string(),
            vec![EntryColumn::header_row(), entry("Carol", Kind::Income, "5").to_row()],
        );
        let sheet = TestSheet::new(data);
        let mut ledger = LedgerImpl::new(Box::new(sheet), WORKSHEET);
        ledger
            .append_entry(&entry("Marcio", Kind::Expense, "3"))
            .await
            .unwrap();

        let rows = ledger.sheet.get(WORKSHEET).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], EntryColumn::header_row());
        assert_eq!(rows[2][1], "Marcio");
        assert_eq!(rows[2][6], "3.00");
    }

    #[tokio::test]
    async fn test_two_ledgers_append_to_one_sheet() {
        let sheet = TestSheet::seeded(WORKSHEET);
        let mut carol = LedgerImpl::new(Box::new(sheet.clone()), WORKSHEET);
        let mut marcio = LedgerImpl::new(Box::new(sheet), WORKSHEET);

        let before = carol.load_entries().await.unwrap().data().len();
        let (carol_entry, marcio_entry) = (
            entry("Carol", Kind::Expense, "10"),
            entry("Marcio", Kind::Expense, "20"),
        );
        let (a, b) = tokio::join!(
            carol.append_entry(&carol_entry),
            marcio.append_entry(&marcio_entry),
        );
        a.unwrap();
        b.unwrap();

        let entries = carol.load_entries().await.unwrap();
        assert_eq!(entries.data().len(), before + 2);
        let owners: Vec<&str> = entries.data()[before..]
            .iter()
            .map(|e| e.owner().name())
            .collect();
        assert!(owners.contains(&"Carol"));
        assert!(owners.contains(&"Marcio"));
    }
}
