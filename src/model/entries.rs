use crate::model::entry::{RawRow, COLUMN_COUNT};
use crate::model::{DropReason, Entry, EntryColumn};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The result of reading a ledger sheet: the rows that are valid for analytics, and a record of
/// every row that was left out and why.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Entries {
    data: Vec<Entry>,
    dropped: Vec<DroppedRow>,
}

/// A sheet row that could not be turned into an `Entry`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DroppedRow {
    /// The 1-based row number as shown in the spreadsheet UI.
    pub row: usize,
    pub reason: DropReason,
}

/// How the cells of a row map to columns.
enum Layout {
    /// The sheet has a header row; `columns[i]` is the column of cell `i`, or `None` for cells
    /// under headers we do not know.
    Headers(Vec<Option<EntryColumn>>),
    /// No header row; cells follow `EntryColumn::LAYOUT`.
    Positional,
}

impl Layout {
    /// A first row is taken to be a header row when it names both the date and amount columns.
    fn detect(first_row: &[String]) -> Option<Self> {
        let columns: Vec<Option<EntryColumn>> = first_row
            .iter()
            .map(|cell| EntryColumn::from_header(cell).ok())
            .collect();
        let has = |wanted: EntryColumn| columns.iter().any(|c| *c == Some(wanted));
        if has(EntryColumn::Date) && has(EntryColumn::Amount) {
            Some(Layout::Headers(columns))
        } else {
            None
        }
    }

    fn column(&self, ix: usize) -> Option<EntryColumn> {
        match self {
            Layout::Headers(columns) => columns.get(ix).copied().flatten(),
            Layout::Positional => EntryColumn::LAYOUT.get(ix).copied(),
        }
    }
}

impl Entries {
    /// Given the downloaded cells of the ledger sheet, parse every row into an `Entry`. Rows that
    /// fail validation are dropped and recorded rather than failing the whole load; fully blank
    /// rows are skipped silently.
    ///
    /// Both `sheet_data` layouts are accepted: with a header row (current or legacy headers, in any
    /// order) or without one, in which case cells are read in `EntryColumn::LAYOUT` order.
    pub fn parse<S, R, I>(sheet_data: I) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = S>,
        I: IntoIterator<Item = R>,
    {
        let rows: Vec<Vec<String>> = sheet_data
            .into_iter()
            .map(|row| row.into_iter().map(|s| s.into()).collect())
            .collect();

        let (layout, first_data_row) = match rows.first().and_then(|r| Layout::detect(r)) {
            Some(layout) => (layout, 1),
            None => (Layout::Positional, 0),
        };

        let mut entries = Entries::default();
        for (ix, values) in rows.into_iter().enumerate().skip(first_data_row) {
            let sheet_row = ix + 1;
            if matches!(layout, Layout::Positional) && values.len() > COLUMN_COUNT {
                debug!("Row {sheet_row} has extra cells beyond the ledger layout, ignoring them");
            }

            let mut raw = RawRow::default();
            for (col_ix, value) in values.into_iter().enumerate() {
                if let Some(column) = layout.column(col_ix) {
                    raw.set(column, value);
                }
            }
            if raw.is_blank() {
                continue;
            }

            match Entry::try_from(raw) {
                Ok(entry) => entries.data.push(entry),
                Err(reason) => {
                    warn!("Skipping row {sheet_row}: {reason}");
                    entries.dropped.push(DroppedRow {
                        row: sheet_row,
                        reason,
                    });
                }
            }
        }
        entries
    }

    pub fn data(&self) -> &Vec<Entry> {
        &self.data
    }

    pub fn dropped(&self) -> &[DroppedRow] {
        &self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
