//! Access to the ledger worksheet.
//!
//! The `Sheet` trait is a thin wrapper over the spreadsheet API so that the rest of the program can
//! be run against in-memory data. The `Ledger` trait sits on top of it and speaks in `Entry`
//! values.

mod files;
mod ledger;
mod oauth;
mod sheet;
mod test_sheet;

use crate::error::Res;
use crate::model::{Entries, Entry};
use crate::Config;
use ledger::LedgerImpl;
use sheet::GoogleSheet;
use std::fmt::{Display, Formatter};

pub(crate) use oauth::TokenProvider;
pub(crate) use test_sheet::TestSheet;

/// OAuth scopes required for reading and appending to the ledger sheet.
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// When this environment variable is set and non-empty, `Mode::from_env` returns `Mode::Test`.
pub const TEST_MODE_ENV: &str = "LEDGER_IN_TEST_MODE";

/// Selects whether we talk to Google or to in-memory data.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    /// `Mode::Test` when `LEDGER_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Mode::Test)
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Google => f.write_str("google"),
            Mode::Test => f.write_str("test"),
        }
    }
}

/// The minimal set of worksheet operations the ledger needs.
#[async_trait::async_trait]
pub(crate) trait Sheet {
    /// Returns every non-empty row of `sheet_name` as formatted strings. Trailing empty cells are
    /// omitted by the API, so rows can be shorter than the header.
    async fn get(&mut self, sheet_name: &str) -> Res<Vec<Vec<String>>>;

    /// Appends `rows` after the last row with data, starting at column A. The position is chosen
    /// by the store when the rows are written, so concurrent appends do not overwrite each other.
    async fn append_rows(&mut self, sheet_name: &str, rows: &[Vec<String>]) -> Res<()>;
}

/// Reads and appends ledger entries.
#[async_trait::async_trait]
pub trait Ledger {
    /// Fetches every row, cleans it, and returns the valid entries along with the rows that were
    /// dropped. An empty or header-only worksheet gives an empty `Entries`.
    async fn load_entries(&mut self) -> Res<Entries>;

    /// Persists `entry` as a new row after the last used row. Writes a header row first when the
    /// worksheet is empty.
    async fn append_entry(&mut self, entry: &Entry) -> Res<()>;
}

/// Creates the `Sheet` for `mode`. In `Mode::Google` this loads and refreshes the OAuth token.
pub(crate) async fn sheet(config: &Config, mode: Mode) -> Res<Box<dyn Sheet + Send>> {
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            let google = GoogleSheet::new(config.spreadsheet_id(), token_provider).await?;
            Ok(Box::new(google))
        }
        Mode::Test => Ok(Box::new(TestSheet::seeded(config.worksheet()))),
    }
}

/// Creates a `Ledger` that reads and writes `config.worksheet()` through `sheet`.
pub(crate) fn ledger(config: &Config, sheet: Box<dyn Sheet + Send>) -> Box<dyn Ledger + Send> {
    Box::new(LedgerImpl::new(sheet, config.worksheet()))
}
