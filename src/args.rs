//! These structs provide the CLI interface for the ledger CLI.

use crate::commands::OutputFormat;
use crate::model::{Amount, Kind, View};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// ledger: A command-line tool for a couple's shared finances.
///
/// Entries (income and expenses) are kept in a Google sheet so that both people can add to it.
/// This program appends new entries to the sheet and reports on them: totals, expenses by
/// category, monthly income and expenses, running balances and a comparison between owners. It
/// can also ask an OpenAI-compatible service for a short written insight about the data.
///
/// You will need to set up a Google OAuth client for the Sheets API. Run `ledger init` first and
/// then `ledger auth`.
#[derive(Debug, Parser, Clone)]
#[command(name = "ledger", version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run. You need two things beforehand:
    ///
    /// - The URL of the Google sheet that holds (or will hold) the ledger, passed as --sheet-url.
    ///
    /// - An OAuth client of type "Desktop app" created in the Google Cloud Console, with
    ///   http://localhost as a redirect URI. Download its JSON and pass the path as
    ///   --client-secret. The file is moved into the data directory.
    ///
    /// Owners, suggested categories and the insight service can be changed afterwards in
    /// config.json.
    Init(InitArgs),
    /// Authenticate with Google Sheets via OAuth.
    Auth(AuthArgs),
    /// Append a new income or expense entry to the sheet.
    Add(AddArgs),
    /// Show totals, category breakdowns and balances for one owner or for the couple.
    Report(ReportArgs),
    /// Ask the text-completion service for an insight about the entries.
    Insight(InsightArgs),
    /// List the configured owners, suggested categories and payment methods.
    Options,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where ledger configuration and secrets are held. Defaults to ~/ledger
    #[arg(long, env = "LEDGER_HOME", default_value_t = default_ledger_home())]
    ledger_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, ledger_home: PathBuf) -> Self {
        Self {
            log_level,
            ledger_home: ledger_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn ledger_home(&self) -> &DisplayPath {
        &self.ledger_home
    }
}

/// (Not shown): Args for the `ledger init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL to the Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be moved to the
    /// default secrets location in the data directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `ledger auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh the existing tokens without opening a consent page.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// (Not shown): Args for the `ledger add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// Who the entry belongs to. Must be one of the owners in config.json.
    #[arg(long)]
    owner: String,

    /// The date of the transaction as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Whether money came in or went out.
    #[arg(long, value_enum)]
    kind: Kind,

    /// The category, e.g. Food. Run `ledger options` to see the suggested ones.
    #[arg(long)]
    category: String,

    /// Free text.
    #[arg(long, default_value = "")]
    description: String,

    /// The amount, always positive, e.g. 49.90. The kind decides whether it adds or subtracts.
    #[arg(long)]
    amount: Amount,

    /// How it was paid, e.g. Pix or Credit.
    #[arg(long, default_value = "")]
    payment_method: String,
}

impl AddArgs {
    pub fn new(
        owner: impl Into<String>,
        date: Option<NaiveDate>,
        kind: Kind,
        category: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            owner: owner.into(),
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

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn date(&self) -> Option<NaiveDate> {
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
}

/// (Not shown): Args for the `ledger report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// An owner's name, or "couple" for everyone.
    #[arg(long, default_value_t = View::Couple)]
    view: View,

    /// How to print the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ReportArgs {
    pub fn new(view: View, format: OutputFormat) -> Self {
        Self { view, format }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

/// (Not shown): Args for the `ledger insight` command.
#[derive(Debug, Parser, Clone)]
pub struct InsightArgs {
    /// An owner's name, or "couple" for everyone.
    #[arg(long, default_value_t = View::Couple)]
    view: View,
}

impl InsightArgs {
    pub fn new(view: View) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &View {
        &self.view
    }
}

fn default_ledger_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --ledger-home or LEDGER_HOME instead of relying on the default \
                ledger home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("ledger")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("ledger").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_add() {
        let args = parse(&[
            "--ledger-home",
            "/tmp/l",
            "add",
            "--owner",
            "Carol",
            "--date",
            "2024-02-01",
            "--kind",
            "expense",
            "--category",
            "Food",
            "--amount",
            "R$ 1,234.50",
            "--payment-method",
            "Pix",
        ]);
        assert_eq!(args.common().ledger_home().path(), Path::new("/tmp/l"));
        let Command::Add(add) = args.command() else {
            panic!("expected the add command");
        };
        assert_eq!(add.owner(), "Carol");
        assert_eq!(add.date(), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(add.kind(), Kind::Expense);
        assert_eq!(add.amount().value(), Decimal::from_str("1234.50").unwrap());
        assert_eq!(add.description(), "");
        assert_eq!(add.payment_method(), "Pix");
    }

    #[test]
    fn test_parse_add_rejects_negative_amount() {
        let result = Args::try_parse_from([
            "ledger", "add", "--owner", "Carol", "--kind", "income", "--category", "Salary",
            "--amount", "-5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_report_defaults() {
        let args = parse(&["report"]);
        let Command::Report(report) = args.command() else {
            panic!("expected the report command");
        };
        assert_eq!(report.view(), &View::Couple);
        assert_eq!(report.format(), OutputFormat::Text);
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_parse_report_view_and_format() {
        let args = parse(&["--log-level", "debug", "report", "--view", "Marcio", "--format", "json"]);
        let Command::Report(report) = args.command() else {
            panic!("expected the report command");
        };
        assert_eq!(report.view().to_string(), "Marcio");
        assert_eq!(report.format(), OutputFormat::Json);
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_parse_options() {
        assert!(matches!(parse(&["options"]).command(), Command::Options));
    }
}
