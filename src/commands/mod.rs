//! Command handlers for the ledger CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod add;
mod auth;
mod init;
mod insight;
mod options;
mod report;

use crate::error::{ErrorType, IntoResult};
use crate::model::Entries;
use crate::store::{self, Mode};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use add::add;
pub use auth::{auth, auth_verify};
pub use init::init;
pub use insight::{insight, InsightOut};
pub use options::{options, Options};
pub use report::report;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

/// How a command that produces a document (a report, an insight) prints it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// The structured data as pretty-printed JSON.
    Json,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }

    /// Print the command's document to stdout, either the message as text or the structured data
    /// as JSON. This is the output a user would pipe or redirect, so it does not go through the
    /// logger.
    pub fn print_document(&self, format: OutputFormat) -> Result<()> {
        match (format, self.structure()) {
            (OutputFormat::Json, Some(structure)) => {
                let json = serde_json::to_string_pretty(structure)
                    .map_err(anyhow::Error::from)
                    .pub_result(ErrorType::Internal)?;
                println!("{json}");
            }
            _ => println!("{}", self.message),
        }
        Ok(())
    }
}

/// Loads every entry of the configured worksheet. Failing to obtain credentials is an `Auth`
/// error, failing to read the sheet is a `Store` error.
pub(crate) async fn load_entries(config: &Config, mode: Mode) -> Result<Entries> {
    let sheet = store::sheet(config, mode)
        .await
        .pub_result(ErrorType::Auth)?;
    let mut ledger = store::ledger(config, sheet);
    ledger.load_entries().await.pub_result(ErrorType::Store)
}
