//! Narrative insights about the ledger from a text-completion service.
//!
//! The service sits behind the `InsightGenerator` trait:
//! - `OpenAiInsight` talks to any server that implements the OpenAI `/v1/chat/completions` API
//! - `OfflineInsight` builds a short summary locally and is used in test mode
//!
//! `generate_insight` is the only entry point the commands use. It never fails; problems are
//! turned into a message for the user.

mod offline;
mod openai;

use crate::config::InsightConfig;
use crate::error::Res;
use crate::model::{Entry, DATE_FORMAT};
use crate::store::Mode;
use tracing::{debug, warn};

pub use offline::OfflineInsight;
pub use openai::OpenAiInsight;

/// Returned instead of calling the service when there are no entries.
pub const NOT_ENOUGH_DATA: &str =
    "There is not enough data to generate an insight. Please add some entries first.";

const SYSTEM_PROMPT: &str =
    "You are a smart financial assistant for couples. Give concise, actionable insights.";

const PROMPT_COLUMNS: [&str; 6] = [
    "Date",
    "Kind",
    "Category",
    "Description",
    "Amount",
    "Payment Method",
];

/// A text-completion backend.
#[async_trait::async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Sends `prompt` and returns the reply text.
    async fn complete(&self, prompt: &Prompt) -> Res<String>;
}

/// The messages sent to the service, along with the entries they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    system: String,
    user: String,
    entries: Vec<Entry>,
}

impl Prompt {
    /// Builds the prompt for `entries`: a request for trends, spending patterns and the overall
    /// balance, followed by the entries as a table.
    pub fn for_entries(entries: &[Entry]) -> Self {
        let owners = owner_names(entries);
        let user = format!(
            "Based on the following financial data of a couple ({owners}), write one smart, \
            actionable insight.\n\
            Analyze trends, spending patterns and the overall balance. Point out areas to improve \
            or things that are going well.\n\
            The data is:\n\n\
            {}\n\
            Insight:",
            entries_table(entries)
        );
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
            entries: entries.to_vec(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// Creates the generator for `mode`.
pub fn generator(config: &InsightConfig, mode: Mode) -> Box<dyn InsightGenerator> {
    match mode {
        Mode::Google => Box::new(OpenAiInsight::from_config(config)),
        Mode::Test => Box::new(OfflineInsight),
    }
}

/// Returns an insight about `entries`, or a message explaining why there is none.
pub async fn generate_insight(generator: &dyn InsightGenerator, entries: &[Entry]) -> String {
    if entries.is_empty() {
        return NOT_ENOUGH_DATA.to_string();
    }
    let prompt = Prompt::for_entries(entries);
    debug!("Requesting an insight for {} entries", entries.len());
    let result = generator.complete(&prompt).await.and_then(|reply| {
        let reply = reply.trim();
        anyhow::ensure!(!reply.is_empty(), "the service returned an empty reply");
        Ok(reply.to_string())
    });
    match result {
        Ok(insight) => insight,
        Err(e) => {
            warn!("Insight generation failed: {e:#}");
            failure_message(&e)
        }
    }
}

fn failure_message(e: &anyhow::Error) -> String {
    format!("Unable to generate an insight: {e:#}. Check your connection and API key.")
}

/// "Carol and Marcio", "Carol, Marcio and Ana", in order of first appearance.
fn owner_names(entries: &[Entry]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for entry in entries {
        let name = entry.owner().name();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    match names.split_last() {
        None => String::new(),
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
    }
}

/// Renders the prompt columns as a left-aligned text table.
fn entries_table(entries: &[Entry]) -> String {
    let rows: Vec<[String; 6]> = entries
        .iter()
        .map(|e| {
            [
                e.date().format(DATE_FORMAT).to_string(),
                e.kind().label().to_string(),
                e.category().to_string(),
                e.description().to_string(),
                e.amount().to_sheet_string(),
                e.payment_method().to_string(),
            ]
        })
        .collect();

    let mut widths = PROMPT_COLUMNS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[&str]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut lines = vec![format_row(&PROMPT_COLUMNS)];
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        lines.push(format_row(&cells));
    }
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Kind, Owner};
    use chrono::NaiveDate;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed result and counts calls.
    struct StaticInsight {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
    }

    impl StaticInsight {
        fn new(reply: std::result::Result<&str, &str>) -> Self {
            Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl InsightGenerator for StaticInsight {
        async fn complete(&self, _prompt: &Prompt) -> Res<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn entries() -> Vec<Entry> {
        vec![
            Entry::new(
                Owner::from_str("Carol").unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                Kind::Income,
                "Salary",
                Amount::from_str("1000").unwrap(),
            ),
            Entry::new(
                Owner::from_str("Marcio").unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                Kind::Expense,
                "Food",
                Amount::from_str("200").unwrap(),
            )
            .with_description("Groceries")
            .with_payment_method("Pix"),
        ]
    }

    #[tokio::test]
    async fn test_generate_insight_empty() {
        let generator = StaticInsight::new(Ok("unused"));
        let insight = generate_insight(&generator, &[]).await;
        assert_eq!(insight, NOT_ENOUGH_DATA);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generate_insight_trims_reply() {
        let generator = StaticInsight::new(Ok("\n  Spend less on food.  \n"));
        let insight = generate_insight(&generator, &entries()).await;
        assert_eq!(insight, "Spend less on food.");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_insight_failure() {
        let generator = StaticInsight::new(Err("connection refused"));
        let insight = generate_insight(&generator, &entries()).await;
        assert_eq!(
            insight,
            "Unable to generate an insight: connection refused. Check your connection and API key."
        );
    }

    #[tokio::test]
    async fn test_generate_insight_blank_reply_is_a_failure() {
        let generator = StaticInsight::new(Ok("   "));
        let insight = generate_insight(&generator, &entries()).await;
        assert!(insight.starts_with("Unable to generate an insight: the service returned an empty"));
    }

    #[test]
    fn test_prompt_for_entries() {
        let prompt = Prompt::for_entries(&entries());
        assert_eq!(prompt.system(), SYSTEM_PROMPT);
        assert!(prompt.user().contains("(Carol and Marcio)"));
        assert!(prompt.user().ends_with("Insight:"));
        assert_eq!(prompt.entries().len(), 2);

        let lines: Vec<&str> = prompt.user().lines().collect();
        let header = lines.iter().position(|l| l.starts_with("Date")).unwrap();
        assert_eq!(
            lines[header],
            "Date        Kind     Category  Description  Amount   Payment Method"
        );
        assert_eq!(lines[header + 1], "2024-01-05  Income   Salary                 1000.00");
        assert_eq!(
            lines[header + 2],
            "2024-01-10  Expense  Food      Groceries    200.00   Pix"
        );
    }

    #[test]
    fn test_owner_names() {
        assert_eq!(owner_names(&[]), "");
        let mut list = entries();
        assert_eq!(owner_names(&list[..1]), "Carol");
        list.push(list[0].clone());
        assert_eq!(owner_names(&list), "Carol and Marcio");
    }
}
