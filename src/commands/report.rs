//! The `ledger report` command and its text rendering.

use crate::commands::{load_entries, Out};
use crate::model::{format_money, DroppedRow, View, COUPLE};
use crate::pipeline::Report;
use crate::store::Mode;
use crate::{Config, Result};
use tracing::{debug, warn};

/// Loads the ledger, applies `view` and computes every aggregation. The message is the report as
/// text tables; the structure is the `Report` itself.
///
/// An empty view is not an error. It produces a message saying there is no data and a `Report`
/// with empty collections.
pub async fn report(config: Config, mode: Mode, view: View) -> Result<Out<Report>> {
    let entries = load_entries(&config, mode).await?;
    if !entries.dropped().is_empty() {
        warn!(
            "{} rows of the sheet were skipped because they are invalid",
            entries.dropped().len()
        );
    }
    let report = Report::build(view, entries.data());
    debug!(
        "Built the {} report over {} entries",
        report.view, report.totals.entries
    );
    let text = render(&report, entries.dropped());
    Ok(Out::new(text, report))
}

/// Renders `report` as a set of plain-text tables.
fn render(report: &Report, dropped: &[DroppedRow]) -> String {
    let mut out = String::new();
    if report.is_empty() {
        out.push_str(&format!("No data to show for {}.\n", report.view));
        push_dropped(&mut out, dropped);
        return out;
    }

    let totals = &report.totals;
    out.push_str(&format!(
        "Report for {} ({} entries)\n\n",
        report.view, totals.entries
    ));
    push_section(
        &mut out,
        "Totals",
        &["", "Amount"],
        vec![
            vec!["Income".to_string(), format_money(totals.income)],
            vec!["Expenses".to_string(), format_money(totals.expense)],
            vec!["Balance".to_string(), format_money(totals.balance)],
        ],
    );

    push_section(
        &mut out,
        "Expenses by category",
        &["Category", "Amount"],
        report
            .category_breakdown
            .iter()
            .map(|(category, amount)| vec![display_category(category), format_money(*amount)])
            .collect(),
    );

    // The cumulative balance has exactly one point per month of the rollup, in the same order
    push_section(
        &mut out,
        "Monthly income and expenses",
        &["Month", "Income", "Expenses", "Net", "Cumulative"],
        report
            .monthly_rollup
            .iter()
            .zip(&report.monthly_cumulative_balance)
            .map(|(flow, cumulative)| {
                vec![
                    flow.period.to_string(),
                    format_money(flow.income),
                    format_money(flow.expense),
                    format_money(flow.net()),
                    format_money(cumulative.cumulative_balance),
                ]
            })
            .collect(),
    );

    push_section(
        &mut out,
        "Monthly expenses by category",
        &["Month", "Category", "Amount"],
        report
            .monthly_category_breakdown
            .iter()
            .map(|m| {
                vec![
                    m.period.to_string(),
                    display_category(&m.category),
                    format_money(m.amount),
                ]
            })
            .collect(),
    );

    push_section(
        &mut out,
        "Daily running balance",
        &["Date", "Balance"],
        report
            .daily_running_balance
            .iter()
            .map(|p| vec![p.date.to_string(), format_money(p.balance)])
            .collect(),
    );

    if let Some(comparison) = &report.owner_comparison {
        push_section(
            &mut out,
            &format!("Expenses by owner ({COUPLE})"),
            &["Owner", "Expenses"],
            comparison
                .iter()
                .map(|(owner, amount)| vec![owner.to_string(), format_money(*amount)])
                .collect(),
        );
    }

    push_dropped(&mut out, dropped);
    out.trim_end().to_string()
}

fn display_category(category: &str) -> String {
    if category.is_empty() {
        "(none)".to_string()
    } else {
        category.to_string()
    }
}

fn push_dropped(out: &mut String, dropped: &[DroppedRow]) {
    if dropped.is_empty() {
        return;
    }
    out.push_str(&format!(
        "{} rows of the sheet were skipped:\n",
        dropped.len()
    ));
    for row in dropped {
        out.push_str(&format!("  row {}: {}\n", row.row, row.reason));
    }
}

/// Appends a titled table. The first column is left-aligned and the rest are right-aligned.
/// Sections without rows are left out.
fn push_section(out: &mut String, title: &str, headers: &[&str], rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        return;
    }
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(ix, (cell, width))| {
                if ix == 0 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect();
        format!("  {}", padded.join("  ").trim_end())
    };

    out.push_str(title);
    out.push('\n');
    out.push_str(&format_row(headers.to_vec()));
    out.push('\n');
    for row in &rows {
        out.push_str(&format_row(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Owner;
    use crate::test::TestEnv;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_report_couple() {
        let env = TestEnv::new().await;
        let out = report(env.config(), Mode::Test, View::Couple).await.unwrap();
        let report = out.structure().unwrap();
        assert_eq!(report.totals.entries, 19);
        assert_eq!(report.totals.income, dec("24000"));
        assert_eq!(report.totals.expense, dec("8043.42"));
        assert_eq!(report.totals.balance, dec("15956.58"));
        assert_eq!(report.monthly_rollup.len(), 3);
        assert_eq!(report.owner_comparison.as_ref().unwrap().len(), 2);

        let text = out.message();
        assert!(text.starts_with("Report for Couple (19 entries)"));
        assert!(text.contains("  Balance   15,956.58"));
        assert!(text.contains("Expenses by owner (Couple)"));
        assert!(text.contains("1 rows of the sheet were skipped"));
        assert!(text.contains("row 15"));
    }

    #[tokio::test]
    async fn test_report_individual() {
        let env = TestEnv::new().await;
        let carol = View::Individual(Owner::from_str("Carol").unwrap());
        let out = report(env.config(), Mode::Test, carol).await.unwrap();
        let report = out.structure().unwrap();
        assert_eq!(report.totals.income, dec("12600"));
        assert_eq!(report.totals.expense, dec("5847.90"));
        assert_eq!(report.totals.balance, dec("6752.10"));
        assert!(report.owner_comparison.is_none());
        assert!(!out.message().contains("Expenses by owner"));
    }

    #[tokio::test]
    async fn test_report_unknown_owner_is_empty() {
        let env = TestEnv::new().await;
        let ana = View::Individual(Owner::from_str("Ana").unwrap());
        let out = report(env.config(), Mode::Test, ana).await.unwrap();
        assert!(out.structure().unwrap().is_empty());
        assert!(out.message().starts_with("No data to show for Ana."));
    }

    #[test]
    fn test_push_section() {
        let mut out = String::new();
        push_section(
            &mut out,
            "Title",
            &["Name", "Amount"],
            vec![
                vec!["Food".to_string(), "1,200.00".to_string()],
                vec!["Leisure".to_string(), "5.00".to_string()],
            ],
        );
        assert_eq!(
            out,
            "Title\n  Name       Amount\n  Food     1,200.00\n  Leisure      5.00\n\n"
        );
    }

    #[test]
    fn test_push_section_skips_empty() {
        let mut out = String::new();
        push_section(&mut out, "Title", &["A"], Vec::new());
        assert!(out.is_empty());
    }
}
