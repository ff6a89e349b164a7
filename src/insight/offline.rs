use crate::error::Res;
use crate::insight::{InsightGenerator, Prompt};
use crate::model::format_money;
use crate::pipeline::{compute_category_breakdown, compute_totals};

/// Builds a plain summary from the prompt's entries without calling any service. Used when the
/// program runs in test mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineInsight;

#[async_trait::async_trait]
impl InsightGenerator for OfflineInsight {
    async fn complete(&self, prompt: &Prompt) -> Res<String> {
        let totals = compute_totals(prompt.entries());
        let mut insight = format!(
            "Income was {} and expenses were {}, leaving a balance of {}.",
            format_money(totals.income),
            format_money(totals.expense),
            format_money(totals.balance)
        );

        let breakdown = compute_category_breakdown(prompt.entries());
        if let Some((category, amount)) = breakdown.iter().max_by_key(|(_, amount)| **amount) {
            insight.push_str(&format!(
                " The largest expense category is {category} at {}.",
                format_money(*amount)
            ));
        }
        if totals.balance.is_sign_negative() {
            insight.push_str(" Spending is above income, review the largest categories first.");
        }
        Ok(insight)
    }
}
