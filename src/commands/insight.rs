//! The `ledger insight` command.

use crate::commands::{load_entries, Out};
use crate::insight::{self, generate_insight};
use crate::model::View;
use crate::store::Mode;
use crate::{Config, Result};
use serde::{Deserialize, Serialize};

/// The insight along with the view it describes.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct InsightOut {
    pub view: View,
    pub insight: String,
}

/// Loads the ledger, applies `view` and asks the configured service for an insight.
///
/// Only loading the ledger can fail. When the view is empty or the service fails, the message
/// explains that instead of returning an error.
pub async fn insight(config: Config, mode: Mode, view: View) -> Result<Out<InsightOut>> {
    let entries = load_entries(&config, mode).await?;
    let selected = view.filter(entries.data());
    let generator = insight::generator(config.insight(), mode);
    let text = generate_insight(generator.as_ref(), &selected).await;
    Ok(Out::new(text.clone(), InsightOut { view, insight: text }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::NOT_ENOUGH_DATA;
    use crate::model::Owner;
    use crate::test::TestEnv;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_insight_offline() {
        let env = TestEnv::new().await;
        let out = insight(env.config(), Mode::Test, View::Couple).await.unwrap();
        assert_eq!(
            out.message(),
            "Income was 24,000.00 and expenses were 8,043.42, leaving a balance of 15,956.58. \
            The largest expense category is Housing at 5,400.00."
        );
        assert_eq!(out.structure().unwrap().view, View::Couple);
    }

    #[tokio::test]
    async fn test_insight_empty_view() {
        let env = TestEnv::new().await;
        let view = View::Individual(Owner::from_str("Ana").unwrap());
        let out = insight(env.config(), Mode::Test, view).await.unwrap();
        assert_eq!(out.message(), NOT_ENOUGH_DATA);
    }
}
