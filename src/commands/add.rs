//! The `ledger add` command.

use crate::args::AddArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{Entry, Owner, TIMESTAMP_FORMAT};
use crate::store::{self, Ledger, Mode};
use crate::{Config, Result};
use anyhow::{bail, Context};
use chrono::{Local, NaiveDateTime};
use std::str::FromStr;
use tracing::{debug, info};

/// Validates `args` and appends the resulting entry to the ledger sheet.
///
/// The owner must be one of the configured owners and can never be the combined view's label.
/// The category does not have to be one of the suggested ones. The date defaults to today and the
/// timestamp is the current local time.
///
/// # Errors
/// - `Request` if the owner or category is invalid. Nothing is written in that case.
/// - `Auth` if the OAuth tokens cannot be loaded.
/// - `Store` if the sheet cannot be written.
pub async fn add(config: Config, mode: Mode, args: AddArgs) -> Result<Out<Entry>> {
    let now = Local::now().naive_local();
    let entry = build_entry(&config, &args, now).pub_result(ErrorType::Request)?;
    let sheet = store::sheet(&config, mode)
        .await
        .pub_result(ErrorType::Auth)?;
    let mut ledger = store::ledger(&config, sheet);
    append(ledger.as_mut(), entry).await
}

async fn append(ledger: &mut (dyn Ledger + Send), entry: Entry) -> Result<Out<Entry>> {
    ledger
        .append_entry(&entry)
        .await
        .context("Unable to add the entry to the sheet")
        .pub_result(ErrorType::Store)?;
    let message = format!(
        "Added {} of {} for {} on {} ({})",
        entry.kind(),
        entry.amount(),
        entry.owner(),
        entry.date(),
        entry.category()
    );
    Ok(Out::new(message, entry))
}

fn build_entry(config: &Config, args: &AddArgs, now: NaiveDateTime) -> Res<Entry> {
    let owner = Owner::from_str(args.owner())?;
    if !config.owners().contains(&owner) {
        let known: Vec<&str> = config.owners().iter().map(Owner::name).collect();
        bail!(
            "Unknown owner '{owner}', expected one of: {}",
            known.join(", ")
        );
    }

    let category = args.category().trim();
    if category.is_empty() {
        bail!("The category must not be empty");
    }
    if !config.categories().iter().any(|c| c == category) {
        info!("'{category}' is not one of the suggested categories, adding it anyway");
    }

    let date = args.date().unwrap_or_else(|| now.date());
    let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
    debug!("Building entry for {owner} dated {date} at {timestamp}");
    Ok(
        Entry::new(owner, date, args.kind(), category, args.amount())
            .with_description(args.description().trim())
            .with_payment_method(args.payment_method().trim())
            .with_timestamp(timestamp),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Kind};
    use crate::store::TestSheet;
    use crate::test::TestEnv;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn args(owner: &str, category: &str) -> AddArgs {
        AddArgs::new(
            owner,
            NaiveDate::from_ymd_opt(2024, 4, 1),
            Kind::Expense,
            category,
            Amount::from_str("49.90").unwrap(),
        )
        .with_description(" Lunch ")
        .with_payment_method("Pix")
    }

    #[tokio::test]
    async fn test_build_entry() {
        let env = TestEnv::new().await;
        let entry = build_entry(&env.config(), &args("Carol", "Food"), now()).unwrap();
        assert_eq!(entry.owner().name(), "Carol");
        assert_eq!(entry.date(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(entry.kind(), Kind::Expense);
        assert_eq!(entry.description(), "Lunch");
        assert_eq!(entry.payment_method(), "Pix");
        assert_eq!(entry.timestamp(), "2024-04-02 09:30:00");
    }

    #[tokio::test]
    async fn test_build_entry_defaults_to_today() {
        let env = TestEnv::new().await;
        let args = AddArgs::new(
            "Marcio",
            None,
            Kind::Income,
            "Salary",
            Amount::from_str("10").unwrap(),
        );
        let entry = build_entry(&env.config(), &args, now()).unwrap();
        assert_eq!(entry.date(), now().date());
    }

    #[tokio::test]
    async fn test_build_entry_accepts_unlisted_category() {
        let env = TestEnv::new().await;
        let entry = build_entry(&env.config(), &args("Carol", "Pets"), now()).unwrap();
        assert_eq!(entry.category(), "Pets");
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_owner() {
        let env = TestEnv::new().await;
        let err = add(env.config(), Mode::Test, args("Ana", "Food"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
        assert!(err.to_string().contains("Carol, Marcio"));
    }

    #[tokio::test]
    async fn test_add_rejects_group_label() {
        let env = TestEnv::new().await;
        for label in ["Couple", "casal"] {
            let err = add(env.config(), Mode::Test, args(label, "Food"))
                .await
                .unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Request);
        }
    }

    #[tokio::test]
    async fn test_add_rejects_blank_category() {
        let env = TestEnv::new().await;
        let err = add(env.config(), Mode::Test, args("Carol", "  "))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[tokio::test]
    async fn test_add_in_test_mode() {
        let env = TestEnv::new().await;
        let out = add(env.config(), Mode::Test, args("Marcio", "Food"))
            .await
            .unwrap();
        assert_eq!(
            out.message(),
            "Added Expense of 49.90 for Marcio on 2024-04-01 (Food)"
        );
        assert_eq!(out.structure().unwrap().owner().name(), "Marcio");
    }

    #[tokio::test]
    async fn test_append_then_load() {
        let env = TestEnv::new().await;
        let config = env.config();
        let sheet = Box::new(TestSheet::empty(config.worksheet()));
        let mut ledger = store::ledger(&config, sheet);

        let entry = build_entry(&config, &args("Carol", "Food"), now()).unwrap();
        append(ledger.as_mut(), entry.clone()).await.unwrap();

        let entries = ledger.load_entries().await.unwrap();
        assert_eq!(entries.data(), &vec![entry]);
        assert!(entries.dropped().is_empty());
    }
}
