//! Authentication command handlers for the OAuth flow.
//!
//! This module implements the CLI commands for:
//! - `ledger auth` - Initial OAuth consent flow
//! - `ledger auth --verify` - Verify and refresh authentication

use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::store::TokenProvider;
use crate::{Config, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};

/// Handles the `ledger auth` command. Runs the OAuth consent flow in the browser and saves the
/// tokens to `token.json`.
///
/// This is the only command that opens a browser.
///
/// # Errors
/// Returns an `Auth` error if the consent flow fails or `client_secret.json` is missing or invalid.
pub async fn auth(config: &Config) -> Result<Out<DateTime<Utc>>> {
    let token_provider =
        TokenProvider::initialize(config.client_secret_path(), config.token_path())
            .await
            .pub_result(ErrorType::Auth)?;
    let expires_at = token_provider.expires_at();
    Ok(Out::new(
        format!(
            "Authentication succeeded, tokens were saved to {}",
            config.token_path().display()
        ),
        expires_at,
    ))
}

/// Handles the `ledger auth --verify` command.
///
/// This never opens a browser. It checks that the saved tokens exist and have the right scopes,
/// then refreshes the access token to prove that Google still accepts them. If anything is wrong
/// the error tells the user to run `ledger auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<DateTime<Utc>>> {
    let mut token_provider = TokenProvider::load(config.client_secret_path(), config.token_path())
        .await
        .context(
            "Unable to use the existing tokens found in the token JSON file. \n\n\
            You should run 'ledger auth' (without the --verify flag).",
        )
        .pub_result(ErrorType::Auth)?;
    token_provider
        .refresh()
        .await
        .context("Unable to refresh the token")
        .pub_result(ErrorType::Auth)?;
    let expires_at = token_provider.expires_at();
    Ok(Out::new(
        format!("Your OAuth token is valid until {}", expires_at.to_rfc3339()),
        expires_at,
    ))
}
