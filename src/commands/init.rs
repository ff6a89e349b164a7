use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file using `sheet_url` along with default settings
/// - Moves `secret_file` into its default location in the data dir.
///
/// # Arguments
/// - `ledger_home` - The directory that will be the root of data directory, e.g. `$HOME/ledger`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
///   OAuth workflow.
/// - `sheet_url` - The URL of the Google Sheet where the ledger is stored.
///
/// # Errors
/// - Returns a `Config` error if the URL is invalid or any file operations fail.
pub async fn init(ledger_home: &Path, secret_file: &Path, sheet_url: &str) -> Result<Out<()>> {
    let config = Config::create(ledger_home, secret_file, sheet_url).await?;
    Ok(format!(
        "Successfully created the ledger directory at {}. Owners and categories can be changed \
        in {}. Run 'ledger auth' next.",
        config.root().display(),
        config.config_path().display()
    )
    .into())
}
