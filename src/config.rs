//! Configuration file handling for the ledger.
//!
//! The configuration file is stored at `$LEDGER_HOME/config.json` and contains settings for
//! the ledger including the Google Sheet URL, the owners, the suggested categories and payment
//! methods, the insight service settings, and authentication file paths.

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::Owner;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_NAME: &str = "ledger";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";

const DEFAULT_WORKSHEET: &str = "Sheet1";
const DEFAULT_OWNERS: &[&str] = &["Carol", "Marcio"];
const DEFAULT_CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Leisure",
    "Housing",
    "Salary",
    "Other",
    "Investment",
    "Education",
    "Health",
];
const DEFAULT_PAYMENT_METHODS: &[&str] = &["Pix", "Credit", "Debit", "Cash", "Transfer"];

const DEFAULT_INSIGHT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_INSIGHT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_INSIGHT_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_INSIGHT_TEMPERATURE: f32 = 0.7;
const DEFAULT_INSIGHT_MAX_TOKENS: u32 = 200;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$LEDGER_HOME` and from there it loads `$LEDGER_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the ledger home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    owners: Vec<Owner>,
    spreadsheet_id: String,
}

impl Config {
    /// Creates the data directory, its subdirectories and:
    /// - Creates an initial `config.json` file using `sheet_url` along with default settings
    /// - Moves `secret_file` into its default location in the data dir.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/ledger`
    /// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
    ///   OAuth workflow.
    /// - `sheet_url` - The URL of the Google Sheet where the ledger is stored.
    ///   e.g. https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    ///
    /// # Errors
    /// - Returns an error if the URL is not a Google Sheets URL or if any file operations fail.
    pub async fn create(
        dir: impl Into<PathBuf>,
        secret_file: &Path,
        sheet_url: &str,
    ) -> Result<Self> {
        Self::create_inner(dir.into(), secret_file, sheet_url)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(
        maybe_relative: PathBuf,
        secret_file: &Path,
        sheet_url: &str,
    ) -> Res<Self> {
        // Validate before touching the filesystem
        let spreadsheet_id = extract_spreadsheet_id(sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?
            .to_string();

        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the ledger home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        // Move the Google OAuth client credentials file to its default location in the data dir
        let secret_destination = secrets_dir.join(CLIENT_SECRET_JSON);
        utils::rename(secret_file, secret_destination).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            sheet_url: sheet_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;
        let owners = config_file.parse_owners()?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            owners,
            spreadsheet_id,
        })
    }

    /// This will
    /// - validate that `ledger_home` exists and that the config file exists
    /// - load and validate the config file
    /// - validate that the secrets directory exists
    /// - return the loaded configuration object
    pub async fn load(ledger_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(ledger_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The ledger home directory is missing, run 'ledger init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let owners = config_file.parse_owners()?;

        let spreadsheet_id = extract_spreadsheet_id(&config_file.sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?
            .to_string();

        let secrets = root.join(SECRETS);
        if !secrets.is_dir() {
            bail!("The secrets directory is missing '{}'", secrets.display())
        }

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
            owners,
            spreadsheet_id,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// The name of the tab that holds the ledger rows.
    pub fn worksheet(&self) -> &str {
        &self.config_file.worksheet
    }

    /// The people who may own entries.
    pub fn owners(&self) -> &[Owner] {
        &self.owners
    }

    /// Suggested categories, not enforced.
    pub fn categories(&self) -> &[String] {
        &self.config_file.categories
    }

    /// Suggested payment methods, not enforced.
    pub fn payment_methods(&self) -> &[String] {
        &self.config_file.payment_methods
    }

    pub fn insight(&self) -> &InsightConfig {
        &self.config_file.insight
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve_secrets_file_path(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve_secrets_file_path(self.config_file.token_path())
    }

    /// Checks if `p` is relative, and if so, resolves it. Returns it unchanged if it is absolute.
    fn resolve_secrets_file_path(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Settings for the text-completion service used by `ledger insight`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InsightConfig {
    /// The server root. Requests go to `{base_url}/v1/chat/completions`.
    pub base_url: String,
    pub model: String,
    /// The name of the environment variable that holds the API key. The key itself is never
    /// written to the config file.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INSIGHT_BASE_URL.to_string(),
            model: DEFAULT_INSIGHT_MODEL.to_string(),
            api_key_env: DEFAULT_INSIGHT_API_KEY_ENV.to_string(),
            temperature: DEFAULT_INSIGHT_TEMPERATURE,
            max_tokens: DEFAULT_INSIGHT_MAX_TOKENS,
        }
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "ledger",
///   "config_version": 1,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "worksheet": "Sheet1",
///   "owners": ["Carol", "Marcio"],
///   "categories": ["Food", "Transport", "Leisure"],
///   "payment_methods": ["Pix", "Credit"],
///   "insight": {
///     "base_url": "https://api.openai.com",
///     "model": "gpt-3.5-turbo",
///     "api_key_env": "OPENAI_API_KEY",
///     "temperature": 0.7,
///     "max_tokens": 200
///   },
///   "client_secret_path": ".secrets/client_secret.json",
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "ledger"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// URL to the Google Sheet
    sheet_url: String,

    #[serde(default = "default_worksheet")]
    worksheet: String,

    #[serde(default = "default_owners")]
    owners: Vec<String>,

    #[serde(default = "default_categories")]
    categories: Vec<String>,

    #[serde(default = "default_payment_methods")]
    payment_methods: Vec<String>,

    #[serde(default)]
    insight: InsightConfig,

    /// Path to the OAuth 2.0 client credentials file (optional, relative to config.json or absolute)
    /// Defaults to $LEDGER_HOME/.secrets/client_secret.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Path to the OAuth token file (optional, relative to config.json or absolute)
    /// Defaults to $LEDGER_HOME/.secrets/token.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

fn default_worksheet() -> String {
    DEFAULT_WORKSHEET.to_string()
}

fn default_owners() -> Vec<String> {
    DEFAULT_OWNERS.iter().map(|s| s.to_string()).collect()
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
}

fn default_payment_methods() -> Vec<String> {
    DEFAULT_PAYMENT_METHODS.iter().map(|s| s.to_string()).collect()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: String::new(),
            worksheet: default_worksheet(),
            owners: default_owners(),
            categories: default_categories(),
            payment_methods: default_payment_methods(),
            insight: InsightConfig::default(),
            client_secret_path: None,
            token_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if `app_name` is wrong
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path as pretty JSON.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// Validates the owners list: at least one owner, each a valid name, no duplicates.
    fn parse_owners(&self) -> Res<Vec<Owner>> {
        if self.owners.is_empty() {
            bail!("The config file must list at least one owner");
        }
        let mut owners: Vec<Owner> = Vec::with_capacity(self.owners.len());
        for name in &self.owners {
            let owner = Owner::from_str(name)
                .with_context(|| format!("Invalid owner '{name}' in the config file"))?;
            if owners.contains(&owner) {
                bail!("Owner '{owner}' is listed twice in the config file");
            }
            owners.push(owner);
        }
        Ok(owners)
    }

    /// Gets the client secret path.
    ///
    /// If the path is relative, it should be interpreted as relative to the ledger home.
    /// If None, defaults to $LEDGER_HOME/.secrets/client_secret.json
    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    /// Gets the token path.
    ///
    /// If the path is relative, it should be interpreted as relative to the ledger home.
    /// If None, defaults to $LEDGER_HOME/.secrets/token.json
    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}

/// Extracts the spreadsheet ID from a Google Sheets URL
///
/// # Arguments
/// * `url` - The Google Sheets URL (e.g., "https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...")
///
/// # Returns
/// The spreadsheet ID or an error if the URL format is invalid.
fn extract_spreadsheet_id(url: &str) -> Res<&str> {
    // URL format: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...
    // or: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID?foo=bar
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            let id_part = parts[i + 1];
            let id = id_part
                .split(|c| c == '?' || c == '#')
                .next()
                .unwrap_or(id_part);
            if id.is_empty() {
                break;
            }
            return Ok(id);
        }
    }
    Err(anyhow::anyhow!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    ))
}
