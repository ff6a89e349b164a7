//! Serialization and deserialization structures for Google OAuth credential files.
//! - `client_secret.json`: OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: the access and refresh tokens we receive after consent

use crate::error::Res;
use crate::store::OAUTH_SCOPES;
use crate::utils;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// This redirect needs to be present in the OAuth credential file, or else OAuth will not work.
const REDIRECT: &str = "http://localhost";

/// A JSON file held in memory along with the path it was loaded from, so that it can be saved
/// back after changes.
#[derive(Default, Debug, Clone)]
pub(super) struct File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    pub(super) async fn load(path: impl Into<PathBuf>) -> Res<Self> {
        let path = path.into();
        let data: F = utils::deserialize(&path).await?;
        Ok(Self { path, data })
    }

    pub(super) fn new(path: impl Into<PathBuf>, data: F) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Writes the data as pretty JSON. The file is made readable only by the owner on Unix.
    pub(super) async fn save(&self) -> Res<()> {
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize data to JSON")?;
        utils::write(&self.path, json).await?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, Permissions::from_mode(0o600))
                .await
                .context("Failed to set file permissions")?;
        }

        Ok(())
    }

    pub(super) fn data(&self) -> &F {
        &self.data
    }

    pub(super) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// Represents the structure of the `client_secret.json` file downloaded from Google Cloud Console.
///
/// This file contains OAuth 2.0 Desktop Application credentials. The standard format from Google
/// has an "installed" wrapper around the actual credentials.
///
/// Example:
/// ```json
/// {
///   "installed": {
///     "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
///     "client_secret": "YOUR_CLIENT_SECRET",
///     "redirect_uris": ["http://localhost"],
///     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
///     "token_uri": "https://oauth2.googleapis.com/token"
///   }
/// }
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct SecretFile {
    installed: InstalledCredentials,
}

impl SecretFile {
    pub(crate) async fn load(path: &Path) -> Res<SecretFile> {
        utils::deserialize(path)
            .await
            .context("Unable to read the OAuth client secret file")
    }

    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

/// The OAuth credentials nested within the `client_secret.json` file.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    /// Must contain "http://localhost" (without a port number). We add the port of our loopback
    /// listener at runtime.
    redirect_uris: RedirectUris,
    auth_uri: String,
    token_uri: String,
}

#[derive(Default, Debug, Clone)]
struct RedirectUris(Vec<String>);

impl Serialize for RedirectUris {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RedirectUris {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec = Vec::<String>::deserialize(deserializer)?;
        if !vec.iter().any(|s| is_valid_redirect(s)) {
            return Err(D::Error::custom(format!(
                "At least one of the redirects needs to be {REDIRECT}, but this was not found. \
                When creating the OAuth client for the ledger, you must include '{REDIRECT}'"
            )));
        }
        Ok(RedirectUris(vec))
    }
}

fn is_valid_redirect(s: &str) -> bool {
    s == REDIRECT || s == "http://127.0.0.1"
}

/// The token information we receive from Google OAuth, saved in our own, simpler format.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct TokenFile {
    scopes: Vec<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    pub(super) fn new(
        scopes: Vec<String>,
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scopes,
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Fails when the token was granted without one of the scopes the ledger needs.
    pub(super) fn validate_scopes(&self) -> Res<()> {
        let found_scopes: HashSet<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        for &required_scope in OAUTH_SCOPES {
            if !found_scopes.contains(required_scope) {
                bail!("OAuth scope '{required_scope}' is missing.");
            }
        }
        Ok(())
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(super) fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is expired or will expire soon (within 5 minutes)
    pub(super) fn is_expired(&self) -> bool {
        let buffer = chrono::Duration::minutes(5);
        self.expires_at <= Utc::now() + buffer
    }

    /// Google does not always send a new refresh token; the old one stays valid in that case.
    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn secret_json(redirects: &str) -> String {
        format!(
            r#"
{{
    "installed": {{
        "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
        "client_secret": "YOUR_CLIENT_SECRET",
        "redirect_uris": {redirects},
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token"
    }}
}}
"#
        )
    }

    #[tokio::test]
    async fn test_client_secret_good_redirect() {
        let temp_dir = TempDir::new().unwrap();
        let p = temp_dir.path().join("file.json");
        let json = secret_json(r#"["http://localhost", "https://example.com:4040/whatever"]"#);
        utils::write(&p, json).await.unwrap();
        let secret_file = SecretFile::load(&p).await.unwrap();
        assert_eq!(
            "YOUR_CLIENT_ID.apps.googleusercontent.com",
            secret_file.client_id()
        );
        assert_eq!("https://oauth2.googleapis.com/token", secret_file.token_uri());
    }

    #[tokio::test]
    async fn test_client_secret_loopback_ip_redirect() {
        let temp_dir = TempDir::new().unwrap();
        let p = temp_dir.path().join("file.json");
        utils::write(&p, secret_json(r#"["http://127.0.0.1"]"#))
            .await
            .unwrap();
        assert!(SecretFile::load(&p).await.is_ok());
    }

    #[tokio::test]
    async fn test_client_secret_bad_redirect() {
        let temp_dir = TempDir::new().unwrap();
        let p = temp_dir.path().join("file.json");
        let json = secret_json(r#"["http://localhost:9900", "https://example.com:4040/whatever"]"#);
        utils::write(&p, json).await.unwrap();
        let parse_error = SecretFile::load(&p).await.err().unwrap();
        let parse_error_message = format!("{parse_error:?}");
        assert!(
            parse_error_message.contains("At least one of the redirects needs to be http://localhost")
        );
    }

    #[tokio::test]
    async fn test_token_file_roundtrip_through_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        let token = TokenFile::new(
            vec![OAUTH_SCOPES[0].to_string()],
            "abc12".to_string(),
            "xyz89".to_string(),
            "2025-01-01T00:00:00Z".parse().unwrap(),
        );
        File::new(&path, token).save().await.unwrap();

        let mut loaded: File<TokenFile> = File::load(&path).await.unwrap();
        loaded.data().validate_scopes().unwrap();
        assert_eq!(loaded.data().access_token(), "abc12");
        assert!(loaded.data().is_expired());

        loaded
            .data_mut()
            .update("new".to_string(), Utc::now() + chrono::Duration::hours(1), None);
        assert_eq!(loaded.data().refresh_token(), "xyz89");
        assert!(!loaded.data().is_expired());
        assert_eq!(loaded.path(), path.as_path());
    }

    #[test]
    fn test_token_file_missing_scope() {
        let token = TokenFile::new(
            vec!["https://www.googleapis.com/auth/drive.readonly".to_string()],
            "abc12".to_string(),
            "xyz89".to_string(),
            Utc::now(),
        );
        let message = token.validate_scopes().unwrap_err().to_string();
        assert!(message.contains("https://www.googleapis.com/auth/spreadsheets"));
    }
}
