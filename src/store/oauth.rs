//! OAuth 2.0 for the Google Sheets API.
//!
//! `TokenProvider::initialize` runs the installed-app consent flow: it listens on a loopback port,
//! sends the user to Google's consent page, and exchanges the returned code for tokens, which are
//! saved to `token.json`. Everything else uses `TokenProvider::load`, which never opens a consent
//! page and refreshes the access token with the stored refresh token when it is about to expire.

use crate::error::Res;
use crate::store::files::{File, SecretFile, TokenFile};
use crate::store::OAUTH_SCOPES;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long we wait for the user to finish the consent page.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Shown in the browser tab after the redirect reaches us.
const CALLBACK_PAGE: &str = "Authorization received. You can close this tab and return to the \
    terminal.";

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Holds the OAuth client credentials and the saved token, and hands out valid access tokens.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Runs the consent flow and saves the resulting tokens to `token_path`. This is the only
    /// function that requires a browser.
    pub(crate) async fn initialize(
        secret_path: impl AsRef<Path>,
        token_path: impl Into<PathBuf>,
    ) -> Res<Self> {
        let secret_path = secret_path.as_ref();
        let secret = SecretFile::load(secret_path).await.with_context(|| {
            format!(
                "The OAuth client secret is missing or invalid at {}. Download it from the Google \
                Cloud Console and run 'ledger init' again.",
                secret_path.display()
            )
        })?;

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .context("Unable to open a local port for the OAuth callback")?;
        let port = listener.local_addr()?.port();
        let redirect = format!("http://127.0.0.1:{port}");
        let client = oauth_client(&secret)?.set_redirect_uri(
            RedirectUrl::new(redirect.clone()).context("Invalid OAuth redirect URL")?,
        );

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in OAUTH_SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        // Without offline access and a forced prompt Google may not return a refresh token
        let (auth_url, csrf_token) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        info!("Open this URL in your browser to authorize the ledger:\n\n{auth_url}\n");
        debug!("Waiting for the OAuth callback on {redirect}");
        let callback = wait_for_callback(listener).await?;

        if callback.state.as_deref() != Some(csrf_token.secret().as_str()) {
            bail!("The OAuth callback state does not match the request, refusing the code");
        }
        if let Some(error) = callback.error {
            bail!("Authorization was denied: {error}");
        }
        let Some(code) = callback.code else {
            bail!("The OAuth callback did not include an authorization code");
        };

        let http_client = http_client()?;
        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .map_err(|e| anyhow::anyhow!("Unable to exchange the authorization code: {e}"))?;

        let Some(refresh_token) = response.refresh_token() else {
            bail!(
                "Google did not return a refresh token. Remove the ledger from your Google \
                account's third-party access list and run 'ledger auth' again."
            );
        };
        let scopes = match response.scopes() {
            Some(scopes) => scopes.iter().map(|s| s.as_str().to_string()).collect(),
            None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        };
        let token = TokenFile::new(
            scopes,
            response.access_token().secret().clone(),
            refresh_token.secret().clone(),
            expiry(response.expires_in()),
        );
        token.validate_scopes()?;

        let token = File::new(token_path, token);
        token.save().await?;
        info!("Tokens saved to {}", token.path().display());
        Ok(Self { secret, token })
    }

    /// Loads existing credentials and tokens. Fails, rather than starting a consent flow, when
    /// either file is missing or the token lacks a required scope.
    pub(crate) async fn load(
        secret_path: impl AsRef<Path>,
        token_path: impl Into<PathBuf>,
    ) -> Res<Self> {
        let secret = SecretFile::load(secret_path.as_ref()).await?;
        let token: File<TokenFile> = File::load(token_path)
            .await
            .context("Unable to load the OAuth token, you may need to run 'ledger auth'")?;
        token.data().validate_scopes()?;
        Ok(Self { secret, token })
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Res<()> {
        let client = oauth_client(&self.secret)?;
        let http_client = http_client()?;
        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&http_client)
            .await
            .map_err(|e| anyhow::anyhow!("Unable to refresh the OAuth token: {e}"))?;

        self.token.data_mut().update(
            response.access_token().secret().clone(),
            expiry(response.expires_in()),
            response.refresh_token().map(|t| t.secret().clone()),
        );
        self.token.save().await?;
        debug!("Token refreshed, valid until {}", self.expires_at());
        Ok(())
    }

    /// Returns the access token, refreshing it first if it expires soon.
    pub(crate) async fn token_with_refresh(&mut self) -> Res<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }

    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    pub(crate) fn expires_at(&self) -> DateTime<Utc> {
        self.token.data().expires_at()
    }
}

fn oauth_client(secret: &SecretFile) -> Res<GoogleClient> {
    Ok(BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
        .set_token_uri(
            TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?,
        ))
}

/// The token endpoint must not follow redirects.
fn http_client() -> Res<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Unable to build the HTTP client")
}

/// Google always sends `expires_in`; assume an hour when it does not.
fn expiry(expires_in: Option<Duration>) -> DateTime<Utc> {
    let seconds = expires_in.map(|d| d.as_secs()).unwrap_or(3600);
    Utc::now() + chrono::Duration::seconds(seconds as i64)
}

/// The query parameters Google sends to the redirect URI.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
struct Callback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl Callback {
    fn parse(query: &str) -> Self {
        let mut callback = Callback::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => callback.code = Some(value.into_owned()),
                "state" => callback.state = Some(value.into_owned()),
                "error" => callback.error = Some(value.into_owned()),
                _ => {}
            }
        }
        callback
    }

    fn is_complete(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// Serves HTTP on `listener` until a request carrying a code or an error arrives. Other requests
/// (such as the browser asking for a favicon) get the same page and are otherwise ignored.
async fn wait_for_callback(listener: TcpListener) -> Res<Callback> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Callback>();
    let server = tokio::spawn(async move {
        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("Failed to accept an OAuth callback connection: {e}");
                    continue;
                }
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let callback = Callback::parse(req.uri().query().unwrap_or_default());
                    if callback.is_complete() {
                        let _ = tx.send(callback);
                    }
                    async { Ok::<_, Infallible>(Response::new(CALLBACK_PAGE.to_string())) }
                });
                if let Err(e) = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!("OAuth callback connection ended with an error: {e}");
                }
            });
        }
    });

    let received = tokio::time::timeout(CONSENT_TIMEOUT, rx.recv()).await;
    server.abort();
    match received {
        Ok(Some(callback)) => Ok(callback),
        Ok(None) => bail!("The OAuth callback server stopped unexpectedly"),
        Err(_) => bail!(
            "Timed out after {} seconds waiting for authorization",
            CONSENT_TIMEOUT.as_secs()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_parse() {
        let callback = Callback::parse("state=abc&code=4%2F0Ab&scope=x");
        assert_eq!(callback.code.as_deref(), Some("4/0Ab"));
        assert_eq!(callback.state.as_deref(), Some("abc"));
        assert!(callback.error.is_none());
        assert!(callback.is_complete());

        let denied = Callback::parse("error=access_denied&state=abc");
        assert_eq!(denied.error.as_deref(), Some("access_denied"));
        assert!(denied.is_complete());

        assert!(!Callback::parse("").is_complete());
    }

    #[test]
    fn test_expiry() {
        let soon = expiry(Some(Duration::from_secs(60)));
        assert!(soon > Utc::now());
        assert!(soon <= Utc::now() + chrono::Duration::seconds(61));
        assert!(expiry(None) > Utc::now() + chrono::Duration::minutes(59));
    }

    #[tokio::test]
    async fn test_wait_for_callback() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let waiter = tokio::spawn(wait_for_callback(listener));

        let client = reqwest::Client::new();
        let page = client
            .get(format!("http://127.0.0.1:{port}/favicon.ico"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(page, CALLBACK_PAGE);
        client
            .get(format!("http://127.0.0.1:{port}/?code=xyz&state=s1"))
            .send()
            .await
            .unwrap();

        let callback = waiter.await.unwrap().unwrap();
        assert_eq!(callback.code.as_deref(), Some("xyz"));
        assert_eq!(callback.state.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_load_without_token_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let secret = tmp.path().join("client_secret.json");
        crate::utils::write(&secret, crate::test::CLIENT_SECRET_JSON)
            .await
            .unwrap();
        let err = TokenProvider::load(&secret, tmp.path().join("token.json"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("ledger auth"));
    }
}
