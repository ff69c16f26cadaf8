//! OAuth2 installed-application flow and access-token management.

use super::credential::{ClientSecret, Credential, CredentialStore};
use crate::error::AuthError;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Called with the consent URL the user has to open.
pub type ConsentPrompt = Arc<dyn Fn(&str) + Send + Sync>;

const CONSENT_DONE_PAGE: &str = "<html><body><h3>Tidings is authorized.</h3><p>You can close this window.</p></body></html>";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

/// Token endpoint client.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Consent page URL for the given redirect and scopes.
    pub fn authorization_url(
        &self,
        secret: &ClientSecret,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<String, AuthError> {
        let url = url::Url::parse_with_params(
            &secret.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", secret.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scopes.join(" ").as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::InvalidClientSecret(format!("bad auth_uri: {}", e)))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code for a credential.
    pub async fn exchange_code(
        &self,
        secret: &ClientSecret,
        code: &str,
        redirect_uri: &str,
        requested_scopes: &[String],
    ) -> Result<Credential, AuthError> {
        let response = self
            .http
            .post(&secret.token_uri)
            .form(&[
                ("code", code),
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Grant(format!("token request failed: {}", e)))?;

        let token = read_token_response(response).await.map_err(AuthError::Grant)?;

        Ok(Credential {
            token: Some(token.access_token),
            refresh_token: token.refresh_token,
            token_uri: secret.token_uri.clone(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            scopes: token
                .scope
                .map(|s| split_scopes(&s))
                .unwrap_or_else(|| requested_scopes.to_vec()),
            expiry: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    /// Renew the access token in place using the refresh token.
    #[instrument(skip_all)]
    pub async fn refresh(&self, credential: &mut Credential) -> Result<(), AuthError> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::Refresh("credential has no refresh token".to_string()))?;

        let response = self
            .http
            .post(&credential.token_uri)
            .form(&[
                ("client_id", credential.client_id.as_str()),
                ("client_secret", credential.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Refresh(format!("token request failed: {}", e)))?;

        let token = read_token_response(response).await.map_err(AuthError::Refresh)?;

        credential.token = Some(token.access_token);
        credential.expiry = token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(rotated) = token.refresh_token {
            credential.refresh_token = Some(rotated);
        }
        if let Some(scope) = token.scope {
            credential.scopes = split_scopes(&scope);
        }

        debug!("Access token refreshed");
        Ok(())
    }

    /// Run the loopback consent flow: listen locally, hand the consent URL to
    /// `prompt`, wait for the redirect and exchange its code.
    pub async fn grant(
        &self,
        secret: &ClientSecret,
        scopes: &[String],
        port: u16,
        prompt: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<Credential, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| AuthError::Grant(format!("cannot listen for the redirect: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Grant(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{}/", port);

        prompt(&self.authorization_url(secret, &redirect_uri, scopes)?);
        info!("Waiting for the consent redirect on port {}", port);

        let code = loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| AuthError::Grant(e.to_string()))?;
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader
                .read_line(&mut request_line)
                .await
                .map_err(|e| AuthError::Grant(e.to_string()))?;

            let outcome = parse_redirect(&request_line);
            let mut stream = reader.into_inner();
            let reply = match &outcome {
                Ok(Some(_)) | Err(_) => format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    CONSENT_DONE_PAGE.len(),
                    CONSENT_DONE_PAGE
                ),
                Ok(None) => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    .to_string(),
            };
            if let Err(e) = stream.write_all(reply.as_bytes()).await {
                debug!("Could not answer the browser: {}", e);
            }

            if let Some(code) = outcome? {
                break code;
            }
        };

        self.exchange_code(secret, &code, &redirect_uri, scopes).await
    }
}

async fn read_token_response(response: reqwest::Response) -> Result<TokenResponse, String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
        return Err(format!("{}: {}", status, body));
    }
    serde_json::from_str(&body).map_err(|e| format!("unexpected token response: {}", e))
}

fn split_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_string).collect()
}

/// Pull the authorization code out of the redirect's request line.
///
/// `Ok(None)` means the request was not the redirect (a favicon fetch, say).
pub fn parse_redirect(request_line: &str) -> Result<Option<String>, AuthError> {
    let Some(target) = request_line.split_whitespace().nth(1) else {
        return Ok(None);
    };
    let url = url::Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| AuthError::Grant(format!("malformed redirect: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => return Err(AuthError::Grant(format!("consent denied: {}", value))),
            _ => {}
        }
    }
    Ok(code)
}

/// Hands out access tokens for the configured Google account.
///
/// Loads the stored credential on first use, refreshes it when it expires and
/// falls back to the consent flow when it is missing, unrefreshable or lacks a
/// scope. Every change is written back through the [`CredentialStore`].
pub struct GoogleAuth {
    store: CredentialStore,
    oauth: OAuthClient,
    interactive: bool,
    redirect_port: u16,
    consent_prompt: ConsentPrompt,
    scopes: StdMutex<Vec<String>>,
    cached: Mutex<Option<Credential>>,
}

impl GoogleAuth {
    pub fn new(store: CredentialStore, oauth: OAuthClient) -> Self {
        Self {
            store,
            oauth,
            interactive: true,
            redirect_port: 0,
            consent_prompt: Arc::new(|url| {
                eprintln!("Open this URL in your browser to authorize Tidings:\n\n  {}\n", url)
            }),
            scopes: StdMutex::new(Vec::new()),
            cached: Mutex::new(None),
        }
    }

    /// Allow or forbid the browser consent flow.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Loopback port for the consent redirect.
    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    /// Replace how the consent URL is shown to the user.
    pub fn with_consent_prompt(mut self, prompt: ConsentPrompt) -> Self {
        self.consent_prompt = prompt;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Add scopes every credential must carry.
    pub fn require_scopes(&self, scopes: &[String]) {
        let mut required = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        for scope in scopes {
            if !required.contains(scope) {
                required.push(scope.clone());
            }
        }
    }

    /// All scopes currently required, plus `extra`.
    pub fn required_scopes(&self, extra: &[String]) -> Vec<String> {
        let mut scopes = self
            .scopes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for scope in extra {
            if !scopes.contains(scope) {
                scopes.push(scope.clone());
            }
        }
        scopes
    }

    /// A usable access token covering the required scopes and `extra`.
    pub async fn access_token(&self, extra: &[String]) -> Result<String, AuthError> {
        let required = self.required_scopes(extra);
        let mut cached = self.cached.lock().await;

        let stored = match cached.take() {
            Some(credential) => Some(credential),
            None => match self.store.load() {
                Ok(credential) => credential,
                Err(AuthError::Format(e)) => {
                    warn!("Stored credential is unreadable, re-authorizing: {}", e);
                    None
                }
                Err(e) => return Err(e),
            },
        };

        let now = Utc::now();
        let credential = match stored {
            Some(credential)
                if credential.is_valid(now) && credential.missing_scopes(&required).is_empty() =>
            {
                credential
            }
            Some(mut credential)
                if credential.can_refresh() && credential.missing_scopes(&required).is_empty() =>
            {
                match self.oauth.refresh(&mut credential).await {
                    Ok(()) => {
                        self.store.persist(&credential)?;
                        credential
                    }
                    Err(e) => {
                        warn!("Refreshing the stored credential failed, re-authorizing: {}", e);
                        self.authorize(&required).await?
                    }
                }
            }
            Some(credential) => {
                let missing = credential.missing_scopes(&required);
                if missing.is_empty() {
                    info!("Stored credential expired without a refresh token");
                } else {
                    info!("Stored credential lacks scopes: {}", missing.join(", "));
                }
                self.authorize(&required).await?
            }
            None => self.authorize(&required).await?,
        };

        let token = credential
            .token
            .clone()
            .ok_or_else(|| AuthError::Grant("credential carries no access token".to_string()))?;
        *cached = Some(credential);
        Ok(token)
    }

    /// Mark the current access token as rejected.
    ///
    /// The credential is stored as expired, so the next call refreshes it or
    /// runs the grant flow instead of sending the same token again.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        let mut credential = match cached.take() {
            Some(credential) => credential,
            None => match self.store.load() {
                Ok(Some(credential)) => credential,
                _ => return,
            },
        };

        credential.expiry = Some(Utc::now() - Duration::seconds(1));
        if let Err(e) = self.store.persist(&credential) {
            warn!("Could not store the rejected credential as expired: {}", e);
        }
        debug!("Access token rejected, marked as expired");
        *cached = Some(credential);
    }

    /// Run the consent flow now for all required scopes and persist the result.
    pub async fn grant(&self) -> Result<Credential, AuthError> {
        let required = self.required_scopes(&[]);
        let credential = self.run_consent(&required).await?;
        *self.cached.lock().await = Some(credential.clone());
        Ok(credential)
    }

    async fn authorize(&self, required: &[String]) -> Result<Credential, AuthError> {
        if !self.interactive {
            return Err(AuthError::GrantRequired);
        }
        self.run_consent(required).await
    }

    async fn run_consent(&self, required: &[String]) -> Result<Credential, AuthError> {
        let secret = self.store.load_client_secret()?;
        let credential = self
            .oauth
            .grant(&secret, required, self.redirect_port, self.consent_prompt.as_ref())
            .await?;

        let missing = credential.missing_scopes(required);
        if !missing.is_empty() {
            return Err(AuthError::InsufficientScopes { missing });
        }

        self.store.persist(&credential)?;
        info!("Authorization granted and stored");
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scopes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn stored(token_uri: &str, expiry_offset_secs: i64, scope_list: &[&str]) -> Credential {
        Credential {
            token: Some("old-token".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            token_uri: token_uri.to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            scopes: scopes(scope_list),
            expiry: Some(Utc::now() + Duration::seconds(expiry_offset_secs)),
        }
    }

    fn auth_in(dir: &std::path::Path) -> GoogleAuth {
        let store = CredentialStore::new(dir.join("token.json"), dir.join("credentials.json"));
        GoogleAuth::new(store, OAuthClient::new(reqwest::Client::new())).with_interactive(false)
    }

    #[test]
    fn test_parse_redirect() {
        assert_eq!(
            parse_redirect("GET /?code=4%2Fabc&scope=x HTTP/1.1\r\n").unwrap(),
            Some("4/abc".to_string())
        );
        assert_eq!(parse_redirect("GET /favicon.ico HTTP/1.1").unwrap(), None);
        assert_eq!(parse_redirect("").unwrap(), None);
        assert!(matches!(
            parse_redirect("GET /?error=access_denied HTTP/1.1"),
            Err(AuthError::Grant(_))
        ));
    }

    #[test]
    fn test_authorization_url() {
        let client = OAuthClient::new(reqwest::Client::new());
        let secret = ClientSecret::from_json(r#"{"installed": {"client_id": "abc", "client_secret": "s"}}"#)
            .unwrap();
        let url = client
            .authorization_url(&secret, "http://127.0.0.1:8080/", &scopes(&["s1", "s2"]))
            .unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=abc"));
        assert!(url.contains("scope=s1+s2"));
        assert!(url.contains("access_type=offline"));
    }

    #[tokio::test]
    async fn test_valid_stored_credential_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth_in(dir.path());
        auth.store()
            .persist(&stored("http://unused/token", 3600, &["scope/cal"]))
            .unwrap();
        auth.require_scopes(&scopes(&["scope/cal"]));

        assert_eq!(auth.access_token(&[]).await.unwrap(), "old-token");
    }

    #[tokio::test]
    async fn test_expired_credential_is_refreshed_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-token",
                "expires_in": 3599,
                "scope": "scope/cal scope/mail",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let auth = auth_in(dir.path());
        let token_uri = format!("{}/token", server.uri());
        auth.store()
            .persist(&stored(&token_uri, -10, &["scope/cal", "scope/mail"]))
            .unwrap();

        let token = auth.access_token(&scopes(&["scope/mail"])).await.unwrap();
        assert_eq!(token, "new-token");

        let persisted = auth.store().load().unwrap().unwrap();
        assert_eq!(persisted.token.as_deref(), Some("new-token"));
        assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-1"));
        assert!(persisted.is_valid(Utc::now()));

        // Cached now: no second refresh.
        assert_eq!(auth.access_token(&[]).await.unwrap(), "new-token");
    }

    #[tokio::test]
    async fn test_missing_credential_without_interaction_requires_grant() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth_in(dir.path());
        assert!(matches!(
            auth.access_token(&[]).await,
            Err(AuthError::GrantRequired)
        ));
    }

    #[tokio::test]
    async fn test_unreadable_credential_requires_grant() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token.json"), "{not json").unwrap();
        let auth = auth_in(dir.path());

        assert!(matches!(
            auth.access_token(&[]).await,
            Err(AuthError::GrantRequired)
        ));
    }

    #[tokio::test]
    async fn test_invalidated_token_is_refreshed_on_next_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-token",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let auth = auth_in(dir.path());
        auth.store()
            .persist(&stored(&format!("{}/token", server.uri()), 3600, &[]))
            .unwrap();

        assert_eq!(auth.access_token(&[]).await.unwrap(), "old-token");
        auth.invalidate().await;

        let persisted = auth.store().load().unwrap().unwrap();
        assert!(!persisted.is_valid(Utc::now()));

        assert_eq!(auth.access_token(&[]).await.unwrap(), "new-token");
    }

    #[tokio::test]
    async fn test_missing_scope_forces_new_grant() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth_in(dir.path());
        auth.store()
            .persist(&stored("http://unused/token", 3600, &["scope/cal"]))
            .unwrap();
        auth.require_scopes(&scopes(&["scope/cal", "scope/mail"]));

        assert!(matches!(
            auth.access_token(&[]).await,
            Err(AuthError::GrantRequired)
        ));
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let auth = auth_in(dir.path());
        auth.store()
            .persist(&stored(&format!("{}/token", server.uri()), -10, &[]))
            .unwrap();

        assert!(matches!(
            auth.access_token(&[]).await,
            Err(AuthError::GrantRequired)
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_uses_requested_scopes_when_none_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "granted",
                "refresh_token": "r",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let secret = ClientSecret {
            client_id: "id".to_string(),
            client_secret: "s".to_string(),
            auth_uri: "http://unused/auth".to_string(),
            token_uri: format!("{}/token", server.uri()),
        };
        let client = OAuthClient::new(reqwest::Client::new());
        let cred = client
            .exchange_code(&secret, "the-code", "http://127.0.0.1:1/", &scopes(&["scope/cal"]))
            .await
            .unwrap();

        assert_eq!(cred.token.as_deref(), Some("granted"));
        assert_eq!(cred.scopes, scopes(&["scope/cal"]));
        assert_eq!(cred.token_uri, secret.token_uri);
    }
}
