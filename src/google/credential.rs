//! Persisted Google authorization state and the OAuth client secret.

use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Authorized-user credential, stored in the same JSON shape Google's client
/// libraries write, so an existing `token.json` can be reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Current access token.
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Whether the access token is past (or within the skew of) its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .map(|expiry| now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry)
            .unwrap_or(false)
    }

    /// Whether the access token can be used as is.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some() && !self.is_expired(now)
    }

    /// Whether an expired token can be renewed without user interaction.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Scopes from `required` that this credential was not granted.
    pub fn missing_scopes(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|scope| !self.scopes.contains(scope))
            .cloned()
            .collect()
    }
}

/// OAuth client registration for an installed application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Layout of the file downloaded from the Google Cloud console.
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Parse a client secret file body (`installed` or `web` application).
    pub fn from_json(content: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile = serde_json::from_str(content)
            .map_err(|e| AuthError::InvalidClientSecret(e.to_string()))?;
        file.installed.or(file.web).ok_or_else(|| {
            AuthError::InvalidClientSecret(
                "expected an 'installed' or 'web' section".to_string(),
            )
        })
    }
}

/// Files holding the client secret (read-only) and the authorized credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    token_path: PathBuf,
    client_secret_path: PathBuf,
}

impl CredentialStore {
    pub fn new(token_path: PathBuf, client_secret_path: PathBuf) -> Self {
        Self {
            token_path,
            client_secret_path,
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn client_secret_path(&self) -> &Path {
        &self.client_secret_path
    }

    /// Load the stored credential, if any.
    pub fn load(&self) -> Result<Option<Credential>, AuthError> {
        if !self.token_path.exists() {
            debug!("No stored credential at {}", self.token_path.display());
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.token_path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the credential, replacing any previous one.
    pub fn persist(&self, credential: &Credential) -> Result<(), AuthError> {
        if let Some(parent) = self.token_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(credential)?;
        std::fs::write(&self.token_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.token_path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!("Persisted credential to {}", self.token_path.display());
        Ok(())
    }

    /// Read the OAuth client registration.
    pub fn load_client_secret(&self) -> Result<ClientSecret, AuthError> {
        if !self.client_secret_path.exists() {
            return Err(AuthError::MissingClientSecret(
                self.client_secret_path.display().to_string(),
            ));
        }
        let content = std::fs::read_to_string(&self.client_secret_path)?;
        ClientSecret::from_json(&content)
    }
}
