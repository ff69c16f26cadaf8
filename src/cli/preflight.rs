//! Pre-flight checks before talking to remote services.
//!
//! Catches missing configuration up front instead of failing midway through
//! a conversation.

use crate::config::Settings;
use crate::error::{Result, TidingsError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Chatting needs the OpenAI key and a way to authorize Google.
    Chat,
    /// Direct calendar/mail access needs a way to authorize Google.
    Google,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Chat => {
            check_api_key()?;
            check_google(settings)?;
        }
        Operation::Google => {
            check_google(settings)?;
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(TidingsError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(TidingsError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// A stored token or a client secret to obtain one must exist.
fn check_google(settings: &Settings) -> Result<()> {
    if settings.token_path().exists() || settings.client_secret_path().exists() {
        return Ok(());
    }
    Err(TidingsError::Config(format!(
        "No Google credentials found. Download an OAuth client secret (desktop app) \
         from the Google Cloud console and save it as {}",
        settings.client_secret_path().display()
    )))
}
