//! Auth command implementation.

use crate::assistant::Assistant;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the Google consent flow now and store the resulting credential.
pub async fn run_auth(settings: Settings) -> Result<()> {
    let client_secret = settings.client_secret_path();
    if !client_secret.exists() {
        Output::error(&format!("Client secret not found at {}", client_secret.display()));
        Output::info("Create an OAuth client (desktop app) in the Google Cloud console and download its JSON there.");
        anyhow::bail!("missing client secret");
    }

    let assistant = Assistant::new(settings)?;
    let auth = assistant.auth();

    Output::header("Google authorization");
    for scope in auth.required_scopes(&[]) {
        Output::kv("Scope", &scope);
    }
    println!();

    match auth.grant().await {
        Ok(credential) => {
            Output::success("Authorized.");
            Output::kv("Token", &auth.store().token_path().display().to_string());
            if let Some(expiry) = credential.expiry {
                Output::kv("Expires", &expiry.to_rfc3339());
            }
            if credential.refresh_token.is_none() {
                Output::warning("No refresh token was issued; you will need to authorize again when the token expires.");
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Authorization failed: {}", e));
            Err(e.into())
        }
    }
}
