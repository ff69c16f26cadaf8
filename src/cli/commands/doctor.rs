//! Doctor command - verify configuration and Google credentials.

use crate::assistant::Assistant;
use crate::cli::Output;
use crate::config::Settings;
use crate::google::{ClientSecret, Credential, CredentialStore};
use chrono::Utc;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Tidings Doctor");
    println!();

    let mut checks = Vec::new();
    let mut section = |title: &str, results: Vec<CheckResult>| {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    };

    section("API Configuration", vec![check_openai_api_key()]);
    section(
        "Configuration",
        vec![check_config_file(config_path), check_data_dir(settings)],
    );

    let required = Assistant::new(settings.clone())
        .map(|a| a.auth().required_scopes(&[]))
        .unwrap_or_default();
    let store = CredentialStore::new(settings.token_path(), settings.client_secret_path());
    section(
        "Google Account",
        vec![check_client_secret(&store), check_token(&store, &required)],
    );

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Tidings.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Tidings is ready to use.");
    }

    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create one with: tidings config edit",
        )
    }
}

fn check_data_dir(settings: &Settings) -> CheckResult {
    let data_dir = settings.data_dir();
    if data_dir.exists() {
        CheckResult::ok("Data directory", &data_dir.display().to_string())
    } else {
        CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        )
    }
}

fn check_client_secret(store: &CredentialStore) -> CheckResult {
    let path = store.client_secret_path();
    let hint = "Download an OAuth client (desktop app) JSON from the Google Cloud console";
    match std::fs::read_to_string(path) {
        Ok(content) => match ClientSecret::from_json(&content) {
            Ok(secret) => CheckResult::ok(
                "Client secret",
                &format!("{} (client {})", path.display(), secret.client_id),
            ),
            Err(e) => CheckResult::error("Client secret", &e.to_string(), hint),
        },
        Err(_) => CheckResult::warning(
            "Client secret",
            &format!("{} not found", path.display()),
            hint,
        ),
    }
}

fn check_token(store: &CredentialStore, required: &[String]) -> CheckResult {
    match store.load() {
        Ok(Some(credential)) => token_status(&credential, required),
        Ok(None) => CheckResult::warning(
            "Stored token",
            "not authorized yet",
            "Run: tidings auth",
        ),
        Err(e) => CheckResult::error("Stored token", &e.to_string(), "Run: tidings auth"),
    }
}

/// Classify a stored credential against the scopes the tools need.
fn token_status(credential: &Credential, required: &[String]) -> CheckResult {
    let missing = credential.missing_scopes(required);
    if !missing.is_empty() {
        return CheckResult::warning(
            "Stored token",
            &format!("missing scopes: {}", missing.join(", ")),
            "Run: tidings auth",
        );
    }

    if credential.is_valid(Utc::now()) {
        CheckResult::ok("Stored token", "valid")
    } else if credential.can_refresh() {
        CheckResult::ok("Stored token", "expired, will be refreshed on next use")
    } else {
        CheckResult::warning(
            "Stored token",
            "expired and cannot be refreshed",
            "Run: tidings auth",
        )
    }
}
