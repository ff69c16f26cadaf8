//! Google account adapters: OAuth credentials, Calendar and Gmail.
//!
//! Talks to the documented REST endpoints with `reqwest`. Every remote failure
//! is reported as a typed [`ServiceError`] so the tools can pick a fallback.

pub mod auth;
mod body;
mod calendar;
pub mod credential;
mod gmail;

pub use auth::{ConsentPrompt, GoogleAuth, OAuthClient};
pub use body::{body_text, decode_body, html_to_text, BodyError};
pub use calendar::{normalize_events, normalize_events_in, GoogleCalendar, RawEvent, CALENDAR_READONLY_SCOPE};
pub use credential::{ClientSecret, Credential, CredentialStore};
pub use gmail::{extract_headers, normalize_message, Gmail, RawMessage, GMAIL_MODIFY_SCOPE};

use crate::error::ServiceError;
use serde::Deserialize;
use std::time::Duration;

/// HTTP client shared by the auth flow and the adapters.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Map a non-success response onto the error taxonomy.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 => Err(ServiceError::Unauthorized),
        429 => Err(ServiceError::RateLimited),
        code => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            if code == 403 && message.to_lowercase().contains("rate limit") {
                return Err(ServiceError::RateLimited);
            }
            Err(ServiceError::Api {
                status: code,
                message,
            })
        }
    }
}
