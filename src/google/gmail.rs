//! Gmail adapter: fetch unread mail and mark it read.

use super::body::body_text;
use super::{check_status, GoogleAuth};
use crate::error::ServiceError;
use crate::services::{EmailMessage, MailService, UnreadMail};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Reading and removing the UNREAD label both need the modify scope.
pub const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

const UNREAD_LABEL: &str = "UNREAD";

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// A message as returned with `format=full` (only the fields we read).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: String,
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    pub body: Option<PartBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    pub data: Option<String>,
}

/// Reads the mailbox of the authorized account.
pub struct Gmail {
    http: reqwest::Client,
    auth: Arc<GoogleAuth>,
    api_base: String,
}

impl Gmail {
    pub fn new(http: reqwest::Client, auth: Arc<GoogleAuth>, api_base: &str) -> Self {
        Self {
            http,
            auth,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        let response = request.send().await?;
        match check_status(response).await {
            Err(ServiceError::Unauthorized) => {
                self.auth.invalidate().await;
                Err(ServiceError::Unauthorized)
            }
            other => other,
        }
    }

    async fn list_unread(&self, token: &str, count: u32, within_days: u32) -> Result<Vec<String>, ServiceError> {
        let query = format!("is:unread newer_than:{}d", within_days.max(1));
        let max_results = count.to_string();

        let response = self
            .send(
                self.http
                    .get(format!("{}/users/me/messages", self.api_base))
                    .bearer_auth(token)
                    .query(&[("q", query.as_str()), ("maxResults", max_results.as_str())]),
            )
            .await?;

        let list: MessageList = response.json().await?;
        Ok(list
            .messages
            .into_iter()
            .take(count as usize)
            .map(|m| m.id)
            .collect())
    }

    async fn fetch(&self, token: &str, id: &str) -> Result<RawMessage, ServiceError> {
        let response = self
            .send(
                self.http
                    .get(format!("{}/users/me/messages/{}", self.api_base, id))
                    .bearer_auth(token)
                    .query(&[("format", "full")]),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn mark_read(&self, token: &str, ids: &[String]) -> Result<(), ServiceError> {
        self.send(
            self.http
                .post(format!("{}/users/me/messages/batchModify", self.api_base))
                .bearer_auth(token)
                .json(&serde_json::json!({
                    "ids": ids,
                    "removeLabelIds": [UNREAD_LABEL],
                })),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MailService for Gmail {
    #[instrument(skip(self))]
    async fn unread(&self, count: u32, within_days: u32) -> Result<UnreadMail, ServiceError> {
        if count == 0 {
            return Ok(UnreadMail::NoNewEmails);
        }

        let token = self.auth.access_token(&self.required_scopes()).await?;
        let ids = self.list_unread(&token, count, within_days).await?;
        if ids.is_empty() {
            debug!("No unread messages in the last {} day(s)", within_days);
            return Ok(UnreadMail::NoNewEmails);
        }

        let mut messages = Vec::with_capacity(ids.len());
        for id in &ids {
            let raw = self.fetch(&token, id).await?;
            messages.push(normalize_message(&raw));
        }

        if let Err(e) = self.mark_read(&token, &ids).await {
            warn!("Fetched {} message(s) but could not mark them read: {}", ids.len(), e);
        } else {
            info!("Marked {} message(s) read", ids.len());
        }

        Ok(UnreadMail::Messages(messages))
    }

    fn required_scopes(&self) -> Vec<String> {
        vec![GMAIL_MODIFY_SCOPE.to_string()]
    }
}

/// `(sender, date, subject)` from message headers. The first header of each
/// name wins and the scan stops once all three are known.
pub fn extract_headers(headers: &[Header]) -> (String, String, String) {
    let mut sender = None;
    let mut date = None;
    let mut subject = None;

    for header in headers {
        let slot = if header.name.eq_ignore_ascii_case("From") {
            &mut sender
        } else if header.name.eq_ignore_ascii_case("Date") {
            &mut date
        } else if header.name.eq_ignore_ascii_case("Subject") {
            &mut subject
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(header.value.clone());
        }
        if sender.is_some() && date.is_some() && subject.is_some() {
            break;
        }
    }

    (
        sender.unwrap_or_default(),
        date.unwrap_or_default(),
        subject.unwrap_or_default(),
    )
}

/// Build an [`EmailMessage`]; the body comes from the first MIME part and is
/// empty when there is none or it cannot be decoded.
pub fn normalize_message(raw: &RawMessage) -> EmailMessage {
    let payload = raw.payload.clone().unwrap_or_default();
    let (sender, date, subject) = extract_headers(&payload.headers);

    let body = payload
        .parts
        .first()
        .and_then(|part| part.body.as_ref())
        .and_then(|body| body.data.as_deref())
        .map(body_text)
        .unwrap_or_default();

    if body.is_empty() {
        debug!("Message {} has no readable body", raw.id);
    }

    EmailMessage {
        sender,
        date,
        subject,
        body,
    }
}
