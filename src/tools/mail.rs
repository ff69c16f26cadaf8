//! `get_unread_emails` tool.

use super::calendar::u32_arg;
use super::registry::Tool;
use crate::error::{AuthError, ServiceError, ToolError};
use crate::services::{MailService, UnreadMail, NO_NEW_EMAILS};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const UNREAD_EMAILS_TOOL: &str = "get_unread_emails";

/// Fetches recent unread mail and marks it read.
pub struct UnreadEmailsTool {
    mail: Arc<dyn MailService>,
    default_count: u32,
    default_days: u32,
}

impl UnreadEmailsTool {
    pub fn new(mail: Arc<dyn MailService>, default_count: u32, default_days: u32) -> Self {
        Self {
            mail,
            default_count,
            default_days: default_days.max(1),
        }
    }
}

#[async_trait]
impl Tool for UnreadEmailsTool {
    fn name(&self) -> &str {
        UNREAD_EMAILS_TOOL
    }

    fn description(&self) -> &str {
        "Get the user's unread emails received in the last few days, with sender, \
         date, subject and body. Fetched emails are marked as read. Returns \
         'No new emails' when there are none."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "minimum": 0,
                    "description": format!(
                        "Maximum number of emails to return (default {})",
                        self.default_count
                    )
                },
                "within_days": {
                    "type": "integer",
                    "minimum": 1,
                    "description": format!(
                        "Only emails received in this many trailing days (default {})",
                        self.default_days
                    )
                }
            },
            "required": []
        })
    }

    fn required_scopes(&self) -> Vec<String> {
        self.mail.required_scopes()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let count = u32_arg(&args, "count").unwrap_or(self.default_count);
        let days = u32_arg(&args, "within_days").unwrap_or(self.default_days);

        match self.mail.unread(count, days).await? {
            UnreadMail::NoNewEmails => Ok(Value::String(NO_NEW_EMAILS.to_string())),
            UnreadMail::Messages(messages) => serde_json::to_value(&messages)
                .map_err(|e| ServiceError::Decode(e.to_string()).into()),
        }
    }

    fn fallback(&self, error: &ToolError) -> Value {
        let text = match error {
            ToolError::Service(ServiceError::Auth(AuthError::GrantRequired))
            | ToolError::Service(ServiceError::Unauthorized) => format!(
                "Could not read email: the Google account is not authorized ({}). \
                 Ask the user to run 'tidings auth'.",
                error
            ),
            ToolError::Service(ServiceError::Auth(auth)) => format!(
                "Could not read email: authorization failed ({}). \
                 Ask the user to run 'tidings auth'.",
                auth
            ),
            other => format!("Could not read email: {}", other),
        };
        Value::String(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::EmailMessage;
    use crate::tools::{ToolCallRequest, ToolRegistry};
    use std::sync::Mutex;

    enum Behavior {
        Empty,
        Messages(Vec<EmailMessage>),
        Fail(fn() -> ServiceError),
    }

    struct FakeMail {
        behavior: Behavior,
        requested: Mutex<Vec<(u32, u32)>>,
    }

    #[async_trait]
    impl MailService for FakeMail {
        async fn unread(&self, count: u32, within_days: u32) -> Result<UnreadMail, ServiceError> {
            self.requested.lock().unwrap().push((count, within_days));
            match &self.behavior {
                Behavior::Empty => Ok(UnreadMail::NoNewEmails),
                Behavior::Messages(m) => Ok(UnreadMail::Messages(m.clone())),
                Behavior::Fail(make) => Err(make()),
            }
        }
    }

    fn setup(behavior: Behavior) -> (Arc<FakeMail>, ToolRegistry) {
        let mail = Arc::new(FakeMail {
            behavior,
            requested: Mutex::new(Vec::new()),
        });
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(UnreadEmailsTool::new(mail.clone(), 5, 1)))
            .unwrap();
        (mail, registry)
    }

    fn request(arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_mail".to_string(),
            name: UNREAD_EMAILS_TOOL.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sentinel_is_returned_verbatim() {
        let (_, registry) = setup(Behavior::Empty);
        let result = registry.invoke(&request("{}")).await;
        assert!(!result.is_fallback());
        assert_eq!(result.content(), "No new emails");
    }

    #[tokio::test]
    async fn test_messages_and_defaults() {
        let message = EmailMessage {
            sender: "Ana <ana@example.com>".to_string(),
            date: "Sun, 18 Oct 2026 10:00:00 +0000".to_string(),
            subject: "Lunch?".to_string(),
            body: "Are you free at 1?".to_string(),
        };
        let (mail, registry) = setup(Behavior::Messages(vec![message]));

        let result = registry.invoke(&request(r#"{"within_days": 3}"#)).await;
        assert_eq!(result.value[0]["subject"], "Lunch?");
        assert_eq!(result.value[0]["sender"], "Ana <ana@example.com>");
        assert_eq!(*mail.requested.lock().unwrap(), vec![(5, 3)]);
    }

    #[tokio::test]
    async fn test_zero_days_is_rejected() {
        let (mail, registry) = setup(Behavior::Empty);
        let result = registry.invoke(&request(r#"{"within_days": 0}"#)).await;
        assert!(result.is_fallback());
        assert!(result.content().starts_with("Could not read email: Invalid arguments"));
        assert!(mail.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failures_ask_for_reauthorization() {
        let (_, registry) = setup(Behavior::Fail(|| AuthError::GrantRequired.into()));
        let result = registry.invoke(&request("{}")).await;
        assert!(result.is_fallback());
        assert!(result.content().contains("tidings auth"));

        let (_, registry) = setup(Behavior::Fail(|| {
            AuthError::Refresh("invalid_grant".to_string()).into()
        }));
        let result = registry.invoke(&request("{}")).await;
        assert!(result.content().contains("invalid_grant"));
        assert!(result.content().contains("tidings auth"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_described() {
        let (_, registry) = setup(Behavior::Fail(|| ServiceError::RateLimited));
        let result = registry.invoke(&request("{}")).await;
        assert_eq!(
            result.content(),
            "Could not read email: The remote service is rate limiting requests"
        );
    }
}
