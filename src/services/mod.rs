//! Account-scoped services the assistant can read from.
//!
//! The traits here are what the tools depend on; `crate::google` provides the
//! real implementations. Records are plain data, formatting for humans lives in
//! [`format_event`] and [`format_email`].

use crate::error::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Model-facing text returned when there is no unread mail.
pub const NO_NEW_EMAILS: &str = "No new emails";

/// Start of a calendar event, either a timed start or an all-day date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventStart {
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
}

impl EventStart {
    /// Parse a remote start value: RFC 3339 first, then a bare `YYYY-MM-DD` date.
    pub fn parse(value: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(EventStart::DateTime(dt));
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(EventStart::Date)
    }

    /// Instant used for ordering. All-day events start at local midnight.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.sort_key_in(&Local)
    }

    /// Like [`sort_key`](Self::sort_key), with all-day events placed at
    /// midnight in `tz`.
    pub fn sort_key_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            EventStart::DateTime(dt) => dt.with_timezone(&Utc),
            EventStart::Date(d) => {
                let midnight = d.and_hms_opt(0, 0, 0).unwrap_or_default();
                // A skipped local midnight (DST gap) falls back to UTC.
                tz.from_local_datetime(&midnight)
                    .earliest()
                    .map(|start| start.with_timezone(&Utc))
                    .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
            }
        }
    }
}

impl std::fmt::Display for EventStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStart::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            EventStart::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// A normalized calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start: EventStart,
    pub name: String,
}

/// A normalized mail message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub sender: String,
    pub date: String,
    pub subject: String,
    pub body: String,
}

/// Result of an unread-mail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnreadMail {
    NoNewEmails,
    Messages(Vec<EmailMessage>),
}

impl UnreadMail {
    /// Number of messages fetched.
    pub fn len(&self) -> usize {
        match self {
            UnreadMail::NoNewEmails => 0,
            UnreadMail::Messages(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read access to the user's calendar.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// The `count` soonest events starting at or after now, ordered by start.
    async fn upcoming_events(&self, count: u32) -> Result<Vec<CalendarEvent>, ServiceError>;

    /// OAuth scopes this service needs.
    fn required_scopes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Access to the user's unread mail.
#[async_trait]
pub trait MailService: Send + Sync {
    /// Up to `count` unread messages received in the last `within_days` days.
    /// Every returned message is marked read.
    async fn unread(&self, count: u32, within_days: u32) -> Result<UnreadMail, ServiceError>;

    /// OAuth scopes this service needs.
    fn required_scopes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Human-readable line for an event.
pub fn format_event(event: &CalendarEvent) -> String {
    format!("Event: {} at {}", event.name, event.start)
}

/// Human-readable block for a message.
pub fn format_email(email: &EmailMessage) -> String {
    let mut out = format!(
        "From: {}\nDate: {}\nSubject: {}",
        email.sender, email.date, email.subject
    );
    if !email.body.is_empty() {
        out.push_str("\n\n");
        out.push_str(&email.body);
    }
    out
}
