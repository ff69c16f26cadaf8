//! Google Calendar adapter.

use super::{check_status, GoogleAuth};
use crate::error::ServiceError;
use crate::services::{CalendarEvent, CalendarService, EventStart};
use async_trait::async_trait;
use chrono::{Local, SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// The Calendar API refuses larger pages.
const MAX_RESULTS: u32 = 2500;

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<RawEvent>,
}

/// An event as returned by the Calendar API (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub summary: Option<String>,
    pub start: Option<RawEventTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEventTime {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    pub date: Option<String>,
}

/// Reads the primary calendar of the authorized account.
pub struct GoogleCalendar {
    http: reqwest::Client,
    auth: Arc<GoogleAuth>,
    api_base: String,
}

impl GoogleCalendar {
    pub fn new(http: reqwest::Client, auth: Arc<GoogleAuth>, api_base: &str) -> Self {
        Self {
            http,
            auth,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    #[instrument(skip(self))]
    async fn upcoming_events(&self, count: u32) -> Result<Vec<CalendarEvent>, ServiceError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let token = self.auth.access_token(&self.required_scopes()).await?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let max_results = count.min(MAX_RESULTS).to_string();

        debug!("Getting the upcoming {} events", count);
        let response = self
            .http
            .get(format!("{}/calendars/primary/events", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("timeMin", now.as_str()),
                ("maxResults", max_results.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;

        let response = match check_status(response).await {
            Err(ServiceError::Unauthorized) => {
                self.auth.invalidate().await;
                return Err(ServiceError::Unauthorized);
            }
            other => other?,
        };

        let list: EventList = response.json().await?;
        if list.items.is_empty() {
            debug!("No upcoming events found");
        }
        Ok(normalize_events(list.items, count))
    }

    fn required_scopes(&self) -> Vec<String> {
        vec![CALENDAR_READONLY_SCOPE.to_string()]
    }
}

/// Turn API items into events: at most `count`, ordered by start.
///
/// Items without a readable start are skipped; a missing title becomes
/// `(no title)`. All-day events order at local midnight.
pub fn normalize_events(items: Vec<RawEvent>, count: u32) -> Vec<CalendarEvent> {
    normalize_events_in(items, count, &Local)
}

/// [`normalize_events`] with all-day events placed at midnight in `tz`.
///
/// The sort is stable, so a list the API already ordered is kept as is.
pub fn normalize_events_in<Tz: TimeZone>(items: Vec<RawEvent>, count: u32, tz: &Tz) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = items
        .into_iter()
        .filter_map(|item| {
            let raw_start = item
                .start
                .as_ref()
                .and_then(|s| s.date_time.as_deref().or(s.date.as_deref()));
            let start = match raw_start.and_then(EventStart::parse) {
                Some(start) => start,
                None => {
                    warn!("Skipping event with unreadable start: {:?}", item.start);
                    return None;
                }
            };
            Some(CalendarEvent {
                start,
                name: item.summary.unwrap_or_else(|| "(no title)".to_string()),
            })
        })
        .collect();

    events.sort_by_key(|e| e.start.sort_key_in(tz));
    events.truncate(count as usize);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::{CredentialStore, Credential, OAuthClient};
    use chrono::FixedOffset;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn raw(summary: Option<&str>, date_time: Option<&str>, date: Option<&str>) -> RawEvent {
        RawEvent {
            summary: summary.map(str::to_string),
            start: Some(RawEventTime {
                date_time: date_time.map(str::to_string),
                date: date.map(str::to_string),
            }),
        }
    }

    fn authorized(dir: &std::path::Path) -> Arc<GoogleAuth> {
        let store = CredentialStore::new(dir.join("token.json"), dir.join("credentials.json"));
        store
            .persist(&Credential {
                token: Some("tok".to_string()),
                refresh_token: None,
                token_uri: "http://unused/token".to_string(),
                client_id: "id".to_string(),
                client_secret: "s".to_string(),
                scopes: vec![CALENDAR_READONLY_SCOPE.to_string()],
                expiry: Some(Utc::now() + chrono::Duration::hours(1)),
            })
            .unwrap();
        Arc::new(GoogleAuth::new(store, OAuthClient::new(reqwest::Client::new())).with_interactive(false))
    }

    #[test]
    fn test_normalize_orders_and_truncates() {
        let items = vec![
            raw(Some("Late"), Some("2026-10-20T15:00:00Z"), None),
            raw(Some("Holiday"), None, Some("2026-10-19")),
            raw(None, Some("2026-10-19T08:00:00+00:00"), None),
            raw(Some("Broken"), None, None),
        ];

        let events = normalize_events_in(items, 2, &Utc);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Holiday");
        assert_eq!(events[1].name, "(no title)");
    }

    #[test]
    fn test_normalize_is_non_decreasing() {
        let items = vec![
            raw(Some("b"), Some("2026-10-19T10:00:00Z"), None),
            raw(Some("a"), Some("2026-10-19T09:00:00Z"), None),
            raw(Some("c"), Some("2026-10-19T10:00:00Z"), None),
        ];
        let events = normalize_events_in(items, 10, &Utc);
        let keys: Vec<_> = events.iter().map(|e| e.start.sort_key_in(&Utc)).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        // Stable for equal starts.
        assert_eq!(events[1].name, "b");
        assert_eq!(events[2].name, "c");
    }

    #[test]
    fn test_remote_order_kept_west_of_utc() {
        let pacific = FixedOffset::west_opt(7 * 3600).unwrap();
        let items = vec![
            raw(Some("Late dinner"), Some("2026-10-18T20:00:00-07:00"), None),
            raw(Some("Holiday"), None, Some("2026-10-19")),
            raw(Some("Standup"), Some("2026-10-19T09:00:00-07:00"), None),
        ];

        let names: Vec<_> = normalize_events_in(items, 10, &pacific)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["Late dinner", "Holiday", "Standup"]);
    }

    #[tokio::test]
    async fn test_fetches_upcoming_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer tok"))
            .and(query_param("maxResults", "1"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "calendar#events",
                "items": [
                    {"summary": "Team sync", "start": {"dateTime": "2026-10-19T09:00:00-07:00"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let calendar = GoogleCalendar::new(reqwest::Client::new(), authorized(dir.path()), &server.uri());

        let events = calendar.upcoming_events(1).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Team sync");
    }

    #[tokio::test]
    async fn test_empty_calendar_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let calendar = GoogleCalendar::new(reqwest::Client::new(), authorized(dir.path()), &server.uri());
        assert!(calendar.upcoming_events(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_count_skips_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = GoogleCalendar::new(reqwest::Client::new(), authorized(dir.path()), "http://127.0.0.1:1");
        assert!(calendar.upcoming_events(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_for_next_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer revoked"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"summary": "Team sync", "start": {"date": "2026-10-19"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"), dir.path().join("credentials.json"));
        store
            .persist(&Credential {
                token: Some("revoked".to_string()),
                refresh_token: Some("r".to_string()),
                token_uri: format!("{}/token", server.uri()),
                client_id: "id".to_string(),
                client_secret: "s".to_string(),
                scopes: vec![CALENDAR_READONLY_SCOPE.to_string()],
                expiry: Some(Utc::now() + chrono::Duration::hours(1)),
            })
            .unwrap();
        let auth = Arc::new(
            GoogleAuth::new(store, OAuthClient::new(reqwest::Client::new())).with_interactive(false),
        );
        let calendar = GoogleCalendar::new(reqwest::Client::new(), auth, &server.uri());

        assert!(matches!(
            calendar.upcoming_events(1).await,
            Err(ServiceError::Unauthorized)
        ));
        let events = calendar.upcoming_events(1).await.unwrap();
        assert_eq!(events[0].name, "Team sync");
    }

    #[tokio::test]
    async fn test_http_errors_are_typed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let calendar = GoogleCalendar::new(reqwest::Client::new(), authorized(dir.path()), &server.uri());
        assert!(matches!(
            calendar.upcoming_events(3).await,
            Err(ServiceError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": 404, "message": "Not Found"}
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let calendar = GoogleCalendar::new(reqwest::Client::new(), authorized(dir.path()), &server.uri());
        match calendar.upcoming_events(3).await {
            Err(ServiceError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing listens on port 1.
        let calendar = GoogleCalendar::new(reqwest::Client::new(), authorized(dir.path()), "http://127.0.0.1:1");
        assert!(matches!(
            calendar.upcoming_events(3).await,
            Err(ServiceError::Transport(_))
        ));
    }
}
