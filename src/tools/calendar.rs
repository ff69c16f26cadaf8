//! `get_upcoming_events` tool.

use super::registry::Tool;
use crate::error::{ServiceError, ToolError};
use crate::services::CalendarService;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

pub const UPCOMING_EVENTS_TOOL: &str = "get_upcoming_events";

/// Lists the next events on the user's calendar.
pub struct UpcomingEventsTool {
    calendar: Arc<dyn CalendarService>,
    default_count: u32,
}

impl UpcomingEventsTool {
    pub fn new(calendar: Arc<dyn CalendarService>, default_count: u32) -> Self {
        Self {
            calendar,
            default_count,
        }
    }
}

#[async_trait]
impl Tool for UpcomingEventsTool {
    fn name(&self) -> &str {
        UPCOMING_EVENTS_TOOL
    }

    fn description(&self) -> &str {
        "Get the user's upcoming calendar events, soonest first. \
         Returns a list of events with their start and name."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "minimum": 0,
                    "description": format!(
                        "How many upcoming events to return (default {})",
                        self.default_count
                    )
                }
            },
            "required": []
        })
    }

    fn required_scopes(&self) -> Vec<String> {
        self.calendar.required_scopes()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let count = u32_arg(&args, "count").unwrap_or(self.default_count);
        let events = self.calendar.upcoming_events(count).await?;
        debug!("Calendar returned {} events", events.len());
        serde_json::to_value(&events).map_err(|e| ServiceError::Decode(e.to_string()).into())
    }

    fn fallback(&self, _error: &ToolError) -> Value {
        json!([])
    }
}

/// Read a non-negative integer argument, saturating at `u32::MAX`.
pub(crate) fn u32_arg(args: &Map<String, Value>, key: &str) -> Option<u32> {
    args.get(key)
        .and_then(Value::as_u64)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
}
