//! Tools the agent can call.

mod calendar;
mod mail;
mod registry;
mod schema;

pub use calendar::{UpcomingEventsTool, UPCOMING_EVENTS_TOOL};
pub use mail::{UnreadEmailsTool, UNREAD_EMAILS_TOOL};
pub use registry::{Tool, ToolCallRequest, ToolCallResult, ToolDefinition, ToolRegistry};
pub use schema::parse_arguments;

use crate::config::Settings;
use crate::error::ToolError;
use crate::services::{CalendarService, MailService};
use std::sync::Arc;

/// The assistant's tool set: upcoming events, then unread email.
pub fn default_registry(
    calendar: Arc<dyn CalendarService>,
    mail: Arc<dyn MailService>,
    settings: &Settings,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(UpcomingEventsTool::new(
        calendar,
        settings.calendar.default_count,
    )))?;
    registry.register(Arc::new(UnreadEmailsTool::new(
        mail,
        settings.mail.default_count,
        settings.mail.within_days,
    )))?;
    Ok(registry)
}
