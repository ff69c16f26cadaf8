//! Events command implementation.

use crate::assistant::Assistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Print the next events on the calendar.
pub async fn run_events(count: Option<u32>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Google, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let count = count.unwrap_or(settings.calendar.default_count);
    let assistant = Assistant::new(settings)?;

    let events = match assistant.calendar().upcoming_events(count).await {
        Ok(events) => events,
        Err(e) => {
            Output::error(&format!("Failed to read calendar: {}", e));
            return Err(e.into());
        }
    };

    if events.is_empty() {
        Output::info("No upcoming events found.");
        return Ok(());
    }

    Output::header("Upcoming events");
    for event in &events {
        Output::event(event);
    }

    Ok(())
}
