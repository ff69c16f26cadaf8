//! Mail command implementation.

use crate::assistant::Assistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::services::{format_email, EmailMessage, UnreadMail, NO_NEW_EMAILS};
use anyhow::Result;
use std::io::{self, Write};
use tracing::warn;

/// Print recent unread mail. The messages are marked read.
pub async fn run_mail(count: Option<u32>, days: Option<u32>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Google, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let count = count.unwrap_or(settings.mail.default_count);
    let days = days.unwrap_or(settings.mail.within_days).max(1);
    let assistant = Assistant::new(settings)?;

    let messages = match assistant.mail().unread(count, days).await {
        Ok(UnreadMail::NoNewEmails) => {
            Output::info(NO_NEW_EMAILS);
            return Ok(());
        }
        Ok(UnreadMail::Messages(messages)) => messages,
        Err(e) => {
            Output::error(&format!("Failed to read email: {}", e));
            return Err(e.into());
        }
    };

    let printed = write_messages(&mut io::stdout().lock(), &messages);
    if printed < messages.len() {
        Output::warning(&format!(
            "{} of {} messages could not be printed.",
            messages.len() - printed,
            messages.len()
        ));
    }

    Ok(())
}

/// Write each message on its own; one that fails to print is logged and
/// skipped. Returns how many were written.
fn write_messages(out: &mut impl Write, messages: &[EmailMessage]) -> usize {
    let mut written = 0;
    for message in messages {
        match writeln!(out, "{}\n{}\n", "-".repeat(40), format_email(message)) {
            Ok(()) => written += 1,
            Err(e) => warn!("Could not print message '{}': {}", message.subject, e),
        }
    }
    written
}
