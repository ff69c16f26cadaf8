//! CLI output formatting utilities.

use crate::agent::{AgentResponse, ScratchpadEntry};
use crate::services::{format_event, CalendarEvent};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a calendar event line.
    pub fn event(event: &CalendarEvent) {
        println!("  {} {}", style("*").cyan(), format_event(event));
    }

    /// Print the tool calls behind an answer.
    pub fn steps(steps: &[ScratchpadEntry]) {
        for step in steps {
            let marker = if step.result.is_fallback() {
                style("✗").red()
            } else {
                style("✓").green()
            };
            println!(
                "  {} {} {}",
                marker,
                style(format!("[{}]", step.request)).dim(),
                content_preview(&step.result.content(), 120)
            );
        }
    }

    /// Warn when an answer was given after the tool call limit.
    pub fn limit_warning(response: &AgentResponse) {
        if let Some(msg) = limit_notice(response) {
            Self::warning(msg);
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn limit_notice(response: &AgentResponse) -> Option<&'static str> {
    response
        .forced
        .then_some("Tool call limit reached; answer is based on partial results.")
}

/// Single-line preview, cut at `max_chars` characters.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content,
    }
}
