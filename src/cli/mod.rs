//! CLI module for Tidings.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Tidings - your calendar and inbox, through a chat assistant
///
/// Ask questions in plain language; the assistant looks up your upcoming
/// Google Calendar events and unread Gmail messages when it needs them.
#[derive(Parser, Debug)]
#[command(name = "tidings")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TIDINGS_CONFIG")]
    pub config: Option<String>,

    /// Defaults to `chat`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Show the tool calls behind each answer
        #[arg(long)]
        show_steps: bool,
    },

    /// Ask a single question without conversation history
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Show the tool calls behind the answer
        #[arg(long)]
        show_steps: bool,
    },

    /// List upcoming calendar events
    Events {
        /// Number of events to show
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },

    /// Show unread emails (marks them as read)
    Mail {
        /// Maximum number of emails
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Only emails from the last N days
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Authorize access to your Google account
    Auth,

    /// Check configuration and credentials
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
