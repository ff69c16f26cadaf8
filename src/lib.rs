//! Tidings - a tool-calling chat assistant for your calendar and inbox
//!
//! A language model answers questions in plain language and, when it needs
//! to, calls tools that read the user's upcoming Google Calendar events and
//! unread Gmail messages.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `services` - Calendar and mail traits plus their plain data records
//! - `google` - OAuth credentials and the Calendar/Gmail REST adapters
//! - `tools` - Tool trait, registry and the two assistant tools
//! - `agent` - Model seam, prompt rendering and the tool-calling loop
//! - `assistant` - Wiring of all of the above
//!
//! # Example
//!
//! ```rust,no_run
//! use tidings::assistant::Assistant;
//! use tidings::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let assistant = Assistant::new(Settings::load()?)?;
//!     let agent = assistant.agent(assistant.openai_model(None)?);
//!     let mut session = assistant.session();
//!
//!     let response = assistant
//!         .chat_turn(&agent, &mut session, "What's on my calendar next?")
//!         .await?;
//!     println!("{}", response.output);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod google;
pub mod openai;
pub mod services;
pub mod tools;

pub use error::{Result, TidingsError};
