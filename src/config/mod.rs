//! Configuration module for Tidings.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    AgentSettings, CalendarSettings, GeneralSettings, GoogleSettings, MailSettings,
    OpenAISettings, PromptSettings, Settings, ToolLimitPolicy,
};
