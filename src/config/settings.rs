//! Configuration settings for Tidings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub agent: AgentSettings,
    pub google: GoogleSettings,
    pub calendar: CalendarSettings,
    pub mail: MailSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.tidings".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// Chat model used by the agent.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            timeout_secs: 300,
        }
    }
}

/// What the agent does once it has used up its tool rounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolLimitPolicy {
    /// Ask the model for a final answer without offering tools.
    #[default]
    Answer,
    /// Abort the turn with an error.
    Fail,
}

impl std::str::FromStr for ToolLimitPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "answer" => Ok(ToolLimitPolicy::Answer),
            "fail" => Ok(ToolLimitPolicy::Fail),
            _ => Err(format!("Unknown tool limit policy: {}", s)),
        }
    }
}

impl std::fmt::Display for ToolLimitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolLimitPolicy::Answer => write!(f, "answer"),
            ToolLimitPolicy::Fail => write!(f, "fail"),
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of tool-call rounds per user turn.
    pub max_tool_rounds: usize,
    /// Behavior when `max_tool_rounds` is reached.
    pub on_tool_limit: ToolLimitPolicy,
    /// Number of past exchanges kept in chat history (0 keeps everything).
    pub history_turns: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            on_tool_limit: ToolLimitPolicy::Answer,
            history_turns: 20,
        }
    }
}

/// Google account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client secret downloaded from the Google Cloud console.
    pub client_secret_path: String,
    /// Where the authorized credential is persisted.
    pub token_path: String,
    /// Base URL of the Calendar v3 API.
    pub calendar_api_base: String,
    /// Base URL of the Gmail v1 API.
    pub gmail_api_base: String,
    /// Loopback port for the consent redirect (0 picks a free port).
    pub redirect_port: u16,
    /// Run the browser consent flow when no usable credential exists.
    pub interactive_auth: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_secret_path: "~/.tidings/credentials.json".to_string(),
            token_path: "~/.tidings/token.json".to_string(),
            calendar_api_base: "https://www.googleapis.com/calendar/v3".to_string(),
            gmail_api_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
            redirect_port: 0,
            interactive_auth: true,
            timeout_secs: 30,
        }
    }
}

/// Calendar tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Number of events fetched when the model does not say.
    pub default_count: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self { default_count: 10 }
    }
}

/// Mail tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Number of unread messages fetched when the model does not say.
    pub default_count: u32,
    /// Trailing window in days when the model does not say.
    pub within_days: u32,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            default_count: 5,
            within_days: 1,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TidingsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tidings")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded client secret path.
    pub fn client_secret_path(&self) -> PathBuf {
        Self::expand_path(&self.google.client_secret_path)
    }

    /// Get the expanded token path.
    pub fn token_path(&self) -> PathBuf {
        Self::expand_path(&self.google.token_path)
    }
}
