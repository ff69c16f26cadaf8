//! Error types for Tidings.

use thiserror::Error;

/// Library-level error type for Tidings operations.
#[derive(Error, Debug)]
pub enum TidingsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures while obtaining or refreshing a Google credential.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Client secret file not found at {0}")]
    MissingClientSecret(String),

    #[error("Client secret file is invalid: {0}")]
    InvalidClientSecret(String),

    #[error("No stored credential. Run 'tidings auth' to authorize your Google account.")]
    GrantRequired,

    #[error("Authorization grant failed: {0}")]
    Grant(String),

    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Granted scopes are missing: {}", missing.join(", "))]
    InsufficientScopes { missing: Vec<String> },

    #[error("Credential storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Credential format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Failures reported by the calendar and mail adapters.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("The remote service rejected the credential")]
    Unauthorized,

    #[error("The remote service is rate limiting requests")]
    RateLimited,

    #[error("Remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ServiceError::Decode(e.to_string())
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

/// Failures inside the tool registry. Never escapes `ToolRegistry::invoke`.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool '{0}' is already registered")]
    Duplicate(String),

    #[error("Tool panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Failures of the agent loop itself.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Agent exceeded maximum tool rounds ({0})")]
    ToolLimitExceeded(usize),

    #[error("Failed to build request: {0}")]
    Request(String),
}

/// Result type alias for Tidings operations.
pub type Result<T> = std::result::Result<T, TidingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_scopes_lists_missing() {
        let err = AuthError::InsufficientScopes {
            missing: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Granted scopes are missing: a, b");
    }

    #[test]
    fn test_service_error_wraps_auth_transparently() {
        let err: ServiceError = AuthError::GrantRequired.into();
        assert!(err.to_string().contains("tidings auth"));
    }
}
