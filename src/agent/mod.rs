//! Tool-calling agent.
//!
//! The agent sends the conversation to a [`ChatModel`], runs whatever tools
//! the model asks for through the [`ToolRegistry`](crate::tools::ToolRegistry),
//! replays the results as a scratchpad and repeats until the model answers
//! in text or the tool round limit is reached.

mod model;
mod prompt;
mod runner;
mod scratchpad;
mod session;

pub use model::{ChatModel, ModelReply, OpenAiChatModel};
pub use prompt::PromptTemplate;
pub use runner::{Agent, AgentResponse, DEFAULT_MAX_TOOL_ROUNDS};
pub use scratchpad::{Scratchpad, ScratchpadEntry};
pub use session::{ConversationSession, ConversationTurn, Role};
