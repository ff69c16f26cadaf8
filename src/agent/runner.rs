//! Agent runner with tool calling loop.

use super::model::{ChatModel, ModelReply};
use super::prompt::PromptTemplate;
use super::scratchpad::{Scratchpad, ScratchpadEntry};
use super::session::ConversationTurn;
use crate::config::ToolLimitPolicy;
use crate::error::AgentError;
use crate::tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of tool rounds per user turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Agent that answers a user turn, calling tools as the model asks.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    prompt: PromptTemplate,
    max_tool_rounds: usize,
    on_tool_limit: ToolLimitPolicy,
}

impl Agent {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>, prompt: PromptTemplate) -> Self {
        Self {
            model,
            tools,
            prompt,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            on_tool_limit: ToolLimitPolicy::default(),
        }
    }

    /// Set maximum tool rounds for the agent loop.
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Set what happens once the rounds are used up.
    pub fn with_tool_limit_policy(mut self, policy: ToolLimitPolicy) -> Self {
        self.on_tool_limit = policy;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `input` given prior `history`. The scratchpad starts empty and
    /// is returned as the steps of the response.
    pub async fn run(
        &self,
        input: &str,
        history: &[ConversationTurn],
    ) -> Result<AgentResponse, AgentError> {
        let mut scratchpad = Scratchpad::new();
        let mut model_calls = 0;
        let mut round = 0;

        loop {
            if round >= self.max_tool_rounds {
                return self
                    .finish_at_limit(input, history, scratchpad, model_calls)
                    .await;
            }

            debug!("Agent model call {}, {} steps so far", model_calls + 1, scratchpad.len());
            let messages = self.prompt.render(history, input, &scratchpad)?;
            let reply = self
                .model
                .complete(messages, self.tools.openai_tools())
                .await?;
            model_calls += 1;

            match reply {
                ModelReply::Final(output) => {
                    return Ok(AgentResponse {
                        input: input.to_string(),
                        output,
                        steps: scratchpad.into_entries(),
                        model_calls,
                        forced: false,
                    });
                }
                ModelReply::ToolCalls(calls) => {
                    round += 1;
                    for request in calls {
                        let result = self.tools.invoke(&request).await;
                        scratchpad.push(ScratchpadEntry {
                            round,
                            request,
                            result,
                        });
                    }
                }
            }
        }
    }

    async fn finish_at_limit(
        &self,
        input: &str,
        history: &[ConversationTurn],
        scratchpad: Scratchpad,
        model_calls: usize,
    ) -> Result<AgentResponse, AgentError> {
        warn!(
            "Agent used all {} tool rounds ({} calls)",
            self.max_tool_rounds,
            scratchpad.len()
        );

        if self.on_tool_limit == ToolLimitPolicy::Fail {
            return Err(AgentError::ToolLimitExceeded(self.max_tool_rounds));
        }

        let messages = self.prompt.render_final(history, input, &scratchpad)?;
        match self.model.complete(messages, Vec::new()).await? {
            ModelReply::Final(output) => Ok(AgentResponse {
                input: input.to_string(),
                output,
                steps: scratchpad.into_entries(),
                model_calls: model_calls + 1,
                forced: true,
            }),
            ModelReply::ToolCalls(_) => Err(AgentError::ToolLimitExceeded(self.max_tool_rounds)),
        }
    }
}

/// Response from an agent run.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub input: String,
    /// The final answer.
    pub output: String,
    /// Every tool call made, in order.
    pub steps: Vec<ScratchpadEntry>,
    /// Number of model calls used.
    pub model_calls: usize,
    /// Whether the answer was forced after the tool round limit.
    pub forced: bool,
}
