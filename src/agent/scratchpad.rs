//! Tool calls and results gathered during one user turn.

use crate::error::AgentError;
use crate::tools::{ToolCallRequest, ToolCallResult};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestToolMessageArgs, ChatCompletionToolType,
    FunctionCall,
};

/// One tool call and what it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchpadEntry {
    /// 1-based round the call belongs to.
    pub round: usize,
    pub request: ToolCallRequest,
    pub result: ToolCallResult,
}

impl std::fmt::Display for ScratchpadEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.request)
    }
}

/// Entries in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ScratchpadEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ScratchpadEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replay as chat messages: per round, the assistant's tool calls followed
    /// by one tool message per call, all in insertion order.
    pub fn to_messages(&self) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        let mut messages = Vec::with_capacity(self.entries.len() + 1);

        for round in self.entries.chunk_by(|a, b| a.round == b.round) {
            let calls: Vec<ChatCompletionMessageToolCall> = round
                .iter()
                .map(|entry| ChatCompletionMessageToolCall {
                    id: entry.request.id.clone(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: entry.request.name.clone(),
                        arguments: entry.request.arguments.clone(),
                    },
                })
                .collect();

            let assistant = ChatCompletionRequestAssistantMessageArgs::default()
                .tool_calls(calls)
                .build()
                .map_err(|e| AgentError::Request(e.to_string()))?;
            messages.push(assistant.into());

            for entry in round {
                let tool = ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(&entry.request.id)
                    .content(entry.result.content())
                    .build()
                    .map_err(|e| AgentError::Request(e.to_string()))?;
                messages.push(tool.into());
            }
        }

        Ok(messages)
    }
}
