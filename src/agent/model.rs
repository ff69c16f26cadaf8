//! The language model behind the agent.

use crate::error::AgentError;
use crate::tools::ToolCallRequest;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionResponseMessage, ChatCompletionTool,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

/// What the model did with a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// One round of tool calls, in the order the model listed them.
    ToolCalls(Vec<ToolCallRequest>),
    /// A natural-language answer.
    Final(String),
}

/// A chat model that may answer or ask for tools.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `messages` with `tools` on offer. An empty `tools` list means the
    /// model must answer in text.
    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<ModelReply, AgentError>;
}

/// OpenAI chat completions.
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<ModelReply, AgentError> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature);
        if !tools.is_empty() {
            builder.tools(tools);
        }
        let request = builder
            .build()
            .map_err(|e| AgentError::Request(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::OpenAI(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::MalformedResponse("no choices in response".to_string()))?;

        reply_from_message(choice.message)
    }
}

/// Read a completion message as tool calls or a final answer.
///
/// A message with neither is malformed.
fn reply_from_message(message: ChatCompletionResponseMessage) -> Result<ModelReply, AgentError> {
    match message.tool_calls {
        Some(calls) if !calls.is_empty() => Ok(ModelReply::ToolCalls(
            calls
                .into_iter()
                .map(|call| ToolCallRequest {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        )),
        _ => match message.content {
            Some(content) if !content.trim().is_empty() => Ok(ModelReply::Final(content)),
            _ => Err(AgentError::MalformedResponse(
                "reply has neither tool calls nor content".to_string(),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(value: serde_json::Value) -> ChatCompletionResponseMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_tool_calls_take_precedence() {
        let reply = reply_from_message(message(json!({
            "role": "assistant",
            "content": "ignored",
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "get_upcoming_events", "arguments": "{\"count\": 2}"}
            }]
        })))
        .unwrap();

        match reply {
            ModelReply::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].name, "get_upcoming_events");
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_text_reply_is_final() {
        let reply = reply_from_message(message(json!({
            "role": "assistant",
            "content": "You have no meetings today."
        })))
        .unwrap();
        assert_eq!(reply, ModelReply::Final("You have no meetings today.".to_string()));
    }

    #[test]
    fn test_empty_reply_is_malformed() {
        for value in [
            json!({"role": "assistant", "content": null}),
            json!({"role": "assistant", "content": "  "}),
            json!({"role": "assistant", "content": null, "tool_calls": []}),
        ] {
            assert!(matches!(
                reply_from_message(message(value)),
                Err(AgentError::MalformedResponse(_))
            ));
        }
    }
}
