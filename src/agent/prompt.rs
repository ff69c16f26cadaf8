//! Renders the messages sent to the model on each call.

use super::scratchpad::Scratchpad;
use super::session::{ConversationTurn, Role};
use crate::config::Prompts;
use crate::error::AgentError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use chrono::Local;
use std::collections::HashMap;

/// System instruction plus slots for history, input and scratchpad.
#[derive(Debug, Clone, Default)]
pub struct PromptTemplate {
    prompts: Prompts,
}

impl PromptTemplate {
    pub fn new(prompts: Prompts) -> Self {
        Self { prompts }
    }

    /// The system instruction with variables filled in.
    pub fn system_text(&self) -> String {
        self.prompts
            .render_with_custom(&self.prompts.agent.system, &builtin_variables())
    }

    /// Instruction appended once the tool rounds are used up.
    pub fn final_answer_text(&self) -> String {
        self.prompts
            .render_with_custom(&self.prompts.agent.final_answer, &builtin_variables())
    }

    /// System, history, user input, then the scratchpad.
    pub fn render(
        &self,
        history: &[ConversationTurn],
        input: &str,
        scratchpad: &Scratchpad,
    ) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + scratchpad.len() * 2 + 2);
        messages.push(system_message(self.system_text())?);

        for turn in history {
            messages.push(match turn.role {
                Role::User => user_message(&turn.content)?,
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.as_str())
                    .build()
                    .map_err(|e| AgentError::Request(e.to_string()))?
                    .into(),
            });
        }

        messages.push(user_message(input)?);
        messages.extend(scratchpad.to_messages()?);
        Ok(messages)
    }

    /// `render` plus the final-answer instruction after the scratchpad.
    pub fn render_final(
        &self,
        history: &[ConversationTurn],
        input: &str,
        scratchpad: &Scratchpad,
    ) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        let mut messages = self.render(history, input, scratchpad)?;
        messages.push(system_message(self.final_answer_text())?);
        Ok(messages)
    }
}

fn builtin_variables() -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert(
        "today".to_string(),
        Local::now().format("%A, %B %-d, %Y").to_string(),
    );
    vars
}

fn system_message(content: String) -> Result<ChatCompletionRequestMessage, AgentError> {
    Ok(ChatCompletionRequestSystemMessageArgs::default()
        .content(content)
        .build()
        .map_err(|e| AgentError::Request(e.to_string()))?
        .into())
}

fn user_message(content: &str) -> Result<ChatCompletionRequestMessage, AgentError> {
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(content)
        .build()
        .map_err(|e| AgentError::Request(e.to_string()))?
        .into())
}
