//! Tool trait, call/result records and the ordered registry.

use super::schema::parse_arguments;
use crate::error::ToolError;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn};

/// A callable the model may ask for by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    /// What the tool does, written for the model.
    fn description(&self) -> &str;

    /// JSON Schema of the argument object.
    fn parameters_schema(&self) -> Value;

    /// OAuth scopes the tool needs on the user's account.
    fn required_scopes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Run the tool with already validated arguments.
    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError>;

    /// Value handed to the model when the tool fails.
    fn fallback(&self, error: &ToolError) -> Value {
        Value::String(format!("Tool error: {}", error))
    }
}

/// How a tool is described to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn to_openai(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name.clone(),
                description: Some(self.description.clone()),
                parameters: Some(self.parameters.clone()),
                strict: None,
            },
        }
    }
}

/// The model's request to run a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier the model uses to match the result to the call.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as sent by the model.
    pub arguments: String,
}

impl std::fmt::Display for ToolCallRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Outcome of running a tool call. Failed calls carry the tool's fallback
/// value plus the error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    pub name: String,
    pub value: Value,
    pub error: Option<String>,
}

impl ToolCallResult {
    fn ok(request: &ToolCallRequest, value: Value) -> Self {
        Self {
            call_id: request.id.clone(),
            name: request.name.clone(),
            value,
            error: None,
        }
    }

    fn failed(request: &ToolCallRequest, value: Value, error: &ToolError) -> Self {
        Self {
            call_id: request.id.clone(),
            name: request.name.clone(),
            value,
            error: Some(error.to_string()),
        }
    }

    /// Whether the value is a fallback rather than the tool's own output.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Text sent back to the model. Strings go verbatim, anything else as JSON.
    pub fn content(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Ordered set of tools exposed to the model.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool after the ones already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        if self.get(tool.name()).is_some() {
            return Err(ToolError::Duplicate(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Definitions in the shape the chat completions API expects.
    pub fn openai_tools(&self) -> Vec<ChatCompletionTool> {
        self.definitions().iter().map(ToolDefinition::to_openai).collect()
    }

    /// Union of every tool's scopes, first occurrence order.
    pub fn required_scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = Vec::new();
        for scope in self.tools.iter().flat_map(|t| t.required_scopes()) {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        scopes
    }

    /// Run a call. Never fails: unknown tools, bad arguments, tool errors and
    /// panics all come back as the tool's fallback value.
    pub async fn invoke(&self, request: &ToolCallRequest) -> ToolCallResult {
        let Some(tool) = self.get(&request.name) else {
            let error = ToolError::UnknownTool(request.name.clone());
            warn!("{}", error);
            return ToolCallResult::failed(request, Value::String(error.to_string()), &error);
        };

        info!("Calling tool: {} with args: {}", request.name, request.arguments);

        let outcome = match parse_arguments(&request.arguments, &tool.parameters_schema()) {
            Ok(args) => AssertUnwindSafe(tool.invoke(args))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ToolError::Panicked(panic_message(panic.as_ref())))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => ToolCallResult::ok(request, value),
            Err(error) => {
                warn!("Tool {} failed, using fallback: {}", request.name, error);
                let fallback = tool.fallback(&error);
                ToolCallResult::failed(request, fallback, &error)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the text back"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }
        fn required_scopes(&self) -> Vec<String> {
            vec!["scope/a".to_string()]
        }
        async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
            Ok(args["text"].clone())
        }
    }

    struct Exploding;

    #[async_trait]
    impl Tool for Exploding {
        fn name(&self) -> &str {
            "explode"
        }
        fn description(&self) -> &str {
            "Always panics"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        fn required_scopes(&self) -> Vec<String> {
            vec!["scope/b".to_string(), "scope/a".to_string()]
        }
        async fn invoke(&self, _args: Map<String, Value>) -> Result<Value, ToolError> {
            panic!("adapter blew up")
        }
        fn fallback(&self, _error: &ToolError) -> Value {
            json!([])
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo)).unwrap();
        registry.register(Arc::new(Exploding)).unwrap();
        registry
    }

    fn call(name: &str, arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["echo", "explode"]);

        let tools = registry.openai_tools();
        assert_eq!(tools[0].function.name, "echo");
        assert_eq!(tools[0].function.description.as_deref(), Some("Echo the text back"));
        assert_eq!(
            tools[0].function.parameters.as_ref().unwrap()["required"],
            json!(["text"])
        );
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = registry();
        assert!(matches!(
            registry.register(Arc::new(Echo)),
            Err(ToolError::Duplicate(_))
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_required_scopes_union() {
        assert_eq!(
            registry().required_scopes(),
            vec!["scope/a".to_string(), "scope/b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let result = registry().invoke(&call("echo", r#"{"text": "hi"}"#)).await;
        assert_eq!(result.call_id, "call_1");
        assert_eq!(result.value, json!("hi"));
        assert!(!result.is_fallback());
        assert_eq!(result.content(), "hi");
    }

    #[tokio::test]
    async fn test_invoke_never_fails() {
        let registry = registry();

        let unknown = registry.invoke(&call("missing", "{}")).await;
        assert!(unknown.is_fallback());
        assert_eq!(unknown.content(), "Unknown tool: missing");

        let bad_args = registry.invoke(&call("echo", r#"{"text": 5}"#)).await;
        assert!(bad_args.is_fallback());
        assert!(bad_args.content().starts_with("Tool error: Invalid arguments"));

        let panicked = registry.invoke(&call("explode", "")).await;
        assert!(panicked.is_fallback());
        assert_eq!(panicked.value, json!([]));
        assert!(panicked.error.unwrap().contains("adapter blew up"));
    }

    #[test]
    fn test_structured_content_is_json() {
        let result = ToolCallResult {
            call_id: "c".to_string(),
            name: "n".to_string(),
            value: json!([{"name": "x"}]),
            error: None,
        };
        assert_eq!(result.content(), r#"[{"name":"x"}]"#);
    }

    #[test]
    fn test_request_display() {
        assert_eq!(call("echo", r#"{"text":"a"}"#).to_string(), r#"echo({"text":"a"})"#);
    }
}
