//! Tool framework for exposing the continuation protocol to an agent.
//!
//! A tool declares a JSON Schema for its parameters and returns a
//! [`ToolResult`]. Failures the agent can act on come back as
//! [`ToolResult::Error`] rather than as `Err`, so the agent loop keeps
//! running and the model sees the message.
//!
//! ```rust,ignore
//! use folio_agent::{Tool, ToolContext, ToolResult, ToolError};
//!
//! struct Ping;
//!
//! #[async_trait::async_trait]
//! impl Tool for Ping {
//!     fn name(&self) -> &str { "ping" }
//!     fn description(&self) -> &str { "Answers pong" }
//!     fn parameters(&self) -> serde_json::Value { serde_json::json!({"type": "object"}) }
//!
//!     async fn execute(&self, _params: serde_json::Value, _ctx: &ToolContext)
//!         -> Result<ToolResult, ToolError>
//!     {
//!         Ok(ToolResult::text("pong"))
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ToolError;

// ─────────────────────────────────────────────────────────────────────────────
// Parameter Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Result type for parameter parsing.
pub type ParamResult<T> = std::result::Result<T, ParameterValidationError>;

/// Why a tool call's parameters were rejected.
///
/// Messages are written for the model: they name the parameter and say what
/// a valid value looks like.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterValidationError {
    #[error("missing required parameter '{name}': {hint}")]
    MissingRequired {
        name: &'static str,
        hint: &'static str,
    },

    #[error("invalid type for '{name}': expected {expected}, got {actual}")]
    InvalidType {
        name: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("'{name}' value {value} is out of range: {constraint}")]
    OutOfRange {
        name: &'static str,
        value: String,
        constraint: String,
    },

    #[error("'{name}' has invalid value '{value}': {message}")]
    InvalidValue {
        name: &'static str,
        value: String,
        message: String,
    },
}

impl ParameterValidationError {
    pub fn missing(name: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { name, hint }
    }

    pub fn invalid_type(
        name: &'static str,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            name,
            expected,
            actual: actual.into(),
        }
    }

    pub fn out_of_range(
        name: &'static str,
        value: impl ToString,
        constraint: impl Into<String>,
    ) -> Self {
        Self::OutOfRange {
            name,
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }

    pub fn invalid_value(
        name: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name,
            value: value.into(),
            message: message.into(),
        }
    }

    /// Name of the offending parameter.
    pub fn parameter_name(&self) -> &str {
        match self {
            Self::MissingRequired { name, .. }
            | Self::InvalidType { name, .. }
            | Self::OutOfRange { name, .. }
            | Self::InvalidValue { name, .. } => name,
        }
    }
}

/// JSON type name used in validation messages.
fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Typed accessors for tool parameters.
pub trait ParamExt {
    /// A string parameter that must be present.
    fn required_str(&self, name: &'static str, hint: &'static str) -> ParamResult<&str>;

    /// A string parameter that may be absent. Present values of another
    /// type are rejected.
    fn optional_str(&self, name: &'static str) -> ParamResult<Option<&str>>;

    /// A non-negative integer parameter that may be absent.
    fn optional_usize(&self, name: &'static str) -> ParamResult<Option<usize>>;
}

impl ParamExt for serde_json::Value {
    fn required_str(&self, name: &'static str, hint: &'static str) -> ParamResult<&str> {
        match self.get(name) {
            None | Some(serde_json::Value::Null) => {
                Err(ParameterValidationError::missing(name, hint))
            }
            Some(value) => value.as_str().ok_or_else(|| {
                ParameterValidationError::invalid_type(name, "string", json_type_name(value))
            }),
        }
    }

    fn optional_str(&self, name: &'static str) -> ParamResult<Option<&str>> {
        match self.get(name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => value.as_str().map(Some).ok_or_else(|| {
                ParameterValidationError::invalid_type(name, "string", json_type_name(value))
            }),
        }
    }

    fn optional_usize(&self, name: &'static str) -> ParamResult<Option<usize>> {
        match self.get(name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => match value.as_u64() {
                Some(n) => usize::try_from(n).map(Some).map_err(|_| {
                    ParameterValidationError::out_of_range(name, n, "too large")
                }),
                None if value.is_number() => Err(ParameterValidationError::out_of_range(
                    name,
                    value,
                    "must be a non-negative integer",
                )),
                None => Err(ParameterValidationError::invalid_type(
                    name,
                    "integer",
                    json_type_name(value),
                )),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for agent tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model calls the tool by.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Run the tool.
    ///
    /// `Err` is reserved for failures the agent loop itself should see;
    /// anything the model can act on is returned as [`ToolResult::Error`].
    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Token to check for cancellation.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Check if execution has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Result
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResult {
    Text {
        content: String,
    },
    Json {
        content: serde_json::Value,
    },
    /// Tool execution failed.
    Error {
        message: String,
        /// Whether the agent can do something about it (retry, restart).
        recoverable: bool,
    },
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn json(content: serde_json::Value) -> Self {
        Self::Json { content }
    }

    /// Create a recoverable error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            recoverable: true,
        }
    }

    /// Create a non-recoverable error result.
    pub fn fatal_error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            recoverable: false,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    /// JSON payload of a successful result.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json { content } => Some(content),
            _ => None,
        }
    }

    /// Get the content as a string for LLM consumption.
    pub fn to_llm_content(&self) -> String {
        match self {
            Self::Text { content } => content.clone(),
            Self::Json { content } => {
                serde_json::to_string_pretty(content).unwrap_or_else(|_| content.to_string())
            }
            Self::Error { message, .. } => format!("Error: {}", message),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Name, description and schema of a tool, as offered to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Registry of the tools available to an agent.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(params, ctx).await
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
            "Echoes its input"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn execute(
            &self,
            params: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolResult, ToolError> {
            let text = params.required_str("text", "pass the text to echo")?;
            Ok(ToolResult::text(text))
        }
    }

    #[test]
    fn test_required_str() {
        let params = json!({"a": "x", "b": 3});
        assert_eq!(params.required_str("a", "").unwrap(), "x");
        assert!(matches!(
            params.required_str("b", ""),
            Err(ParameterValidationError::InvalidType { actual, .. }) if actual == "number"
        ));
        assert!(matches!(
            params.required_str("c", "hint"),
            Err(ParameterValidationError::MissingRequired { name: "c", .. })
        ));
    }

    #[test]
    fn test_optional_usize() {
        let params = json!({"n": 5, "neg": -1, "frac": 1.5, "s": "5", "nil": null});
        assert_eq!(params.optional_usize("n").unwrap(), Some(5));
        assert_eq!(params.optional_usize("missing").unwrap(), None);
        assert_eq!(params.optional_usize("nil").unwrap(), None);
        assert!(matches!(
            params.optional_usize("neg"),
            Err(ParameterValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            params.optional_usize("frac"),
            Err(ParameterValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            params.optional_usize("s"),
            Err(ParameterValidationError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_validation_error_names_parameter() {
        let err = ParameterValidationError::out_of_range("page_size", 0, "must be at least 1");
        assert_eq!(err.parameter_name(), "page_size");
        assert_eq!(
            err.to_string(),
            "'page_size' value 0 is out of range: must be at least 1"
        );
    }

    #[test]
    fn test_tool_result_serialization() {
        let result = ToolResult::error("gone");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["recoverable"], true);
        assert_eq!(result.to_llm_content(), "Error: gone");
        assert!(ToolResult::json(json!({})).is_success());
    }

    #[tokio::test]
    async fn test_registry_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        assert!(registry.contains("echo"));
        assert_eq!(registry.names(), vec!["echo"]);

        let result = registry
            .execute("echo", json!({"text": "hi"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(result, ToolResult::text("hi"));

        let err = registry
            .execute("missing", json!({}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));

        let err = registry
            .execute("echo", json!({}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[test]
    fn test_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].input_schema["type"], "object");
    }
}
