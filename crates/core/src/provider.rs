//! Provider trait: the abstraction over language-completion backends.
//!
//! A Provider knows how to send a short exchange of messages to an LLM and
//! get a complete response back. The pipeline uses it twice per query at
//! most: once to extract parameters through a forced function call, and once
//! to phrase the answer.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-3.5-turbo-0125")
    pub model: String,

    /// The messages to send
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Functions the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Force the model to call this function instead of answering in text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderRequest {
    /// A plain text request with no functions attached.
    pub fn text(model: impl Into<String>, messages: Vec<Message>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            max_tokens: None,
            tools: Vec::new(),
            tool_choice: None,
        }
    }

    /// Attach a single function and force the model to call it.
    pub fn forcing(mut self, tool: ToolDefinition) -> Self {
        self.tool_choice = Some(tool.name.clone());
        self.tools = vec![tool];
        self
    }

    /// Cap the response length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A function definition sent to the LLM so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The function name
    pub name: String,

    /// Description of what the function does
    pub description: String,

    /// JSON Schema describing the function's parameters
    pub parameters: serde_json::Value,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// Every completion backend implements this trait. The pipeline calls
/// `complete()` without knowing which provider is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_has_no_tools() {
        let req = ProviderRequest::text("gpt-4o-mini", vec![Message::user("hi")], 0.2);
        assert!(req.tools.is_empty());
        assert!(req.tool_choice.is_none());
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn forcing_sets_tool_choice() {
        let tool = ToolDefinition {
            name: "get_aws_price".into(),
            description: "Look up a price".into(),
            parameters: serde_json::json!({"type": "object"}),
        };
        let req = ProviderRequest::text("m", vec![], 0.0).forcing(tool);
        assert_eq!(req.tool_choice.as_deref(), Some("get_aws_price"));
        assert_eq!(req.tools.len(), 1);
    }

    #[test]
    fn default_temperature_applies_on_deserialize() {
        let req: ProviderRequest =
            serde_json::from_str(r#"{"model":"m","messages":[]}"#).unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }
}
