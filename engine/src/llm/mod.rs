//! LLM Provider Abstraction Layer
//!
//! This module defines the conversation turn types shared by every agent and
//! the `LLMProvider` trait the agent runtime talks to. A provider receives the
//! full turn snapshot, the capability specs the agent may call and an optional
//! structured-response schema, and answers with text and/or a parsed payload
//! plus zero or more pending tool calls.

use async_trait::async_trait;
use sdk::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod openai;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Model refused: {0}")]
    Refusal(String),
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,

    /// Tool result message
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// One part of a multi-modal message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FilePart },
}

/// Inline image, usually a `data:` URI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

/// Inline file upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilePart {
    pub filename: String,
    pub file_data: String,
}

/// Message content: plain text or a list of parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Textual rendering of the content; binary parts are summarized
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.clone(),
                    ContentPart::ImageUrl { .. } => "[image]".to_string(),
                    ContentPart::File { file } => format!("[file {}]", file.filename),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.is_empty(),
            MessageContent::Parts(parts) => parts.is_empty(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

/// One turn in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: MessageRole,

    /// Content of the message
    pub content: MessageContent,

    /// Tool calls requested by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Optional tool call ID for tool result messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new(role: MessageRole, content: MessageContent) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, MessageContent::Text(content.into()))
    }

    /// Create a new multi-modal user message
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(MessageRole::User, MessageContent::Parts(parts))
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, MessageContent::Text(content.into()))
    }

    /// Create an assistant message that carries pending tool calls
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::assistant(content)
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, MessageContent::Text(content.into()))
    }

    /// Create a new tool result message
    pub fn tool_result(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(MessageRole::Tool, MessageContent::Text(content.into()))
        }
    }

    /// Text view of the content
    pub fn text(&self) -> String {
        self.content.as_text()
    }
}

/// Tool call request from the LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Arguments to pass to the tool (JSON string)
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Structured-response schema an agent must conform to when it stops
/// calling tools
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

/// One completion request
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
    pub response_schema: Option<&'a ResponseSchema>,
}

/// Response from an LLM provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    /// Free-text content, if any
    pub content: Option<String>,

    /// Payload parsed against the response schema, if one was supplied
    pub parsed: Option<Value>,

    /// Tool calls requested by the model
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl CompletionResponse {
    /// A text-only answer
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A structured answer
    pub fn parsed(value: Value) -> Self {
        Self {
            content: Some(value.to_string()),
            parsed: Some(value),
            tool_calls: Vec::new(),
        }
    }

    /// A round of tool calls with no text
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Content recorded on the assistant turn: the parsed payload when
    /// present, otherwise the text (possibly empty)
    pub fn turn_content(&self) -> String {
        match &self.parsed {
            Some(Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => self.content.clone().unwrap_or_default(),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openai")
    fn name(&self) -> &str;

    /// Generate a response from the LLM
    ///
    /// # Returns
    /// * `Ok(CompletionResponse)` - Text and/or parsed payload plus pending tool calls
    /// * `Err(LLMError)` - If the request fails or the reply does not match the schema
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<CompletionResponse>;
}
