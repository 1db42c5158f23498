use super::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, MessageContent,
    ToolCall,
};
use crate::config::OpenAIConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub struct OpenAIProvider {
    config: OpenAIConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig, api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            api_key,
            client,
        }
    }

    /// Build the chat-completions payload for a request
    pub fn build_payload(&self, request: &CompletionRequest<'_>) -> Value {
        let model = if request.model.is_empty() {
            self.config.model.as_str()
        } else {
            request.model
        };

        let messages: Vec<Value> = request.messages.iter().map(to_api_message).collect();
        let mut payload = json!({
            "model": model,
            "messages": messages,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|spec| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": spec.name,
                            "description": spec.description,
                            "parameters": spec.parameters,
                        }
                    })
                })
                .collect();
            payload["tools"] = Value::Array(tools);
        }

        if let Some(schema) = request.response_schema {
            payload["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true,
                }
            });
        }

        payload
    }
}

/// Convert one conversation turn to the chat-completions wire format
fn to_api_message(msg: &Message) -> Value {
    let content = match &msg.content {
        MessageContent::Text(text) => Value::String(text.clone()),
        MessageContent::Parts(parts) => {
            serde_json::to_value(parts).unwrap_or_else(|_| Value::Array(Vec::new()))
        }
    };

    let mut out = json!({
        "role": msg.role.to_string(),
        "content": content,
    });

    if !msg.tool_calls.is_empty() {
        if msg.content.is_empty() {
            out["content"] = Value::Null;
        }
        out["tool_calls"] = Value::Array(
            msg.tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        }
                    })
                })
                .collect(),
        );
    }

    if let Some(id) = &msg.tool_call_id {
        out["tool_call_id"] = Value::String(id.clone());
    }

    out
}

/// Parse the first choice of a chat-completions response body
fn parse_choice(data: &Value, structured: bool) -> super::Result<CompletionResponse> {
    let message = data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| LLMError::ParseError("No message in response".to_string()))?;

    if let Some(refusal) = message.get("refusal").and_then(|r| r.as_str()) {
        return Err(LLMError::Refusal(refusal.to_string()));
    }

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .map(str::to_string);

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(|c| c.as_array()) {
        for call in calls {
            let function = call
                .get("function")
                .ok_or_else(|| LLMError::ParseError("Tool call without function".to_string()))?;
            let name = function
                .get("name")
                .and_then(|n| n.as_str())
                .ok_or_else(|| LLMError::ParseError("Tool call without name".to_string()))?;
            let arguments = function
                .get("arguments")
                .and_then(|a| a.as_str())
                .unwrap_or("{}");
            let id = call
                .get("id")
                .and_then(|i| i.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4()));
            tool_calls.push(ToolCall::new(id, name, arguments));
        }
    }

    let parsed = match (&content, structured && tool_calls.is_empty()) {
        (Some(text), true) => Some(serde_json::from_str::<Value>(text).map_err(|e| {
            LLMError::ParseError(format!("Response does not match schema: {}", e))
        })?),
        (None, true) => {
            return Err(LLMError::ParseError(
                "Structured response expected but content is empty".to_string(),
            ))
        }
        _ => None,
    };

    Ok(CompletionResponse {
        content,
        parsed,
        tool_calls,
    })
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> super::Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let payload = self.build_payload(&request);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.unsecure()),
            )
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LLMError::AuthenticationFailed(text));
            } else if status.as_u16() == 429 {
                return Err(LLMError::RateLimitExceeded);
            } else if status.is_server_error() {
                return Err(LLMError::ProviderUnavailable(text));
            } else {
                return Err(LLMError::InvalidRequest(text));
            }
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        parse_choice(&data, request.response_schema.is_some())
    }
}
