//! Shared helpers for integration tests: a scripted completion backend and
//! canned planner/reviewer replies.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lumen_engine::agent::AgentRuntime;
use lumen_engine::llm::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, ToolCall,
};
use lumen_engine::tools::ToolRegistry;

/// What the backend saw for one request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub schema: Option<String>,
}

/// Replays canned replies in order and records every request
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<CompletionResponse, LLMError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<CompletionResponse>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn with_results(replies: Vec<Result<CompletionResponse, LLMError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Models of every request, in order
    pub fn models(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.model).collect()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> lumen_engine::llm::Result<CompletionResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            model: request.model.to_string(),
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            schema: request.response_schema.map(|s| s.name.clone()),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::ProviderUnavailable("script exhausted".into())))
    }
}

pub fn runtime(provider: Arc<ScriptedProvider>, tools: ToolRegistry) -> Arc<AgentRuntime> {
    Arc::new(AgentRuntime::new(provider, Arc::new(tools)))
}

pub fn plan(steps: &[&str]) -> CompletionResponse {
    CompletionResponse::parsed(json!({
        "action": "plan",
        "steps_description": steps,
        "user_question": null,
        "final_summary": null
    }))
}

pub fn question(q: &str) -> CompletionResponse {
    CompletionResponse::parsed(json!({
        "action": "user_question",
        "steps_description": null,
        "user_question": q,
        "final_summary": null
    }))
}

pub fn done(summary: &str) -> CompletionResponse {
    CompletionResponse::parsed(json!({
        "action": "done",
        "steps_description": null,
        "user_question": null,
        "final_summary": summary
    }))
}

pub fn accept() -> CompletionResponse {
    CompletionResponse::parsed(json!({"passed": true, "feedback": null}))
}

pub fn reject(feedback: &str) -> CompletionResponse {
    CompletionResponse::parsed(json!({"passed": false, "feedback": feedback}))
}

pub fn say(text: &str) -> CompletionResponse {
    CompletionResponse::text(text)
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall::new(id, name, arguments.to_string())
}
