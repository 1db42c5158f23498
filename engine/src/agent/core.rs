//! Agent Core
//!
//! This module implements the query/tool loop that drives one agent to a
//! final answer:
//!
//! 1. Send the agent's full conversation, its capability specs and its
//!    response schema to the completion backend
//! 2. Record the reply as one `assistant` turn (content plus tool calls)
//! 3. No tool calls: the reply is final and is returned
//! 4. Otherwise run every tool call in order, recording one `tool` turn per
//!    call and, for artifact requests, a `user` turn with the file
//! 5. Go back to 1
//!
//! # Limits
//!
//! - At most `max_tool_rounds` backend round-trips per query
//! - Backend errors are never retried here

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sdk::errors::EngineError;
use tracing::{debug, info, warn};

use super::artifact::load_attachment;
use super::{AgentProfile, ConversationState};
use crate::audit::AuditSink;
use crate::llm::{CompletionRequest, CompletionResponse, LLMProvider, Message};
use crate::tools::ToolRegistry;

/// Default maximum number of backend round-trips per query
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 50;

/// One agent: its profile plus the conversation it owns
pub struct Agent {
    profile: AgentProfile,
    conversation: ConversationState,
}

impl Agent {
    /// Create an agent whose conversation is seeded with its system prompt
    pub fn new(profile: AgentProfile, audit: Arc<dyn AuditSink>) -> Self {
        let conversation =
            ConversationState::new(profile.name.clone(), profile.system_prompt.clone(), audit);
        Self {
            profile,
            conversation,
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Append a `user` turn
    pub fn add_user_message(&mut self, content: impl Into<String>) -> Result<(), EngineError> {
        self.conversation.append_user(content)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.profile.name)
            .field("role", &self.profile.role)
            .field("turns", &self.conversation.len())
            .finish()
    }
}

/// Runs agents against a completion backend and a tool registry
pub struct AgentRuntime {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    max_tool_rounds: usize,
    workspace: PathBuf,
}

impl AgentRuntime {
    pub fn new(provider: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            workspace: PathBuf::from("."),
        }
    }

    /// Limit backend round-trips per query
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Directory relative artifact paths are resolved against
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Drive `agent` until the model answers without calling tools.
    ///
    /// # Errors
    ///
    /// - `EngineError::Backend` when the completion backend fails
    /// - `EngineError::LimitExceeded` after `max_tool_rounds` round-trips
    /// - `EngineError::ProtocolViolation` if tool bookkeeping goes out of sync
    pub async fn query(&self, agent: &mut Agent) -> Result<CompletionResponse, EngineError> {
        let specs = self.tools.specs(&agent.profile.capabilities);

        for round in 1..=self.max_tool_rounds {
            agent.conversation.ensure_resolved()?;
            debug!(
                agent = %agent.profile.name,
                round,
                turns = agent.conversation.len(),
                tokens = agent.conversation.token_estimate(),
                "Querying model"
            );

            let request = CompletionRequest {
                model: &agent.profile.model,
                messages: agent.conversation.snapshot(),
                tools: &specs,
                response_schema: agent.profile.response_schema.as_ref(),
            };
            let response = self
                .provider
                .complete(request)
                .await
                .map_err(|e| EngineError::backend(&agent.profile.name, e.to_string()))?;

            agent.conversation.append(Message::assistant_with_tool_calls(
                response.turn_content(),
                response.tool_calls.clone(),
            ))?;

            if !response.has_tool_calls() {
                info!(agent = %agent.profile.name, round, "{} is done", agent.profile.name);
                return Ok(response);
            }

            info!(
                agent = %agent.profile.name,
                round,
                calls = response.tool_calls.len(),
                "{} is calling tools",
                agent.profile.name
            );
            for call in &response.tool_calls {
                let invocation = self.tools.invoke(call, &agent.profile.capabilities).await;
                agent
                    .conversation
                    .append(Message::tool_result(invocation.result.to_string(), &call.id))?;

                if let Some(path) = invocation.requested_artifact {
                    self.attach(agent, &path).await?;
                }
            }
        }

        warn!(
            agent = %agent.profile.name,
            "Tool loop hit the limit of {} rounds",
            self.max_tool_rounds
        );
        Err(EngineError::limit(
            &agent.profile.name,
            "max_tool_rounds",
            self.max_tool_rounds,
        ))
    }

    /// Append the requested file to the conversation.
    ///
    /// A file that cannot be read is reported to the model as text.
    async fn attach(&self, agent: &mut Agent, requested: &str) -> Result<(), EngineError> {
        let path = self.resolve_artifact(requested);
        match load_attachment(&path).await {
            Ok(Some(message)) => {
                debug!(agent = %agent.profile.name, "Attaching {}", requested);
                agent.conversation.append(message)
            }
            Ok(None) => {
                warn!(
                    agent = %agent.profile.name,
                    "Cannot attach {}: unsupported file type",
                    requested
                );
                Ok(())
            }
            Err(e) => {
                warn!(agent = %agent.profile.name, "{}", e);
                agent
                    .conversation
                    .append_user(format!("The file {} could not be attached: {}", requested, e))
            }
        }
    }

    fn resolve_artifact(&self, requested: &str) -> PathBuf {
        let path = Path::new(requested);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAuditSink;
    use crate::llm::{LLMError, MessageRole, ToolCall};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and counts calls
    struct Scripted {
        replies: Mutex<VecDeque<Result<CompletionResponse, LLMError>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<CompletionResponse, LLMError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl LLMProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: CompletionRequest<'_>,
        ) -> crate::llm::Result<CompletionResponse> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LLMError::ProviderUnavailable("script exhausted".into())))
        }
    }

    fn agent() -> Agent {
        Agent::new(AgentProfile::worker(1, "test-model"), Arc::new(NullAuditSink))
    }

    #[tokio::test]
    async fn test_final_answer_in_one_round_trip() {
        let provider = Arc::new(Scripted::new(vec![Ok(CompletionResponse::text("done"))]));
        let runtime = AgentRuntime::new(provider.clone(), Arc::new(ToolRegistry::empty()));
        let mut agent = agent();
        agent.add_user_message("go").unwrap();

        let response = runtime.query(&mut agent).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("done"));
        assert_eq!(provider.calls(), 1);
        assert_eq!(agent.conversation().len(), 3);
        assert_eq!(
            agent.conversation().last().map(|m| m.role),
            Some(MessageRole::Assistant)
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_and_loop_continues() {
        let provider = Arc::new(Scripted::new(vec![
            Ok(CompletionResponse::tool_calls(vec![ToolCall::new(
                "call_1", "LsTool", "{}",
            )])),
            Ok(CompletionResponse::text("recovered")),
        ]));
        let runtime = AgentRuntime::new(provider.clone(), Arc::new(ToolRegistry::empty()));
        let mut agent = agent();

        runtime.query(&mut agent).await.unwrap();
        assert_eq!(provider.calls(), 2);
        let tool_turn = &agent.conversation().snapshot()[2];
        assert_eq!(tool_turn.role, MessageRole::Tool);
        assert_eq!(tool_turn.tool_call_id.as_deref(), Some("call_1"));
        let result: serde_json::Value = serde_json::from_str(&tool_turn.text()).unwrap();
        assert_eq!(result, json!({"error": "Tool LsTool not found"}));
    }

    #[tokio::test]
    async fn test_backend_error_names_agent() {
        let provider = Arc::new(Scripted::new(vec![Err(LLMError::RateLimitExceeded)]));
        let runtime = AgentRuntime::new(provider, Arc::new(ToolRegistry::empty()));
        let mut agent = agent();

        let err = runtime.query(&mut agent).await.unwrap_err();
        match err {
            EngineError::Backend { agent, message } => {
                assert_eq!(agent, "WorkerAgent1");
                assert!(message.contains("Rate limit"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_round_limit() {
        let looping = || -> Result<CompletionResponse, LLMError> {
            Ok(CompletionResponse::tool_calls(vec![ToolCall::new(
                uuid::Uuid::new_v4().to_string(),
                "LsTool",
                "{}",
            )]))
        };
        let provider = Arc::new(Scripted::new(vec![looping(), looping(), looping()]));
        let runtime = AgentRuntime::new(provider.clone(), Arc::new(ToolRegistry::empty()))
            .with_max_tool_rounds(2);
        let mut agent = agent();

        let err = runtime.query(&mut agent).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::LimitExceeded { ref limit, value: 2, .. } if limit == "max_tool_rounds"
        ));
        assert_eq!(provider.calls(), 2);
    }
}
